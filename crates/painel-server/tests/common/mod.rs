#![allow(dead_code)]

use painel_server::config::AppConfig;
use painel_server::password::hash_password;
use painel_server::storage::{User, UserStorage};
use painel_server::{AppState, build_router};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

pub const CRON_SECRET: &str = "cron-test-secret";

pub struct TestServer {
    pub base: String,
    pub client: reqwest::Client,
    pub state: AppState,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// Creates a user directly in storage.
    pub async fn seed_user(&self, username: &str, password: &str, role: &str, extra: &[&str]) -> User {
        let hash = hash_password(password).expect("hash");
        let user = User::new(username, role, hash)
            .with_extra_permissions(extra.iter().map(|p| (*p).to_string()).collect());
        self.state
            .auth
            .users
            .create_user(user)
            .await
            .expect("seed user")
    }

    /// Logs in and returns the bearer token.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success(), "login failed for {username}");
        let body: Value = resp.json().await.unwrap();
        body["token"].as_str().expect("token").to_string()
    }
}

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.auth.jwt_secret = "integration-test-secret-0123456789abcdef".to_string();
    cfg.cron.secret = Some(CRON_SECRET.to_string());
    cfg
}

pub async fn start_server(cfg: AppConfig) -> TestServer {
    let state = AppState::in_memory(&cfg);
    let app = build_router(state.clone(), cfg.server.body_limit_bytes);

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    // Redirects are asserted, not followed
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestServer {
        base: format!("http://{addr}"),
        client,
        state,
        shutdown: Some(tx),
        handle: Some(handle),
    }
}
