use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    middleware,
    routing::{get, post},
};
use painel_authz::Evaluator;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{
    admin, bootstrap,
    config::AppConfig,
    gatekeeper,
    handlers,
    session::AuthState,
    settings::SettingsStore,
    storage::{ActivityStorage, MemoryStore, RoleStorage, RunLog, UserStorage},
    token::TokenService,
    tracker::{ActivityTracker, Tracker},
};

/// Newest activity entries summarized per tracker run.
const TRACKER_WINDOW: usize = 1000;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub evaluator: Arc<Evaluator>,
    pub auth: AuthState,
    pub activities: Arc<dyn ActivityStorage>,
    pub runs: Arc<dyn RunLog>,
    pub tracker: Arc<dyn Tracker>,
    pub settings: Arc<SettingsStore>,
    /// `None` disables the cron endpoint.
    pub cron_secret: Option<Arc<str>>,
}

impl AppState {
    /// State backed by a fresh [`MemoryStore`].
    pub fn in_memory(cfg: &AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let activities: Arc<dyn ActivityStorage> = store.clone();
        let tracker = Arc::new(ActivityTracker::new(activities.clone(), TRACKER_WINDOW));
        Self::new(cfg, store.clone(), store.clone(), activities, store, tracker)
    }

    pub fn new(
        cfg: &AppConfig,
        users: Arc<dyn UserStorage>,
        roles: Arc<dyn RoleStorage>,
        activities: Arc<dyn ActivityStorage>,
        runs: Arc<dyn RunLog>,
        tracker: Arc<dyn Tracker>,
    ) -> Self {
        let tokens = Arc::new(TokenService::from_settings(&cfg.auth));
        Self {
            evaluator: Arc::new(Evaluator::standard()),
            auth: AuthState::new(tokens, users, roles, Arc::new(cfg.auth.clone())),
            activities,
            runs,
            tracker,
            settings: Arc::new(SettingsStore::new(cfg.dashboard.clone())),
            cron_secret: cfg.cron.secret.as_deref().map(Arc::from),
        }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl FromRef<AppState> for Arc<Evaluator> {
    fn from_ref(state: &AppState) -> Self {
        state.evaluator.clone()
    }
}

pub struct PainelServer {
    addr: SocketAddr,
    app: Router,
}

/// Builds the in-memory application and seeds the bootstrap admin.
pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let state = AppState::in_memory(cfg);
    // Built before the first login attempt
    let _ = crate::password::dummy_hash();
    if let Some(admin) = &cfg.bootstrap.admin_user {
        bootstrap::ensure_admin_user(state.auth.users.as_ref(), admin).await?;
    }
    Ok(build_router(state, cfg.server.body_limit_bytes))
}

pub fn build_router(state: AppState, body_limit: usize) -> Router {
    let pages = Router::new()
        .route("/dashboard", get(handlers::pages::dashboard_index))
        .route("/dashboard/{module}", get(handlers::pages::dashboard_module))
        .route("/admin/users", get(handlers::pages::admin_users))
        .route("/admin/config", get(handlers::pages::admin_config))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            gatekeeper::page_gate,
        ));

    let api = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/me", get(handlers::me::me))
        .route("/modules", get(handlers::me::modules))
        .route("/permissions/catalog", get(handlers::permissions::catalog))
        .route("/permissions/expand", post(handlers::permissions::expand))
        .route("/activities", get(handlers::activities::list_activities))
        .route("/cron/track", post(handlers::cron::track))
        .nest("/admin", admin::admin_routes());

    Router::new()
        .route("/", get(handlers::pages::root))
        .route("/healthz", get(handlers::healthz))
        .route("/login", get(handlers::pages::login_page))
        .merge(pages)
        .nest("/api", api)
        .with_state(state)
        // Outermost first: body limit -> trace -> compression -> cors
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(body_limit))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|req: &axum::http::Request<_>| {
                            use tracing::field::Empty;
                            tracing::info_span!(
                                "http.request",
                                http.method = %req.method(),
                                http.target = %req.uri(),
                                http.status_code = Empty,
                            )
                        })
                        .on_response(
                            |res: &axum::http::Response<_>,
                             latency: std::time::Duration,
                             span: &tracing::Span| {
                                span.record(
                                    "http.status_code",
                                    tracing::field::display(res.status().as_u16()),
                                );
                                tracing::info!(
                                    http.status = %res.status().as_u16(),
                                    elapsed_ms = %latency.as_millis(),
                                    "request handled"
                                );
                            },
                        ),
                )
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive()),
        )
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub async fn build(self) -> anyhow::Result<PainelServer> {
        let app = build_app(&self.config).await?;
        Ok(PainelServer {
            addr: self.addr,
            app,
        })
    }
}

impl PainelServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
