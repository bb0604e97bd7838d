use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration value is out of range or inconsistent.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// The layered sources could not be read or merged.
    #[error("config build error: {0}")]
    Build(String),

    /// The merged document does not match `AppConfig`.
    #[error("config deserialize error: {0}")]
    Deserialize(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Session and token settings
    #[serde(default)]
    pub auth: AuthSettings,
    /// Scheduled job endpoint
    #[serde(default)]
    pub cron: CronConfig,
    /// Initial values of the runtime dashboard settings
    #[serde(default)]
    pub dashboard: DashboardSettings,
    /// Bootstrap configuration (initial admin user)
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(invalid("server.port must be > 0"));
        }
        if self.server.body_limit_bytes == 0 {
            return Err(invalid("server.body_limit_bytes must be > 0"));
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(invalid(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }
        self.auth.validate()?;
        if let Some(secret) = &self.cron.secret {
            if secret.is_empty() {
                return Err(invalid("cron.secret must not be empty when set"));
            }
        }
        self.dashboard.validate().map_err(ConfigError::InvalidValue)?;
        if let Some(admin) = &self.bootstrap.admin_user {
            if admin.username.trim().is_empty() || admin.password.is_empty() {
                return Err(invalid(
                    "bootstrap.admin_user requires username and password",
                ));
            }
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue(message.into())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    3000
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Where the actor of a request is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionSource {
    /// Role and permissions come from the signed token claims.
    #[default]
    Token,
    /// The token only identifies the user; role and permissions are
    /// reloaded from storage on every request.
    Store,
}

/// Development signing secret. Replace it in every deployed environment.
pub const DEV_JWT_SECRET: &str = "painel-dev-secret-change-me-0123456789abcdef";

/// Session token settings.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// issuer = "https://painel.example.com"
/// jwt_secret = "..."
/// token_ttl = "8h"
/// session_source = "store"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Token `iss` claim.
    pub issuer: String,

    /// HS256 signing secret, at least 32 bytes.
    pub jwt_secret: String,

    /// Session token lifetime.
    #[serde(with = "humantime_serde")]
    pub token_ttl: Duration,

    /// Name of the session cookie set on login.
    pub cookie_name: String,

    /// Set the `Secure` attribute on the session cookie.
    pub cookie_secure: bool,

    /// Page that unauthenticated browsers are redirected to.
    pub login_path: String,

    /// Where the request actor is read from.
    pub session_source: SessionSource,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            issuer: "painel".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl: Duration::from_secs(8 * 3600),
            cookie_name: "painel_session".to_string(),
            cookie_secure: false,
            login_path: "/login".to_string(),
            session_source: SessionSource::Token,
        }
    }
}

impl AuthSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(invalid("auth.issuer cannot be empty"));
        }
        if self.jwt_secret.len() < 32 {
            return Err(invalid("auth.jwt_secret must be at least 32 bytes"));
        }
        if self.token_ttl.is_zero() {
            return Err(invalid("auth.token_ttl must be > 0"));
        }
        if self.cookie_name.is_empty() {
            return Err(invalid("auth.cookie_name cannot be empty"));
        }
        if !self.login_path.starts_with('/') {
            return Err(invalid("auth.login_path must start with '/'"));
        }
        Ok(())
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CronConfig {
    /// Shared secret expected in `x-cron-secret`. The cron endpoint is
    /// disabled while unset.
    #[serde(default)]
    pub secret: Option<String>,
}

/// Runtime-editable dashboard settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    pub title: String,
    /// How often the data provider is polled, in minutes.
    pub refresh_minutes: u32,
    /// Module opened after login, if the user can see it.
    pub default_module: Option<String>,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            title: "Painel Executivo".to_string(),
            refresh_minutes: 15,
            default_module: None,
        }
    }
}

impl DashboardSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("dashboard.title cannot be empty".into());
        }
        if self.refresh_minutes == 0 {
            return Err("dashboard.refresh_minutes must be > 0".into());
        }
        Ok(())
    }
}

/// Bootstrap configuration for initial server setup
///
/// Admin credentials can also be set via environment variables:
/// - PAINEL__BOOTSTRAP__ADMIN_USER__USERNAME
/// - PAINEL__BOOTSTRAP__ADMIN_USER__PASSWORD
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BootstrapConfig {
    /// If set, creates an `ADM` user on startup when the username is free
    #[serde(default)]
    pub admin_user: Option<AdminUserConfig>,
}

/// Configuration for bootstrapping an admin user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUserConfig {
    pub username: String,
    /// Plain text, hashed before storage
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

pub mod loader {
    use super::{AppConfig, ConfigError};
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Default configuration file, relative to the working directory.
    pub const DEFAULT_CONFIG_PATH: &str = "painel.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., PAINEL__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("PAINEL")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| ConfigError::Build(e.to_string()))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| ConfigError::Deserialize(e.to_string()))?;
        merged.validate()?;
        Ok(merged)
    }
}
