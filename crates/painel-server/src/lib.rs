pub mod admin;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod gatekeeper;
pub mod handlers;
pub mod observability;
pub mod password;
pub mod server;
pub mod session;
pub mod settings;
pub mod storage;
pub mod token;
pub mod tracker;

pub use admin::admin_routes;
pub use config::{AppConfig, AuthSettings, ConfigError, DashboardSettings, ServerConfig};
pub use error::ApiError;
pub use gatekeeper::{UserManager, authorize, page_gate};
pub use observability::init_tracing;
pub use server::{AppState, PainelServer, ServerBuilder, build_app, build_router};
pub use session::{AuthState, OptionalSession, SessionAuth};
pub use storage::{MemoryStore, StorageError};
pub use token::{SessionClaims, TokenError, TokenService};
pub use tracker::{ActivityTracker, Tracker};
