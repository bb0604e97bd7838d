//! Admin API endpoints.
//!
//! # Endpoints
//!
//! ## User (`admin:users:manage`)
//!
//! - `GET /users` - List users
//! - `POST /users` - Create a user
//! - `GET /users/{id}` - Read a user
//! - `PUT /users/{id}` - Update a user
//! - `DELETE /users/{id}` - Delete a user
//!
//! ## Role (`admin:users:manage`)
//!
//! - `GET /roles` - List roles
//! - `POST /roles` - Create a custom role
//! - `PUT /roles/{name}` - Update a role's description and permissions
//! - `DELETE /roles/{name}` - Delete an unassigned custom role
//!
//! ## Config
//!
//! - `GET /config` - Read dashboard settings (`admin:config:view`)
//! - `PUT /config` - Replace dashboard settings (`admin:config:edit`)

pub mod roles;
pub mod users;

pub use roles::{create_role, delete_role, list_roles, update_role};
pub use users::{create_user, delete_user, list_users, read_user, update_user};

use axum::Router;
use axum::routing::{get, put};

use crate::handlers::config::{read_config, update_config};
use crate::server::AppState;

/// Creates the admin routes, to be nested under `/api/admin`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(read_user).put(update_user).delete(delete_user),
        )
        .route("/roles", get(list_roles).post(create_role))
        .route("/roles/{name}", put(update_role).delete(delete_role))
        .route("/config", get(read_config).put(update_config))
}
