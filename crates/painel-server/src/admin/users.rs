//! User management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::gatekeeper::{UserManager, authorize_grants};
use crate::password::hash_password;
use crate::server::AppState;
use crate::storage::{
    Activity, ActivityStorage, Role, RoleStorage, User, UserStorage, effective_permissions,
    validate_permission_set,
};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub role: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub extra_permissions: Vec<String>,
}

/// Partial update; absent fields are left as they are.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub name: Option<String>,
    pub extra_permissions: Option<Vec<String>>,
    pub active: Option<bool>,
}

/// A user as returned by the admin API.
#[derive(Debug, Serialize)]
pub struct UserView {
    #[serde(flatten)]
    pub user: User,
    /// Role grants plus extra grants.
    pub effective_permissions: Vec<String>,
}

async fn to_view(state: &AppState, user: User) -> Result<UserView, ApiError> {
    let role = state.auth.roles.find_role(&user.role).await?;
    let effective_permissions = effective_permissions(role.as_ref(), &user);
    Ok(UserView {
        user,
        effective_permissions,
    })
}

async fn existing_role(state: &AppState, role: &str) -> Result<Role, ApiError> {
    state
        .auth
        .roles
        .find_role(role)
        .await?
        .ok_or_else(|| ApiError::invalid_request(format!("Unknown role '{role}'")))
}

/// The manager must cover everything `user` ends up holding.
async fn authorize_user_grants(
    state: &AppState,
    manager: &UserManager,
    user: &User,
) -> Result<(), ApiError> {
    let role = state.auth.roles.find_role(&user.role).await?;
    let granted = effective_permissions(role.as_ref(), user);
    authorize_grants(&state.evaluator, &manager.0, Some(user.role.as_str()), &granted)
}

async fn hash(password: String) -> Result<String, ApiError> {
    if password.is_empty() {
        return Err(ApiError::invalid_request("Password cannot be empty"));
    }
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .map_err(|e| ApiError::internal(e.to_string()))
}

pub(super) async fn record(
    state: &AppState,
    manager: &UserManager,
    action: &str,
    target: &str,
) -> Result<(), ApiError> {
    let UserManager(actor) = manager;
    state
        .activities
        .record_activity(Activity::new(&actor.user_id, &actor.username, action).with_detail(target))
        .await?;
    Ok(())
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    _manager: UserManager,
) -> Result<Json<Vec<UserView>>, ApiError> {
    let users = state.auth.users.list_users().await?;
    let mut views = Vec::with_capacity(users.len());
    for user in users {
        views.push(to_view(&state, user).await?);
    }
    Ok(Json(views))
}

/// GET /api/admin/users/{id}
pub async fn read_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _manager: UserManager,
) -> Result<Json<UserView>, ApiError> {
    let user = state
        .auth
        .users
        .find_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User {id}")))?;
    Ok(Json(to_view(&state, user).await?))
}

/// POST /api/admin/users
pub async fn create_user(
    State(state): State<AppState>,
    manager: UserManager,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    if username.is_empty() {
        return Err(ApiError::invalid_request("Username cannot be empty"));
    }
    let role = existing_role(&state, &req.role).await?;
    validate_permission_set(&req.extra_permissions)?;
    let granted: Vec<&str> = role
        .permissions
        .iter()
        .chain(&req.extra_permissions)
        .map(String::as_str)
        .collect();
    authorize_grants(&state.evaluator, &manager.0, Some(role.name.as_str()), &granted)?;

    let password_hash = hash(req.password).await?;
    let mut user = User::new(username, req.role, password_hash)
        .with_extra_permissions(req.extra_permissions);
    user.name = req.name;

    let user = state.auth.users.create_user(user).await?;
    record(&state, &manager, "user.create", &user.username).await?;

    tracing::info!(
        id = %user.id,
        username = %user.username,
        role = %user.role,
        "Created user"
    );

    Ok((StatusCode::CREATED, Json(to_view(&state, user).await?)))
}

/// PUT /api/admin/users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    manager: UserManager,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserView>, ApiError> {
    let mut user = state
        .auth
        .users
        .find_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User {id}")))?;
    // Users holding more than the manager are out of reach
    authorize_user_grants(&state, &manager, &user).await?;

    if let Some(username) = req.username {
        let username = username.trim().to_string();
        if username.is_empty() {
            return Err(ApiError::invalid_request("Username cannot be empty"));
        }
        user.username = username;
    }
    if let Some(role) = req.role {
        existing_role(&state, &role).await?;
        user.role = role;
    }
    if let Some(extra) = req.extra_permissions {
        validate_permission_set(&extra)?;
        user.extra_permissions = extra;
    }
    if let Some(name) = req.name {
        user.name = Some(name).filter(|n| !n.is_empty());
    }
    if let Some(active) = req.active {
        if !active && manager.0.user_id == user.id {
            return Err(ApiError::conflict("You cannot deactivate yourself"));
        }
        user.active = active;
    }
    authorize_user_grants(&state, &manager, &user).await?;
    if let Some(password) = req.password {
        user.password_hash = hash(password).await?;
    }

    let user = state.auth.users.update_user(user).await?;
    record(&state, &manager, "user.update", &user.username).await?;
    tracing::info!(id = %user.id, "Updated user");

    Ok(Json(to_view(&state, user).await?))
}

/// DELETE /api/admin/users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    manager: UserManager,
) -> Result<StatusCode, ApiError> {
    if manager.0.user_id == id {
        return Err(ApiError::conflict("You cannot delete yourself"));
    }
    let user = state
        .auth
        .users
        .find_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User {id}")))?;
    authorize_user_grants(&state, &manager, &user).await?;

    state.auth.users.delete_user(&id).await?;
    record(&state, &manager, "user.delete", &user.username).await?;
    tracing::info!(id = %id, "Deleted user");

    Ok(StatusCode::NO_CONTENT)
}
