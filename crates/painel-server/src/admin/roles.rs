//! Role management.
//!
//! System roles can be edited but not deleted. Permission sets are checked
//! entry by entry before they are stored, and a manager can only put codes
//! into a role that their own permissions cover.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use super::users::record;
use crate::error::ApiError;
use crate::gatekeeper::{UserManager, authorize_grants};
use crate::server::AppState;
use crate::storage::{Role, RoleStorage, validate_permission_set};

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    #[serde(default)]
    pub description: Option<String>,
    pub permissions: Vec<String>,
}

/// GET /api/admin/roles
pub async fn list_roles(
    State(state): State<AppState>,
    _manager: UserManager,
) -> Result<Json<Vec<Role>>, ApiError> {
    Ok(Json(state.auth.roles.list_roles().await?))
}

/// POST /api/admin/roles
pub async fn create_role(
    State(state): State<AppState>,
    manager: UserManager,
    Json(req): Json<CreateRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::invalid_request("Role name cannot be empty"));
    }
    validate_permission_set(&req.permissions)?;
    authorize_grants(&state.evaluator, &manager.0, Some(name.as_str()), &req.permissions)?;

    let mut role = Role::new(name, req.permissions);
    role.description = req.description;
    let role = state.auth.roles.create_role(role).await?;

    record(&state, &manager, "role.create", &role.name).await?;
    tracing::info!(role = %role.name, permissions = ?role.permissions, "Created role");

    Ok((StatusCode::CREATED, Json(role)))
}

/// PUT /api/admin/roles/{name}
pub async fn update_role(
    State(state): State<AppState>,
    Path(name): Path<String>,
    manager: UserManager,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<Json<Role>, ApiError> {
    validate_permission_set(&req.permissions)?;
    authorize_grants(&state.evaluator, &manager.0, Some(name.as_str()), &req.permissions)?;

    let mut role = state
        .auth
        .roles
        .find_role(&name)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Role {name}")))?;
    role.permissions = req.permissions;
    if req.description.is_some() {
        role.description = req.description;
    }
    let role = state.auth.roles.update_role(role).await?;

    record(&state, &manager, "role.update", &role.name).await?;
    tracing::info!(role = %role.name, permissions = ?role.permissions, "Updated role");

    Ok(Json(role))
}

/// DELETE /api/admin/roles/{name}
pub async fn delete_role(
    State(state): State<AppState>,
    Path(name): Path<String>,
    manager: UserManager,
) -> Result<StatusCode, ApiError> {
    state.auth.roles.delete_role(&name).await?;
    record(&state, &manager, "role.delete", &name).await?;
    tracing::info!(role = %name, "Deleted role");
    Ok(StatusCode::NO_CONTENT)
}
