//! Permission catalog and wildcard expansion preview.

use axum::{Json, extract::State};
use painel_authz::{PermissionDefinition, RoleDefaults};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::gatekeeper::UserManager;
use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct CatalogResponse {
    pub permissions: Vec<PermissionDefinition>,
    /// Built-in role reference table.
    pub roles: Vec<RoleDefaults>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExpandRequest {
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExpandResponse {
    pub permissions: Vec<String>,
}

/// GET /api/permissions/catalog
pub async fn catalog(
    State(state): State<AppState>,
    _manager: UserManager,
) -> Result<Json<CatalogResponse>, ApiError> {
    let catalog = state.evaluator.catalog();
    Ok(Json(CatalogResponse {
        permissions: catalog.definitions().to_vec(),
        roles: catalog.roles().to_vec(),
    }))
}

/// POST /api/permissions/expand
///
/// Shows the concrete codes a permission set stands for, e.g. in the role
/// editor. Malformed entries pass through unchanged.
pub async fn expand(
    State(state): State<AppState>,
    _manager: UserManager,
    Json(req): Json<ExpandRequest>,
) -> Result<Json<ExpandResponse>, ApiError> {
    Ok(Json(ExpandResponse {
        permissions: state.evaluator.expand_permissions(&req.permissions),
    }))
}
