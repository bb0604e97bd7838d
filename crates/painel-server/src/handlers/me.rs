//! What the current actor may see.
//!
//! Clients render from these answers, but every protected route checks the
//! same evaluator again on its own.

use axum::{Json, extract::State};
use painel_authz::Capabilities;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::server::AppState;
use crate::session::SessionAuth;

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user_id: String,
    pub username: String,
    pub role: String,
    pub permissions: Vec<String>,
    /// Accessible modules in registry order.
    pub modules: Vec<String>,
    pub capabilities: Capabilities,
    /// Module to open first: the configured default when accessible,
    /// otherwise the first accessible one.
    pub landing_module: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModuleView {
    pub id: String,
    pub label: String,
    pub accessible: bool,
}

/// GET /api/me
pub async fn me(
    State(state): State<AppState>,
    SessionAuth(actor): SessionAuth,
) -> Result<Json<MeResponse>, ApiError> {
    let evaluator = &state.evaluator;
    let modules = evaluator.accessible_modules(&actor.role, &actor.permissions);
    let capabilities = evaluator.capabilities(&actor.role, &actor.permissions);
    let landing_module = landing_module(&state, &modules);

    Ok(Json(MeResponse {
        user_id: actor.user_id,
        username: actor.username,
        role: actor.role,
        permissions: actor.permissions,
        modules,
        capabilities,
        landing_module,
    }))
}

/// GET /api/modules
pub async fn modules(
    State(state): State<AppState>,
    SessionAuth(actor): SessionAuth,
) -> Result<Json<Vec<ModuleView>>, ApiError> {
    let evaluator = &state.evaluator;
    let views = evaluator
        .registry()
        .modules()
        .iter()
        .map(|m| ModuleView {
            id: m.id.clone(),
            label: m.label.clone(),
            accessible: evaluator.can_access_module(&actor.role, &actor.permissions, &m.id),
        })
        .collect();
    Ok(Json(views))
}

pub(crate) fn landing_module(state: &AppState, accessible: &[String]) -> Option<String> {
    state
        .settings
        .get()
        .default_module
        .filter(|m| accessible.contains(m))
        .or_else(|| accessible.first().cloned())
}
