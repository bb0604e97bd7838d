//! Runtime dashboard settings.

use axum::{Json, extract::State};
use painel_authz::permission::{EDIT_CONFIG, VIEW_CONFIG};

use crate::config::DashboardSettings;
use crate::error::ApiError;
use crate::gatekeeper::authorize;
use crate::server::AppState;
use crate::session::SessionAuth;
use crate::storage::{Activity, ActivityStorage};

/// GET /api/admin/config
pub async fn read_config(
    State(state): State<AppState>,
    SessionAuth(actor): SessionAuth,
) -> Result<Json<DashboardSettings>, ApiError> {
    authorize(&state.evaluator, &actor, VIEW_CONFIG)?;
    Ok(Json(state.settings.get()))
}

/// PUT /api/admin/config
pub async fn update_config(
    State(state): State<AppState>,
    SessionAuth(actor): SessionAuth,
    Json(next): Json<DashboardSettings>,
) -> Result<Json<DashboardSettings>, ApiError> {
    authorize(&state.evaluator, &actor, EDIT_CONFIG)?;
    let saved = state.settings.replace(next, state.evaluator.registry())?;

    state
        .activities
        .record_activity(
            Activity::new(&actor.user_id, &actor.username, "config.update").with_detail(format!(
                "title={}, refresh_minutes={}",
                saved.title, saved.refresh_minutes
            )),
        )
        .await?;
    tracing::info!(user_id = %actor.user_id, "Dashboard settings updated");

    Ok(Json(saved))
}
