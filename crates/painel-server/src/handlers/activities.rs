use axum::{
    Json,
    extract::{Query, State},
};
use painel_authz::permission::{VIEW_ALL_ACTIVITIES, VIEW_OWN_ACTIVITIES};
use serde::Deserialize;

use crate::error::ApiError;
use crate::gatekeeper::authorize_any;
use crate::server::AppState;
use crate::session::SessionAuth;
use crate::storage::{Activity, ActivityStorage};

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 500;

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<usize>,
}

/// GET /api/activities
///
/// Everyone's activity with `activity:view:all`, otherwise only the actor's.
pub async fn list_activities(
    State(state): State<AppState>,
    SessionAuth(actor): SessionAuth,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<Activity>>, ApiError> {
    authorize_any(
        &state.evaluator,
        &actor,
        &[VIEW_OWN_ACTIVITIES, VIEW_ALL_ACTIVITIES],
    )?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let capabilities = state.evaluator.capabilities(&actor.role, &actor.permissions);
    let activities = if capabilities.view_all_activities {
        state.activities.list_activities(limit).await?
    } else {
        state
            .activities
            .list_activities_for_user(&actor.user_id, limit)
            .await?
    };
    Ok(Json(activities))
}
