//! Scheduled job endpoint.
//!
//! Called by an external scheduler with the shared secret in
//! `x-cron-secret`. Each call runs the tracker once and records the run.

use axum::{
    Json,
    extract::State,
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::ApiError;
use crate::server::AppState;
use crate::storage::{JobRun, JobStatus, RunLog};
use crate::tracker::Tracker;

pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

#[derive(Debug, Serialize, Deserialize)]
pub struct TrackResponse {
    pub run_id: String,
    pub job: String,
    pub status: JobStatus,
    pub processed: usize,
    pub message: String,
}

/// POST /api/cron/track
pub async fn track(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TrackResponse>, ApiError> {
    let Some(expected) = state.cron_secret.as_deref() else {
        return Err(ApiError::not_found("Cron endpoint is disabled"));
    };
    let provided = headers
        .get(CRON_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if provided.is_empty() || !constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
        tracing::warn!("Cron call rejected: bad secret");
        return Err(ApiError::unauthorized("Invalid cron secret"));
    }

    let job = state.tracker.name().to_string();
    let started_at = OffsetDateTime::now_utc();
    let result = state.tracker.track().await;
    let finished_at = OffsetDateTime::now_utc();

    let (status, processed, message) = match &result {
        Ok(outcome) => (JobStatus::Success, outcome.processed, outcome.message.clone()),
        Err(e) => (JobStatus::Failed, 0, e.to_string()),
    };
    let run = JobRun {
        id: uuid::Uuid::new_v4().to_string(),
        job: job.clone(),
        status,
        message: Some(message.clone()),
        started_at,
        finished_at,
    };
    let run_id = run.id.clone();
    state.runs.record_run(run).await?;

    if let Err(e) = result {
        tracing::error!(job = %job, error = %e, "Tracker run failed");
        return Err(ApiError::internal(e.to_string()));
    }
    tracing::info!(job = %job, processed, "Tracker run finished");

    Ok(Json(TrackResponse {
        run_id,
        job,
        status,
        processed,
        message,
    }))
}

/// Compares without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (left, right) in a.iter().zip(b.iter()) {
        diff |= left ^ right;
    }
    diff == 0
}
