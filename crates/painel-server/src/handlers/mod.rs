//! HTTP handlers for the dashboard API and pages.

pub mod activities;
pub mod auth;
pub mod config;
pub mod cron;
pub mod me;
pub mod pages;
pub mod permissions;

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}
