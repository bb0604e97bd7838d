//! Login and logout.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::password::{dummy_hash, verify_password};
use crate::server::AppState;
use crate::session::{OptionalSession, clear_session_cookie, session_cookie};
use crate::storage::{Activity, ActivityStorage, UserStorage};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: String,
    pub permissions: Vec<String>,
    /// Modules the new session may open, in registry order.
    pub modules: Vec<String>,
    /// Unix timestamp.
    pub expires_at: i64,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let invalid = || ApiError::unauthorized("Invalid username or password");

    let user = state
        .auth
        .users
        .find_by_username(req.username.trim())
        .await?
        .filter(|u| u.active);

    // Argon2 is CPU bound. Unknown users are checked against a dummy hash so
    // the response time does not reveal which usernames exist.
    let hash = user
        .as_ref()
        .map_or_else(|| dummy_hash().to_string(), |u| u.password_hash.clone());
    let password = req.password;
    let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let user = match (user, verified) {
        (Some(user), Ok(true)) => user,
        (Some(user), Ok(false)) => {
            tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
            return Err(invalid());
        }
        (Some(user), Err(e)) => {
            tracing::warn!(user_id = %user.id, error = %e, "Stored password hash is malformed");
            return Err(invalid());
        }
        (None, _) => {
            tracing::debug!(username = %req.username, "Login rejected: unknown or inactive user");
            return Err(invalid());
        }
    };

    let actor = state.auth.actor_for(&user).await?;
    let (token, claims) = state.auth.tokens.issue(&actor)?;
    let cookie = session_cookie(&state.auth.settings, &token)?;

    state
        .activities
        .record_activity(Activity::new(&user.id, &user.username, "login"))
        .await?;

    tracing::info!(user_id = %user.id, role = %actor.role, "User logged in");

    let modules = state
        .evaluator
        .accessible_modules(&actor.role, &actor.permissions);
    let body = LoginResponse {
        token,
        role: actor.role,
        permissions: actor.permissions,
        modules,
        expires_at: claims.exp,
    };
    Ok(([(SET_COOKIE, cookie)], Json(body)))
}

/// POST /api/auth/logout
///
/// Always succeeds; clears the session cookie.
pub async fn logout(
    State(state): State<AppState>,
    OptionalSession(actor): OptionalSession,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(actor) = actor {
        state
            .activities
            .record_activity(Activity::new(&actor.user_id, &actor.username, "logout"))
            .await?;
        tracing::info!(user_id = %actor.user_id, "User logged out");
    }
    let cookie = clear_session_cookie(&state.auth.settings)?;
    Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, cookie)]))
}
