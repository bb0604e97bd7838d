//! Session extraction.
//!
//! The session token is read from `Authorization: Bearer <token>` first and
//! from the session cookie second. Decoded claims become the request
//! [`Actor`]; with `session_source = "store"` the role and permissions are
//! reloaded from storage instead of trusted from the token.
//!
//! # Example
//!
//! ```ignore
//! async fn handler(SessionAuth(actor): SessionAuth) -> String {
//!     format!("Hello, {}!", actor.username)
//! }
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{
        HeaderMap, HeaderValue,
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
};
use painel_authz::Actor;

use crate::config::{AuthSettings, SessionSource};
use crate::error::ApiError;
use crate::storage::{RoleStorage, UserStorage, effective_permissions};
use crate::token::TokenService;

// =============================================================================
// Auth State
// =============================================================================

/// State required to resolve the request actor.
///
/// Made available to the extractors via `FromRef`.
#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<TokenService>,
    pub users: Arc<dyn UserStorage>,
    pub roles: Arc<dyn RoleStorage>,
    pub settings: Arc<AuthSettings>,
}

impl AuthState {
    pub fn new(
        tokens: Arc<TokenService>,
        users: Arc<dyn UserStorage>,
        roles: Arc<dyn RoleStorage>,
        settings: Arc<AuthSettings>,
    ) -> Self {
        Self {
            tokens,
            users,
            roles,
            settings,
        }
    }

    /// Builds the actor for a stored user from its current role.
    pub async fn actor_for(&self, user: &crate::storage::User) -> Result<Actor, ApiError> {
        let role = self.roles.find_role(&user.role).await?;
        if role.is_none() {
            tracing::warn!(user_id = %user.id, role = %user.role, "User has unknown role");
        }
        Ok(Actor::new(
            user.id.clone(),
            user.username.clone(),
            user.role.clone(),
            effective_permissions(role.as_ref(), user),
        ))
    }
}

/// Resolves the actor of a request.
///
/// `Ok(None)` when no credential is present; an invalid or expired token,
/// or a token for a user that is gone or inactive, is `Unauthorized`.
pub async fn resolve_actor(
    state: &AuthState,
    headers: &HeaderMap,
) -> Result<Option<Actor>, ApiError> {
    let Some(token) = extract_token(headers, &state.settings.cookie_name) else {
        return Ok(None);
    };

    let claims = state.tokens.decode(&token).map_err(|e| {
        tracing::debug!(error = %e, "Failed to decode session token");
        ApiError::from(e)
    })?;

    match state.settings.session_source {
        SessionSource::Token => Ok(Some(claims.to_actor())),
        SessionSource::Store => {
            let user = state
                .users
                .find_by_id(&claims.sub)
                .await?
                .filter(|u| u.active)
                .ok_or_else(|| {
                    tracing::debug!(user_id = %claims.sub, "Session user missing or inactive");
                    ApiError::unauthorized("User is no longer active")
                })?;
            state.actor_for(&user).await.map(Some)
        }
    }
}

// =============================================================================
// Extractors
// =============================================================================

/// Axum extractor requiring a valid session.
///
/// Rejects with `401 Unauthorized` when no usable session is present.
pub struct SessionAuth(pub Actor);

impl<S> FromRequestParts<S> for SessionAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        match resolve_actor(&auth_state, &parts.headers).await? {
            Some(actor) => Ok(SessionAuth(actor)),
            None => Err(ApiError::unauthorized("Missing session")),
        }
    }
}

/// Axum extractor yielding the actor if there is one.
///
/// Missing and invalid credentials both resolve to `None`; only storage
/// failures are propagated.
pub struct OptionalSession(pub Option<Actor>);

impl<S> FromRequestParts<S> for OptionalSession
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        match resolve_actor(&auth_state, &parts.headers).await {
            Ok(actor) => Ok(OptionalSession(actor)),
            Err(ApiError::Unauthorized { .. }) => Ok(OptionalSession(None)),
            Err(e) => Err(e),
        }
    }
}

// =============================================================================
// Token and Cookie Helpers
// =============================================================================

/// Extract the session token from the bearer header or the named cookie.
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    let cookie_header = headers.get(COOKIE)?.to_str().ok()?;
    for cookie in cookie_header.split(';') {
        if let Some((name, value)) = cookie.trim().split_once('=')
            && name.trim() == cookie_name
        {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// `Set-Cookie` value carrying a fresh session token.
pub fn session_cookie(settings: &AuthSettings, token: &str) -> Result<HeaderValue, ApiError> {
    build_cookie(settings, token, settings.token_ttl.as_secs())
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_session_cookie(settings: &AuthSettings) -> Result<HeaderValue, ApiError> {
    build_cookie(settings, "", 0)
}

fn build_cookie(settings: &AuthSettings, value: &str, max_age: u64) -> Result<HeaderValue, ApiError> {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        settings.cookie_name, value, max_age
    );
    if settings.cookie_secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).map_err(|e| ApiError::internal(e.to_string()))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_token_prefers_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(COOKIE, HeaderValue::from_static("painel_session=xyz"));
        assert_eq!(
            extract_token(&headers, "painel_session").as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn test_extract_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; painel_session=xyz; other=1"),
        );
        assert_eq!(
            extract_token(&headers, "painel_session").as_deref(),
            Some("xyz")
        );
        assert_eq!(extract_token(&headers, "missing"), None);
    }

    #[test]
    fn test_extract_token_ignores_empty_values() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        headers.insert(COOKIE, HeaderValue::from_static("painel_session="));
        assert_eq!(extract_token(&headers, "painel_session"), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let mut settings = AuthSettings::default();
        let cookie = session_cookie(&settings, "tok").unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("painel_session=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=28800"));
        assert!(!cookie.contains("Secure"));

        settings.cookie_secure = true;
        let cleared = clear_session_cookie(&settings).unwrap();
        let cleared = cleared.to_str().unwrap();
        assert!(cleared.contains("Max-Age=0"));
        assert!(cleared.ends_with("; Secure"));
    }
}
