//! Session token issuing and validation.
//!
//! Sessions are HS256 JWTs carrying the actor's role and effective
//! permissions, so the gatekeeper can evaluate a request without a storage
//! round trip.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use painel_authz::Actor;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::AuthSettings;

/// Errors that can occur while issuing or validating a session token.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Failed to sign a token.
    #[error("Failed to encode token: {0}")]
    Encoding(String),

    /// The token has expired.
    #[error("Token expired")]
    Expired,

    /// The token is malformed, tampered with, or from another issuer.
    #[error("Invalid token: {0}")]
    Invalid(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Invalid(err.to_string()),
        }
    }
}

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub iss: String,
    /// User id.
    pub sub: String,
    pub username: String,
    pub role: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl SessionClaims {
    /// Builds the request actor from these claims.
    #[must_use]
    pub fn to_actor(&self) -> Actor {
        Actor::new(
            self.sub.clone(),
            self.username.clone(),
            self.role.clone(),
            self.permissions.clone(),
        )
    }
}

/// Signs and verifies session tokens with a shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Creates a service signing with `secret`.
    #[must_use]
    pub fn new(secret: &[u8], issuer: impl Into<String>, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            ttl,
        }
    }

    /// Creates a service from the `[auth]` configuration section.
    #[must_use]
    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(
            settings.jwt_secret.as_bytes(),
            settings.issuer.clone(),
            settings.token_ttl,
        )
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token for `actor`.
    pub fn issue(&self, actor: &Actor) -> Result<(String, SessionClaims), TokenError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = SessionClaims {
            iss: self.issuer.clone(),
            sub: actor.user_id.clone(),
            username: actor.username.clone(),
            role: actor.role.clone(),
            permissions: actor.permissions.clone(),
            iat: now,
            exp: now.saturating_add(ttl),
            jti: Uuid::new_v4().to_string(),
        };
        let token = self.encode(&claims)?;
        Ok((token, claims))
    }

    /// Signs arbitrary claims.
    pub fn encode(&self, claims: &SessionClaims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verifies signature, issuer and expiry, returning the claims.
    pub fn decode(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.leeway = 0;

        let data = decode::<SessionClaims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }
}
