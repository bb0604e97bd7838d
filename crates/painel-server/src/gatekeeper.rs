//! Request gatekeeper.
//!
//! Every permission decision on the server goes through [`authorize`], which
//! delegates to the shared [`Evaluator`]. Page routes are additionally
//! guarded by [`page_gate`]: anonymous browsers are redirected to the login
//! page, actors without the route's permission get `403`.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use painel_authz::{
    Actor, Evaluator, ModuleRegistry, SUPER_ADMIN_ROLE,
    permission::{MANAGE_USERS, VIEW_CONFIG, module_view_code},
};

use crate::error::ApiError;
use crate::server::AppState;
use crate::session::{AuthState, SessionAuth, resolve_actor};

/// Fails with `Forbidden` unless `actor` holds `required`.
pub fn authorize(evaluator: &Evaluator, actor: &Actor, required: &str) -> Result<(), ApiError> {
    if evaluator.has_permission(&actor.role, &actor.permissions, required) {
        tracing::trace!(
            user_id = %actor.user_id,
            role = %actor.role,
            required,
            "permission granted"
        );
        return Ok(());
    }
    tracing::debug!(
        user_id = %actor.user_id,
        role = %actor.role,
        required,
        "permission denied"
    );
    Err(ApiError::forbidden(format!("Missing permission {required}")))
}

/// Fails with `Forbidden` unless `actor` holds at least one of `required`.
pub fn authorize_any(
    evaluator: &Evaluator,
    actor: &Actor,
    required: &[&str],
) -> Result<(), ApiError> {
    if required
        .iter()
        .any(|code| evaluator.has_permission(&actor.role, &actor.permissions, code))
    {
        return Ok(());
    }
    tracing::debug!(
        user_id = %actor.user_id,
        role = %actor.role,
        required = ?required,
        "permission denied"
    );
    Err(ApiError::forbidden(format!(
        "Missing one of permissions {}",
        required.join(", ")
    )))
}

/// Fails with `Forbidden` unless `actor` may hand out `grants`, optionally
/// together with `role`.
///
/// Only the super-admin may assign or edit the super-admin role. Anyone
/// else can only grant codes their own permission set already covers, so
/// `*` and wildcards need the actor to hold them.
pub fn authorize_grants<P: AsRef<str>>(
    evaluator: &Evaluator,
    actor: &Actor,
    role: Option<&str>,
    grants: &[P],
) -> Result<(), ApiError> {
    if actor.role == SUPER_ADMIN_ROLE {
        return Ok(());
    }
    if role == Some(SUPER_ADMIN_ROLE) {
        tracing::debug!(
            user_id = %actor.user_id,
            role = %actor.role,
            "super-admin role assignment denied"
        );
        return Err(ApiError::forbidden(format!(
            "Only {SUPER_ADMIN_ROLE} may assign or edit the {SUPER_ADMIN_ROLE} role"
        )));
    }
    for grant in grants {
        let grant = grant.as_ref();
        if !evaluator.has_permission(&actor.role, &actor.permissions, grant) {
            tracing::debug!(
                user_id = %actor.user_id,
                role = %actor.role,
                grant,
                "grant beyond own permissions denied"
            );
            return Err(ApiError::forbidden(format!(
                "Cannot grant {grant} without holding it"
            )));
        }
    }
    Ok(())
}

// =============================================================================
// User Manager Extractor
// =============================================================================

/// Actor allowed to manage users and roles (`admin:users:manage`).
///
/// Rejects with `401` without a session and `403` without the permission.
#[derive(Debug, Clone)]
pub struct UserManager(pub Actor);

impl<S> FromRequestParts<S> for UserManager
where
    S: Send + Sync,
    AuthState: FromRef<S>,
    Arc<Evaluator>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let SessionAuth(actor) = SessionAuth::from_request_parts(parts, state).await?;
        let evaluator = Arc::<Evaluator>::from_ref(state);
        authorize(&evaluator, &actor, MANAGE_USERS)?;
        Ok(Self(actor))
    }
}

// =============================================================================
// Page Rules
// =============================================================================

/// What a page route demands from the actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRule {
    /// Any signed-in actor.
    Session,
    /// A specific permission code.
    Permission(String),
    /// `/dashboard/{module}` for a module outside the registry.
    UnknownModule(String),
}

/// Resolves the rule for a page path, `None` for paths that are not gated.
#[must_use]
pub fn page_rule(path: &str, registry: &ModuleRegistry) -> Option<PageRule> {
    let path = path.trim_end_matches('/');
    match path {
        "/dashboard" => return Some(PageRule::Session),
        "/admin/users" => return Some(PageRule::Permission(MANAGE_USERS.to_string())),
        "/admin/config" => return Some(PageRule::Permission(VIEW_CONFIG.to_string())),
        _ => {}
    }

    let module = path.strip_prefix("/dashboard/")?;
    if module.is_empty() || module.contains('/') {
        return None;
    }
    if registry.contains(module) {
        Some(PageRule::Permission(module_view_code(module)))
    } else {
        Some(PageRule::UnknownModule(module.to_string()))
    }
}

/// Middleware for page routes.
///
/// On success the resolved [`Actor`] is inserted into the request
/// extensions for the page handler.
pub async fn page_gate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let Some(rule) = page_rule(req.uri().path(), state.evaluator.registry()) else {
        return next.run(req).await;
    };

    let actor = match resolve_actor(&state.auth, req.headers()).await {
        Ok(actor) => actor,
        Err(ApiError::Unauthorized { .. }) => None,
        Err(e) => return e.into_response(),
    };

    let Some(actor) = actor else {
        let target = req
            .uri()
            .path_and_query()
            .map_or_else(|| req.uri().path().to_string(), |pq| pq.as_str().to_string());
        tracing::debug!(path = %target, "no session, redirecting to login");
        return login_redirect(&state.auth.settings.login_path, &target).into_response();
    };

    let decision = match &rule {
        PageRule::Session => Ok(()),
        PageRule::Permission(code) => authorize(&state.evaluator, &actor, code),
        PageRule::UnknownModule(module) => {
            Err(ApiError::not_found(format!("Unknown module '{module}'")))
        }
    };
    if let Err(e) = decision {
        return e.into_response();
    }

    req.extensions_mut().insert(actor);
    next.run(req).await
}

/// `303` redirect to the login page carrying the original target.
#[must_use]
pub fn login_redirect(login_path: &str, next: &str) -> Redirect {
    Redirect::to(&format!("{login_path}?next={}", urlencoding::encode(next)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn actor(role: &str, permissions: &[&str]) -> Actor {
        Actor::new(
            "u-1",
            "ana",
            role,
            permissions.iter().map(|p| (*p).to_string()).collect(),
        )
    }

    #[test]
    fn test_page_rules() {
        let registry = ModuleRegistry::default();
        assert_eq!(page_rule("/dashboard", &registry), Some(PageRule::Session));
        assert_eq!(
            page_rule("/dashboard/cobranca", &registry),
            Some(PageRule::Permission("module:cobranca:view".into()))
        );
        assert_eq!(
            page_rule("/dashboard/rh", &registry),
            Some(PageRule::UnknownModule("rh".into()))
        );
        assert_eq!(
            page_rule("/admin/users/", &registry),
            Some(PageRule::Permission("admin:users:manage".into()))
        );
        assert_eq!(
            page_rule("/admin/config", &registry),
            Some(PageRule::Permission("admin:config:view".into()))
        );
        assert_eq!(page_rule("/healthz", &registry), None);
        assert_eq!(page_rule("/dashboard/a/b", &registry), None);
    }

    #[test]
    fn test_authorize() {
        let evaluator = Evaluator::standard();
        let marketing = actor("Marketing", &["module:marketing:view"]);

        assert!(authorize(&evaluator, &marketing, "module:marketing:view").is_ok());
        let err = authorize(&evaluator, &marketing, "admin:users:manage").unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let admin = actor("ADM", &[]);
        assert!(authorize(&evaluator, &admin, "admin:users:manage").is_ok());
    }

    #[test]
    fn test_authorize_any() {
        let evaluator = Evaluator::standard();
        let board = actor("Diretoria", &["activity:view:all"]);
        assert!(
            authorize_any(&evaluator, &board, &["activity:view:own", "activity:view:all"]).is_ok()
        );
        let nobody = actor("Marketing", &[]);
        assert!(authorize_any(&evaluator, &nobody, &["activity:view:own"]).is_err());
    }

    #[test]
    fn test_grants_limited_to_own_permissions() {
        let evaluator = Evaluator::standard();
        let manager = actor(
            "Marketing",
            &["module:marketing:view", "admin:users:manage", "activity:view:own"],
        );

        assert!(
            authorize_grants(&evaluator, &manager, Some("Marketing"), &["module:marketing:view"])
                .is_ok()
        );
        assert!(authorize_grants(&evaluator, &manager, Some("ADM"), &[] as &[&str]).is_err());
        assert!(authorize_grants(&evaluator, &manager, None, &["*"]).is_err());
        assert!(authorize_grants(&evaluator, &manager, None, &["module:*:view"]).is_err());
        let err = authorize_grants(&evaluator, &manager, None, &["admin:config:edit"]).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        // Holding a wildcard covers granting it
        let board = actor("Diretoria", &["module:*:view"]);
        assert!(authorize_grants(&evaluator, &board, None, &["module:*:view"]).is_ok());
        assert!(authorize_grants(&evaluator, &board, None, &["module:cobranca:view"]).is_ok());

        let admin = actor("ADM", &[]);
        assert!(authorize_grants(&evaluator, &admin, Some("ADM"), &["*"]).is_ok());
    }

    #[test]
    fn test_login_redirect_encodes_target() {
        let response = login_redirect("/login", "/dashboard/vendas-b2c?x=1").into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()["location"],
            "/login?next=%2Fdashboard%2Fvendas-b2c%3Fx%3D1"
        );
    }
}
