//! The actor behind a request.
//!
//! An [`Actor`] is built fresh for every request from whatever the session
//! provider hands over (decoded token claims or a loaded user record) and
//! discarded afterwards. Requests without a session have no actor; the
//! `*_opt` helpers answer `false` for them on every check.

use serde::{Deserialize, Serialize};

use crate::evaluator::{self, Capabilities, SUPER_ADMIN_ROLE};
use crate::registry::ModuleRegistry;

/// Role and permission set of the current user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// User identifier.
    pub user_id: String,

    /// Username for display/logging.
    pub username: String,

    /// Assigned role name.
    pub role: String,

    /// Effective permission codes and wildcards.
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Actor {
    /// Creates an actor.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        username: impl Into<String>,
        role: impl Into<String>,
        permissions: Vec<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            role: role.into(),
            permissions,
        }
    }

    /// Returns `true` if the actor holds the super-admin role.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.role == SUPER_ADMIN_ROLE
    }

    /// Returns `true` if the actor satisfies `required`.
    #[must_use]
    pub fn has_permission(&self, required: &str) -> bool {
        evaluator::has_permission(&self.role, &self.permissions, required)
    }

    /// Returns `true` if the actor satisfies any of `required`.
    #[must_use]
    pub fn has_any_permission(&self, required: &[&str]) -> bool {
        required.iter().any(|p| self.has_permission(p))
    }

    /// Returns `true` if the actor may view the module.
    #[must_use]
    pub fn can_access_module(&self, module_id: &str) -> bool {
        evaluator::can_access_module(&self.role, &self.permissions, module_id)
    }

    /// Modules the actor may view, in registry order.
    #[must_use]
    pub fn accessible_modules(&self, registry: &ModuleRegistry) -> Vec<String> {
        evaluator::get_accessible_modules(registry, &self.role, &self.permissions)
    }

    /// The named administrative checks.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::for_actor(&self.role, &self.permissions)
    }
}

/// Permission check for a possibly absent actor.
#[must_use]
pub fn has_permission_opt(actor: Option<&Actor>, required: &str) -> bool {
    actor.is_some_and(|a| a.has_permission(required))
}

/// Module check for a possibly absent actor.
#[must_use]
pub fn can_access_module_opt(actor: Option<&Actor>, module_id: &str) -> bool {
    actor.is_some_and(|a| a.can_access_module(module_id))
}

/// Accessible modules for a possibly absent actor.
#[must_use]
pub fn accessible_modules_opt(actor: Option<&Actor>, registry: &ModuleRegistry) -> Vec<String> {
    actor
        .map(|a| a.accessible_modules(registry))
        .unwrap_or_default()
}
