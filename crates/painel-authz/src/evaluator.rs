//! Authorization evaluator.
//!
//! Decides whether an actor holding a role and a permission set satisfies a
//! required permission code. Every check is a pure function of its
//! arguments: no state, no I/O, no errors. Absence of a match is `false`.
//!
//! # Rules
//!
//! Evaluated in order, first match wins:
//!
//! 1. The role is [`SUPER_ADMIN_ROLE`].
//! 2. The permission set contains the required code literally.
//! 3. The permission set contains the bare wildcard `*`.
//! 4. The required code has three segments `cat:res:act` and the set
//!    contains `cat:*:act`.
//!
//! # Example
//!
//! ```
//! use painel_authz::evaluator::{has_permission, can_access_module};
//!
//! let perms = ["module:cobranca:view", "activity:view:own"];
//! assert!(has_permission("Customer Care", &perms, "module:cobranca:view"));
//! assert!(!can_access_module("Customer Care", &perms, "marketing"));
//! assert!(has_permission("ADM", &[] as &[&str], "admin:users:manage"));
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::PermissionCatalog;
use crate::permission::{
    EDIT_CONFIG, MANAGE_USERS, MODULE_CATEGORY, SEPARATOR, VIEW_ALL_ACTIVITIES, VIEW_CONFIG,
    WILDCARD, WILDCARD_SEGMENT, category_wildcard_for, module_view_code,
};
use crate::registry::ModuleRegistry;

/// Role that passes every permission check.
pub const SUPER_ADMIN_ROLE: &str = "ADM";

// =============================================================================
// Core Checks
// =============================================================================

/// Returns `true` if the actor satisfies `required`.
#[must_use]
pub fn has_permission<P: AsRef<str>>(role: &str, permissions: &[P], required: &str) -> bool {
    if role == SUPER_ADMIN_ROLE {
        return true;
    }

    let granted = |code: &str| permissions.iter().any(|p| p.as_ref() == code);

    if granted(required) || granted(WILDCARD) {
        return true;
    }

    category_wildcard_for(required).is_some_and(|wildcard| granted(&wildcard))
}

/// Returns `true` if the actor may view a dashboard module.
///
/// Same as `has_permission(role, permissions, "module:<module_id>:view")`.
#[must_use]
pub fn can_access_module<P: AsRef<str>>(role: &str, permissions: &[P], module_id: &str) -> bool {
    has_permission(role, permissions, &module_view_code(module_id))
}

/// Module identifiers the actor may view, in registry order.
#[must_use]
pub fn get_accessible_modules<P: AsRef<str>>(
    registry: &ModuleRegistry,
    role: &str,
    permissions: &[P],
) -> Vec<String> {
    registry
        .ids()
        .filter(|id| can_access_module(role, permissions, id))
        .map(ToString::to_string)
        .collect()
}

/// Shorthand for `has_permission(.., "admin:users:manage")`.
#[must_use]
pub fn can_manage_users<P: AsRef<str>>(role: &str, permissions: &[P]) -> bool {
    has_permission(role, permissions, MANAGE_USERS)
}

/// Shorthand for `has_permission(.., "admin:config:view")`.
#[must_use]
pub fn can_view_config<P: AsRef<str>>(role: &str, permissions: &[P]) -> bool {
    has_permission(role, permissions, VIEW_CONFIG)
}

/// Shorthand for `has_permission(.., "admin:config:edit")`.
#[must_use]
pub fn can_edit_config<P: AsRef<str>>(role: &str, permissions: &[P]) -> bool {
    has_permission(role, permissions, EDIT_CONFIG)
}

/// Shorthand for `has_permission(.., "activity:view:all")`.
#[must_use]
pub fn can_view_all_activities<P: AsRef<str>>(role: &str, permissions: &[P]) -> bool {
    has_permission(role, permissions, VIEW_ALL_ACTIVITIES)
}

// =============================================================================
// Expansion
// =============================================================================

/// Resolves wildcards in a permission set into concrete codes.
///
/// - `*` becomes every code known to `catalog` (role grants and
///   definitions), minus `*` itself.
/// - `module:*:<action>` becomes `module:<id>:<action>` for each module in
///   `registry`.
/// - Any other `<category>:*:<action>` expands to nothing.
/// - Everything else is kept as is.
///
/// The result holds each code once, in first-seen order.
#[must_use]
pub fn expand_permissions<P: AsRef<str>>(
    permissions: &[P],
    registry: &ModuleRegistry,
    catalog: &PermissionCatalog,
) -> Vec<String> {
    let mut expansion = Expansion::default();

    for entry in permissions {
        let entry = entry.as_ref();
        if entry == WILDCARD {
            for code in catalog.known_codes().filter(|c| *c != WILDCARD) {
                expansion.add_entry(code, registry);
            }
        } else {
            expansion.add_entry(entry, registry);
        }
    }

    expansion.codes
}

#[derive(Default)]
struct Expansion {
    seen: HashSet<String>,
    codes: Vec<String>,
}

impl Expansion {
    fn add_entry(&mut self, entry: &str, registry: &ModuleRegistry) {
        let parts: Vec<&str> = entry.split(SEPARATOR).collect();
        if let [category, WILDCARD_SEGMENT, action] = parts.as_slice() {
            if *category == MODULE_CATEGORY {
                for id in registry.ids() {
                    self.push(format!("{MODULE_CATEGORY}{SEPARATOR}{id}{SEPARATOR}{action}"));
                }
            }
            return;
        }
        self.push(entry.to_string());
    }

    fn push(&mut self, code: String) {
        if self.seen.insert(code.clone()) {
            self.codes.push(code);
        }
    }
}

// =============================================================================
// Capabilities
// =============================================================================

/// The named administrative checks, evaluated together.
///
/// Handy for clients deciding which controls to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub manage_users: bool,
    pub view_config: bool,
    pub edit_config: bool,
    pub view_all_activities: bool,
}

impl Capabilities {
    /// Evaluates every capability for an actor.
    #[must_use]
    pub fn for_actor<P: AsRef<str>>(role: &str, permissions: &[P]) -> Self {
        Self {
            manage_users: can_manage_users(role, permissions),
            view_config: can_view_config(role, permissions),
            edit_config: can_edit_config(role, permissions),
            view_all_activities: can_view_all_activities(role, permissions),
        }
    }
}

// =============================================================================
// Evaluator
// =============================================================================

/// The evaluator bundled with the tables it consults.
///
/// Cloning is cheap; one instance is shared by every enforcement point.
#[derive(Debug, Clone)]
pub struct Evaluator {
    registry: Arc<ModuleRegistry>,
    catalog: Arc<PermissionCatalog>,
}

impl Evaluator {
    /// Creates an evaluator over the given tables.
    #[must_use]
    pub fn new(registry: Arc<ModuleRegistry>, catalog: Arc<PermissionCatalog>) -> Self {
        Self { registry, catalog }
    }

    /// Creates an evaluator over the built-in registry and catalog.
    #[must_use]
    pub fn standard() -> Self {
        let registry = ModuleRegistry::default();
        let catalog = PermissionCatalog::standard(&registry);
        Self::new(Arc::new(registry), Arc::new(catalog))
    }

    /// The module registry.
    #[must_use]
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// The permission catalog.
    #[must_use]
    pub fn catalog(&self) -> &PermissionCatalog {
        &self.catalog
    }

    /// See [`has_permission`].
    #[must_use]
    pub fn has_permission<P: AsRef<str>>(&self, role: &str, permissions: &[P], required: &str) -> bool {
        has_permission(role, permissions, required)
    }

    /// See [`can_access_module`].
    #[must_use]
    pub fn can_access_module<P: AsRef<str>>(
        &self,
        role: &str,
        permissions: &[P],
        module_id: &str,
    ) -> bool {
        can_access_module(role, permissions, module_id)
    }

    /// See [`get_accessible_modules`].
    #[must_use]
    pub fn accessible_modules<P: AsRef<str>>(&self, role: &str, permissions: &[P]) -> Vec<String> {
        get_accessible_modules(&self.registry, role, permissions)
    }

    /// See [`Capabilities::for_actor`].
    #[must_use]
    pub fn capabilities<P: AsRef<str>>(&self, role: &str, permissions: &[P]) -> Capabilities {
        Capabilities::for_actor(role, permissions)
    }

    /// See [`expand_permissions`].
    #[must_use]
    pub fn expand_permissions<P: AsRef<str>>(&self, permissions: &[P]) -> Vec<String> {
        expand_permissions(permissions, &self.registry, &self.catalog)
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::standard()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const NO_PERMS: &[&str] = &[];

    #[test]
    fn test_super_admin_bypass() {
        assert!(has_permission("ADM", NO_PERMS, "admin:users:manage"));
        assert!(has_permission("ADM", &["garbage"], "anything"));
        assert!(has_permission("ADM", NO_PERMS, ""));
    }

    #[test]
    fn test_super_admin_is_case_sensitive() {
        assert!(!has_permission("adm", NO_PERMS, "admin:users:manage"));
        assert!(!has_permission("ADM ", NO_PERMS, "admin:users:manage"));
    }

    #[test]
    fn test_exact_match() {
        let perms = ["module:cobranca:view", "activity:view:own"];
        assert!(has_permission("Customer Care", &perms, "module:cobranca:view"));
        assert!(!has_permission("Customer Care", &perms, "module:marketing:view"));
    }

    #[test]
    fn test_bare_wildcard() {
        assert!(has_permission("Qualquer", &["*"], "admin:config:edit"));
        assert!(has_permission("Qualquer", &["*"], "malformed"));
    }

    #[test]
    fn test_resource_wildcard() {
        let perms = ["module:*:view"];
        assert!(has_permission("Investidor", &perms, "module:alunos-ativos:view"));
        assert!(!has_permission("Investidor", &perms, "module:alunos-ativos:edit"));
        assert!(!has_permission("Investidor", &perms, "admin:alunos-ativos:view"));
    }

    #[test]
    fn test_wildcard_does_not_cross_action() {
        assert!(!has_permission("Gestor", &["admin:*:manage"], "admin:users:view"));
        assert!(has_permission("Gestor", &["admin:*:manage"], "admin:users:manage"));
    }

    #[test]
    fn test_no_category_or_action_wildcard() {
        assert!(!has_permission("Gestor", &["*:users:manage"], "admin:users:manage"));
        assert!(!has_permission("Gestor", &["admin:users:*"], "admin:users:manage"));
    }

    #[test]
    fn test_malformed_required_is_literal() {
        assert!(has_permission("Gestor", &["admin:users"], "admin:users"));
        assert!(!has_permission("Gestor", &["admin:*"], "admin:users"));
        assert!(!has_permission("Gestor", &["a:*:d"], "a:b:c:d"));
    }

    #[test]
    fn test_empty_set_denies() {
        assert!(!has_permission("Marketing", NO_PERMS, "module:marketing:view"));
    }

    #[test]
    fn test_accepts_owned_strings() {
        let perms = vec!["module:marketing:view".to_string()];
        assert!(can_access_module("Marketing", &perms, "marketing"));
    }

    #[test]
    fn test_derived_checks_use_fixed_codes() {
        assert!(can_manage_users("X", &["admin:users:manage"]));
        assert!(!can_manage_users("X", &["admin:users:view"]));
        assert!(can_view_config("X", &["admin:config:view"]));
        assert!(!can_edit_config("X", &["admin:config:view"]));
        assert!(can_edit_config("X", &["admin:*:edit"]));
        assert!(can_view_all_activities("X", &["activity:view:all"]));
        assert!(!can_view_all_activities("X", &["activity:view:own"]));
    }

    #[test]
    fn test_accessible_modules_registry_order() {
        let registry = ModuleRegistry::default();
        let perms = ["module:marketing:view", "module:vendas-b2c:view"];
        assert_eq!(
            get_accessible_modules(&registry, "Comercial", &perms),
            vec!["vendas-b2c".to_string(), "marketing".to_string()]
        );
    }

    #[test]
    fn test_accessible_modules_empty_registry() {
        let registry = ModuleRegistry::empty();
        assert!(get_accessible_modules(&registry, "ADM", NO_PERMS).is_empty());
    }

    #[test]
    fn test_expand_module_wildcard() {
        let registry = ModuleRegistry::from_ids(["a", "b"]);
        let catalog = PermissionCatalog::new(Vec::new(), Vec::new());
        let expanded = expand_permissions(&["module:*:view", "module:a:view"], &registry, &catalog);
        assert_eq!(expanded, vec!["module:a:view", "module:b:view"]);
    }

    #[test]
    fn test_expand_other_category_wildcard_is_empty() {
        let registry = ModuleRegistry::default();
        let catalog = PermissionCatalog::standard(&registry);
        let expanded = expand_permissions(&["admin:*:manage"], &registry, &catalog);
        assert!(expanded.is_empty());
    }

    #[test]
    fn test_expand_keeps_plain_entries() {
        let registry = ModuleRegistry::default();
        let catalog = PermissionCatalog::standard(&registry);
        let expanded = expand_permissions(&["activity:view:own", "custom"], &registry, &catalog);
        assert_eq!(expanded, vec!["activity:view:own", "custom"]);
    }

    #[test]
    fn test_expand_bare_wildcard() {
        let registry = ModuleRegistry::default();
        let catalog = PermissionCatalog::standard(&registry);
        let expanded = expand_permissions(&["*"], &registry, &catalog);

        assert!(!expanded.is_empty());
        assert!(expanded.iter().all(|c| !c.split(':').any(|s| s == "*")));
        assert!(expanded.contains(&"admin:users:manage".to_string()));
        assert!(expanded.contains(&"module:financeiro:view".to_string()));
    }

    #[test]
    fn test_capabilities() {
        let caps = Capabilities::for_actor("Diretoria", &["admin:config:view", "activity:view:all"]);
        assert_eq!(
            caps,
            Capabilities {
                manage_users: false,
                view_config: true,
                edit_config: false,
                view_all_activities: true,
            }
        );

        let admin = Capabilities::for_actor("ADM", NO_PERMS);
        assert!(admin.manage_users && admin.view_config && admin.edit_config);
    }

    #[test]
    fn test_evaluator_delegates() {
        let evaluator = Evaluator::standard();
        let perms = ["module:marketing:view", "activity:view:own"];
        assert_eq!(
            evaluator.accessible_modules("Marketing", &perms),
            vec!["marketing".to_string()]
        );
        assert!(evaluator.has_permission("Marketing", &perms, "activity:view:own"));
        assert_eq!(evaluator.registry().len(), 7);
    }
}
