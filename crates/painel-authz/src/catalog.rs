//! Permission catalog and role reference table.
//!
//! The catalog describes every permission the dashboard knows about and the
//! default grants of each built-in role. It is plain data: built once at
//! startup from the [`ModuleRegistry`] and handed to whoever needs it.

use serde::{Deserialize, Serialize};

use crate::evaluator::SUPER_ADMIN_ROLE;
use crate::permission::{
    EDIT_CONFIG, MANAGE_USERS, VIEW_ALL_ACTIVITIES, VIEW_CONFIG, VIEW_OWN_ACTIVITIES, WILDCARD,
};
use crate::registry::ModuleRegistry;

// =============================================================================
// Permission Definition
// =============================================================================

/// A grantable permission with display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionDefinition {
    /// The permission code (`category:resource:action`).
    pub code: String,

    /// Display name for the permission.
    pub name: String,

    /// Description of what the permission allows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Category for grouping permissions in the UI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl PermissionDefinition {
    /// Create a new permission with the given code and name.
    #[must_use]
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            description: None,
            category: None,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

// =============================================================================
// Role Defaults
// =============================================================================

/// Default grants for one built-in role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefaults {
    /// Role name as stored on users.
    pub name: String,

    /// Human-readable description.
    pub description: String,

    /// Permission codes and wildcards granted by default.
    pub permissions: Vec<String>,
}

impl RoleDefaults {
    fn new(name: &str, description: &str, permissions: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            permissions: permissions.iter().map(|p| (*p).to_string()).collect(),
        }
    }
}

/// Investor role name.
pub const INVESTOR_ROLE: &str = "Investidor";

/// Board role name.
pub const BOARD_ROLE: &str = "Diretoria";

/// Customer care role name.
pub const CUSTOMER_CARE_ROLE: &str = "Customer Care";

/// Marketing role name.
pub const MARKETING_ROLE: &str = "Marketing";

/// Sales role name.
pub const SALES_ROLE: &str = "Comercial";

/// Returns the built-in role reference table.
#[must_use]
pub fn default_roles() -> Vec<RoleDefaults> {
    vec![
        RoleDefaults::new(SUPER_ADMIN_ROLE, "Administrador com acesso total", &[WILDCARD]),
        RoleDefaults::new(
            INVESTOR_ROLE,
            "Leitura de todos os módulos",
            &["module:*:view", VIEW_OWN_ACTIVITIES],
        ),
        RoleDefaults::new(
            BOARD_ROLE,
            "Leitura de todos os módulos, configuração e atividades",
            &["module:*:view", VIEW_CONFIG, VIEW_ALL_ACTIVITIES],
        ),
        RoleDefaults::new(
            CUSTOMER_CARE_ROLE,
            "Cobrança e alunos ativos",
            &[
                "module:cobranca:view",
                "module:alunos-ativos:view",
                VIEW_OWN_ACTIVITIES,
            ],
        ),
        RoleDefaults::new(
            MARKETING_ROLE,
            "Módulo de marketing",
            &["module:marketing:view", VIEW_OWN_ACTIVITIES],
        ),
        RoleDefaults::new(
            SALES_ROLE,
            "Vendas B2C e B2B",
            &[
                "module:vendas-b2c:view",
                "module:vendas-b2b:view",
                VIEW_OWN_ACTIVITIES,
            ],
        ),
    ]
}

/// Returns the permission definitions for a module registry.
#[must_use]
pub fn default_permissions(registry: &ModuleRegistry) -> Vec<PermissionDefinition> {
    let mut permissions: Vec<PermissionDefinition> = registry
        .modules()
        .iter()
        .map(|module| {
            PermissionDefinition::new(module.view_permission(), format!("Ver {}", module.label))
                .with_description(format!("Acesso ao módulo {}", module.label))
                .with_category("Módulos")
        })
        .collect();

    permissions.extend([
        PermissionDefinition::new(MANAGE_USERS, "Gerenciar Usuários")
            .with_description("Criar, editar e remover usuários e perfis")
            .with_category("Administração"),
        PermissionDefinition::new(VIEW_CONFIG, "Ver Configurações")
            .with_description("Visualizar as configurações do painel")
            .with_category("Administração"),
        PermissionDefinition::new(EDIT_CONFIG, "Editar Configurações")
            .with_description("Alterar as configurações do painel")
            .with_category("Administração"),
        PermissionDefinition::new(VIEW_ALL_ACTIVITIES, "Ver Todas as Atividades")
            .with_description("Visualizar a atividade de todos os usuários")
            .with_category("Atividades"),
        PermissionDefinition::new(VIEW_OWN_ACTIVITIES, "Ver Próprias Atividades")
            .with_description("Visualizar a própria atividade")
            .with_category("Atividades"),
    ]);

    permissions
}

// =============================================================================
// Permission Catalog
// =============================================================================

/// The permission definitions and role reference table known to the system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionCatalog {
    definitions: Vec<PermissionDefinition>,
    roles: Vec<RoleDefaults>,
}

impl PermissionCatalog {
    /// Creates a catalog from explicit tables.
    #[must_use]
    pub fn new(definitions: Vec<PermissionDefinition>, roles: Vec<RoleDefaults>) -> Self {
        Self { definitions, roles }
    }

    /// Creates the built-in catalog for a module registry.
    #[must_use]
    pub fn standard(registry: &ModuleRegistry) -> Self {
        Self::new(default_permissions(registry), default_roles())
    }

    /// Permission definitions.
    #[must_use]
    pub fn definitions(&self) -> &[PermissionDefinition] {
        &self.definitions
    }

    /// Role reference table.
    #[must_use]
    pub fn roles(&self) -> &[RoleDefaults] {
        &self.roles
    }

    /// Default grants for a role, if the role is in the reference table.
    #[must_use]
    pub fn role_defaults(&self, role: &str) -> Option<&RoleDefaults> {
        self.roles.iter().find(|r| r.name == role)
    }

    /// Every code mentioned by the catalog, in first-seen order.
    ///
    /// Role grants are listed before definitions. The bare wildcard is
    /// included if a role grants it; callers filter it as needed.
    pub fn known_codes(&self) -> impl Iterator<Item = &str> {
        let mut seen: Vec<&str> = Vec::new();
        self.roles
            .iter()
            .flat_map(|r| r.permissions.iter().map(String::as_str))
            .chain(self.definitions.iter().map(|d| d.code.as_str()))
            .filter(move |code| {
                if seen.contains(code) {
                    false
                } else {
                    seen.push(*code);
                    true
                }
            })
    }

    /// Returns `true` if the code has a definition.
    #[must_use]
    pub fn is_defined(&self, code: &str) -> bool {
        self.definitions.iter().any(|d| d.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roles() {
        let roles = default_roles();
        let names: Vec<_> = roles.iter().map(|r| r.name.as_str()).collect();
        assert!(names.contains(&"ADM"));
        assert!(names.contains(&"Investidor"));
        assert!(names.contains(&"Customer Care"));
        assert!(names.contains(&"Marketing"));

        let adm = roles.iter().find(|r| r.name == "ADM").unwrap();
        assert_eq!(adm.permissions, vec!["*".to_string()]);
    }

    #[test]
    fn test_default_permissions_cover_modules() {
        let registry = ModuleRegistry::default();
        let permissions = default_permissions(&registry);
        let codes: Vec<_> = permissions.iter().map(|p| p.code.as_str()).collect();

        for id in registry.ids() {
            assert!(codes.contains(&format!("module:{id}:view").as_str()));
        }
        assert!(codes.contains(&"admin:users:manage"));
        assert!(codes.contains(&"activity:view:all"));
    }

    #[test]
    fn test_permission_definition_builder() {
        let perm = PermissionDefinition::new("admin:config:view", "Ver Configurações")
            .with_description("Visualizar")
            .with_category("Administração");

        assert_eq!(perm.code, "admin:config:view");
        assert_eq!(perm.description, Some("Visualizar".to_string()));
        assert_eq!(perm.category, Some("Administração".to_string()));
    }

    #[test]
    fn test_known_codes_deduplicated() {
        let catalog = PermissionCatalog::standard(&ModuleRegistry::default());
        let codes: Vec<_> = catalog.known_codes().collect();
        let mut sorted = codes.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(codes.len(), sorted.len());
        assert!(codes.contains(&"*"));
        assert!(codes.contains(&"module:*:view"));
    }

    #[test]
    fn test_role_defaults_lookup() {
        let catalog = PermissionCatalog::standard(&ModuleRegistry::default());
        let marketing = catalog.role_defaults("Marketing").unwrap();
        assert!(
            marketing
                .permissions
                .contains(&"module:marketing:view".to_string())
        );
        assert!(catalog.role_defaults("Estagiário").is_none());
    }
}
