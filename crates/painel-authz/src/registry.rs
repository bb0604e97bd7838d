//! Dashboard module registry.
//!
//! The registry is the fixed, ordered list of dashboard sections. Declaration
//! order is significant: every list derived from the registry (accessible
//! modules, expanded permissions) preserves it.

use serde::{Deserialize, Serialize};

use crate::permission::module_view_code;

/// A dashboard section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    /// Stable identifier used in permission codes and URLs.
    pub id: String,

    /// Display label.
    pub label: String,
}

impl ModuleInfo {
    /// Creates a module entry.
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// The `module:<id>:view` permission for this module.
    #[must_use]
    pub fn view_permission(&self) -> String {
        module_view_code(&self.id)
    }
}

/// Built-in dashboard modules, in display order.
pub const DEFAULT_MODULES: &[(&str, &str)] = &[
    ("visao-geral", "Visão Geral"),
    ("vendas-b2c", "Vendas B2C"),
    ("vendas-b2b", "Vendas B2B"),
    ("alunos-ativos", "Alunos Ativos"),
    ("cobranca", "Cobrança"),
    ("marketing", "Marketing"),
    ("financeiro", "Financeiro"),
];

/// Immutable, ordered list of dashboard modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRegistry {
    modules: Vec<ModuleInfo>,
}

impl ModuleRegistry {
    /// Creates a registry from modules in declaration order.
    ///
    /// Duplicate identifiers are dropped, keeping the first occurrence.
    #[must_use]
    pub fn new(modules: impl IntoIterator<Item = ModuleInfo>) -> Self {
        let mut unique: Vec<ModuleInfo> = Vec::new();
        for module in modules {
            if !unique.iter().any(|m| m.id == module.id) {
                unique.push(module);
            }
        }
        Self { modules: unique }
    }

    /// Creates a registry from bare identifiers, using the id as label.
    #[must_use]
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(ids.into_iter().map(|id| {
            let id = id.into();
            ModuleInfo::new(id.clone(), id)
        }))
    }

    /// Creates an empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// All modules in declaration order.
    #[must_use]
    pub fn modules(&self) -> &[ModuleInfo] {
        &self.modules
    }

    /// Module identifiers in declaration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.id.as_str())
    }

    /// Looks up a module by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ModuleInfo> {
        self.modules.iter().find(|m| m.id == id)
    }

    /// Returns `true` if the identifier is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Number of registered modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns `true` if no modules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new(
            DEFAULT_MODULES
                .iter()
                .map(|(id, label)| ModuleInfo::new(*id, *label)),
        )
    }
}
