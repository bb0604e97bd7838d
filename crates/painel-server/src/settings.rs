//! Runtime-editable dashboard settings.

use painel_authz::ModuleRegistry;
use parking_lot::RwLock;

use crate::config::DashboardSettings;
use crate::error::ApiError;

/// Shared holder for the current [`DashboardSettings`].
#[derive(Debug)]
pub struct SettingsStore {
    current: RwLock<DashboardSettings>,
}

impl SettingsStore {
    #[must_use]
    pub fn new(initial: DashboardSettings) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    /// Snapshot of the current settings.
    #[must_use]
    pub fn get(&self) -> DashboardSettings {
        self.current.read().clone()
    }

    /// Validates and swaps in new settings, returning them.
    ///
    /// `default_module` must name a registered module.
    pub fn replace(
        &self,
        next: DashboardSettings,
        registry: &ModuleRegistry,
    ) -> Result<DashboardSettings, ApiError> {
        next.validate().map_err(ApiError::invalid_request)?;
        if let Some(module) = &next.default_module
            && !registry.contains(module)
        {
            return Err(ApiError::invalid_request(format!(
                "unknown module '{module}'"
            )));
        }
        *self.current.write() = next.clone();
        Ok(next)
    }
}
