//! # painel-authz
//!
//! Role and permission evaluation for the Painel executive dashboard.
//!
//! This crate provides:
//! - Permission code syntax and wildcard forms
//! - The dashboard module registry
//! - The permission catalog and role reference table
//! - The authorization evaluator shared by every enforcement point
//!
//! Everything here is pure: no I/O, no global state. Tables are built once
//! at startup and passed in.
//!
//! ## Modules
//!
//! - [`permission`] - Permission codes and well-known constants
//! - [`registry`] - Dashboard modules
//! - [`catalog`] - Permission definitions and default role grants
//! - [`evaluator`] - Permission checks and wildcard expansion
//! - [`actor`] - Per-request actor wrapper

pub mod actor;
pub mod catalog;
pub mod evaluator;
pub mod permission;
pub mod registry;

pub use actor::{Actor, accessible_modules_opt, can_access_module_opt, has_permission_opt};
pub use catalog::{PermissionCatalog, PermissionDefinition, RoleDefaults, default_roles};
pub use evaluator::{
    Capabilities, Evaluator, SUPER_ADMIN_ROLE, can_access_module, can_edit_config,
    can_manage_users, can_view_all_activities, can_view_config, expand_permissions,
    get_accessible_modules, has_permission,
};
pub use permission::{PermissionCode, PermissionCodeError, WILDCARD, validate_grant};
pub use registry::{ModuleInfo, ModuleRegistry};
