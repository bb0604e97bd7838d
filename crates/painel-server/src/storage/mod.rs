//! Persistence interface for users, roles, activities and cron runs.
//!
//! Backends implement the async traits below; [`memory::MemoryStore`] is the
//! bundled in-process implementation.

pub mod memory;

use async_trait::async_trait;
use painel_authz::{PermissionCodeError, RoleDefaults, validate_grant};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub use memory::MemoryStore;

// =============================================================================
// Errors
// =============================================================================

/// Errors raised by storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The addressed entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity ("user", "role", ...).
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// A unique key is already taken.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The operation would break an integrity rule.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// The backend itself failed.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Returns `true` if this is a `NotFound` error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Types
// =============================================================================

/// A dashboard user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,

    /// Login name, unique.
    pub username: String,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Argon2 PHC hash. Never serialized.
    #[serde(default, skip_serializing)]
    pub password_hash: String,

    /// Assigned role name.
    pub role: String,

    /// Grants on top of the role's permissions.
    #[serde(default)]
    pub extra_permissions: Vec<String>,

    /// Inactive users cannot log in.
    pub active: bool,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Creates an active user with a fresh id.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        role: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.into(),
            name: None,
            password_hash: password_hash.into(),
            role: role.into(),
            extra_permissions: Vec::new(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_extra_permissions(mut self, permissions: Vec<String>) -> Self {
        self.extra_permissions = permissions;
        self
    }
}

/// A named bundle of permission grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Permission codes and wildcards.
    #[serde(default)]
    pub permissions: Vec<String>,

    /// Seeded roles cannot be deleted.
    #[serde(default)]
    pub is_system: bool,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Role {
    /// Creates a custom (non-system) role.
    #[must_use]
    pub fn new(name: impl Into<String>, permissions: Vec<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            name: name.into(),
            description: None,
            permissions,
            is_system: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Creates the system role for a reference table entry.
    #[must_use]
    pub fn system(defaults: &RoleDefaults) -> Self {
        let mut role = Self::new(defaults.name.clone(), defaults.permissions.clone())
            .with_description(defaults.description.clone());
        role.is_system = true;
        role
    }
}

/// An entry of the activity log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub user_id: String,
    pub username: String,
    /// Short action name, e.g. `login` or `user.create`.
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Activity {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        username: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            username: username.into(),
            action: action.into(),
            detail: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Outcome of a scheduled job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Success,
    Failed,
}

/// A recorded run of a scheduled job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRun {
    pub id: String,
    pub job: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
}

// =============================================================================
// Traits
// =============================================================================

#[async_trait]
pub trait UserStorage: Send + Sync {
    async fn find_by_id(&self, id: &str) -> StorageResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> StorageResult<Option<User>>;

    /// Users ordered by username.
    async fn list_users(&self) -> StorageResult<Vec<User>>;

    /// Fails with `Conflict` if the username is taken.
    async fn create_user(&self, user: User) -> StorageResult<User>;

    async fn update_user(&self, user: User) -> StorageResult<User>;

    async fn delete_user(&self, id: &str) -> StorageResult<()>;
}

#[async_trait]
pub trait RoleStorage: Send + Sync {
    async fn find_role(&self, name: &str) -> StorageResult<Option<Role>>;

    /// System roles first, in seed order, then custom roles by name.
    async fn list_roles(&self) -> StorageResult<Vec<Role>>;

    async fn create_role(&self, role: Role) -> StorageResult<Role>;

    async fn update_role(&self, role: Role) -> StorageResult<Role>;

    /// Fails with `Constraint` for system roles and roles still assigned.
    async fn delete_role(&self, name: &str) -> StorageResult<()>;
}

#[async_trait]
pub trait ActivityStorage: Send + Sync {
    async fn record_activity(&self, activity: Activity) -> StorageResult<()>;

    /// Newest first.
    async fn list_activities(&self, limit: usize) -> StorageResult<Vec<Activity>>;

    /// Newest first.
    async fn list_activities_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> StorageResult<Vec<Activity>>;
}

#[async_trait]
pub trait RunLog: Send + Sync {
    async fn record_run(&self, run: JobRun) -> StorageResult<()>;

    /// Newest first.
    async fn list_runs(&self, limit: usize) -> StorageResult<Vec<JobRun>>;
}

// =============================================================================
// Helpers
// =============================================================================

/// Role permissions followed by the user's extra grants, deduplicated.
///
/// A missing role contributes nothing.
#[must_use]
pub fn effective_permissions(role: Option<&Role>, user: &User) -> Vec<String> {
    let mut permissions: Vec<String> = Vec::new();
    let role_grants = role.map(|r| r.permissions.as_slice()).unwrap_or_default();
    for grant in role_grants.iter().chain(&user.extra_permissions) {
        if !permissions.contains(grant) {
            permissions.push(grant.clone());
        }
    }
    permissions
}

/// Checks every entry of a permission set before it is stored.
///
/// # Errors
///
/// Returns the first malformed entry's parse error.
pub fn validate_permission_set(permissions: &[String]) -> Result<(), PermissionCodeError> {
    permissions.iter().try_for_each(|p| validate_grant(p))
}
