//! In-memory storage backend.
//!
//! Users and roles live in `DashMap`s; the activity and run logs are
//! bounded queues behind `parking_lot` locks that drop their oldest entries
//! once full. Nothing survives a restart.

use std::collections::VecDeque;

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use painel_authz::default_roles;
use parking_lot::RwLock;
use time::OffsetDateTime;

use super::{
    Activity, ActivityStorage, JobRun, Role, RoleStorage, RunLog, StorageError, StorageResult,
    User, UserStorage,
};

/// Entries kept per log unless configured otherwise.
pub const DEFAULT_LOG_CAPACITY: usize = 10_000;

/// In-process store implementing every storage trait.
#[derive(Debug)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    /// username -> user id
    usernames: DashMap<String, String>,
    roles: DashMap<String, Role>,
    /// Seed order of the system roles.
    system_roles: Vec<String>,
    activities: RwLock<VecDeque<Activity>>,
    runs: RwLock<VecDeque<JobRun>>,
    log_capacity: usize,
}

impl MemoryStore {
    /// Creates a store seeded with the built-in role table.
    #[must_use]
    pub fn new() -> Self {
        let roles = DashMap::new();
        let mut system_roles = Vec::new();
        for defaults in default_roles() {
            system_roles.push(defaults.name.clone());
            roles.insert(defaults.name.clone(), Role::system(&defaults));
        }
        Self {
            users: DashMap::new(),
            usernames: DashMap::new(),
            roles,
            system_roles,
            activities: RwLock::new(VecDeque::new()),
            runs: RwLock::new(VecDeque::new()),
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }

    /// Keeps at most `capacity` entries in each of the activity and run logs.
    #[must_use]
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity.max(1);
        self
    }

    fn push_bounded<T>(log: &RwLock<VecDeque<T>>, entry: T, capacity: usize) {
        let mut log = log.write();
        log.push_back(entry);
        while log.len() > capacity {
            log.pop_front();
        }
    }

    fn system_rank(&self, name: &str) -> usize {
        self.system_roles
            .iter()
            .position(|r| r == name)
            .unwrap_or(usize::MAX)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStorage for MemoryStore {
    async fn find_by_id(&self, id: &str) -> StorageResult<Option<User>> {
        Ok(self.users.get(id).map(|u| u.value().clone()))
    }

    async fn find_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        let Some(id) = self.usernames.get(username).map(|e| e.value().clone()) else {
            return Ok(None);
        };
        self.find_by_id(&id).await
    }

    async fn list_users(&self) -> StorageResult<Vec<User>> {
        let mut users: Vec<User> = self.users.iter().map(|e| e.value().clone()).collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn create_user(&self, user: User) -> StorageResult<User> {
        match self.usernames.entry(user.username.clone()) {
            Entry::Occupied(_) => {
                return Err(StorageError::Conflict(format!(
                    "username '{}' already exists",
                    user.username
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(user.id.clone());
            }
        }
        self.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn update_user(&self, mut user: User) -> StorageResult<User> {
        // Written through the live entry so a concurrent delete is not undone
        let mut current = self
            .users
            .get_mut(&user.id)
            .ok_or_else(|| StorageError::not_found("user", user.id.clone()))?;

        if current.username != user.username {
            match self.usernames.entry(user.username.clone()) {
                Entry::Occupied(_) => {
                    return Err(StorageError::Conflict(format!(
                        "username '{}' already exists",
                        user.username
                    )));
                }
                Entry::Vacant(slot) => {
                    slot.insert(user.id.clone());
                }
            }
            self.usernames.remove(&current.username);
        }

        user.updated_at = OffsetDateTime::now_utc();
        *current = user.clone();
        Ok(user)
    }

    async fn delete_user(&self, id: &str) -> StorageResult<()> {
        let (_, user) = self
            .users
            .remove(id)
            .ok_or_else(|| StorageError::not_found("user", id))?;
        self.usernames.remove(&user.username);
        Ok(())
    }
}

#[async_trait]
impl RoleStorage for MemoryStore {
    async fn find_role(&self, name: &str) -> StorageResult<Option<Role>> {
        Ok(self.roles.get(name).map(|r| r.value().clone()))
    }

    async fn list_roles(&self) -> StorageResult<Vec<Role>> {
        let mut roles: Vec<Role> = self.roles.iter().map(|e| e.value().clone()).collect();
        roles.sort_by(|a, b| {
            self.system_rank(&a.name)
                .cmp(&self.system_rank(&b.name))
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(roles)
    }

    async fn create_role(&self, role: Role) -> StorageResult<Role> {
        match self.roles.entry(role.name.clone()) {
            Entry::Occupied(_) => Err(StorageError::Conflict(format!(
                "role '{}' already exists",
                role.name
            ))),
            Entry::Vacant(slot) => {
                slot.insert(role.clone());
                Ok(role)
            }
        }
    }

    async fn update_role(&self, mut role: Role) -> StorageResult<Role> {
        let mut entry = self
            .roles
            .get_mut(&role.name)
            .ok_or_else(|| StorageError::not_found("role", role.name.clone()))?;
        role.is_system = entry.is_system;
        role.created_at = entry.created_at;
        role.updated_at = OffsetDateTime::now_utc();
        *entry = role.clone();
        Ok(role)
    }

    async fn delete_role(&self, name: &str) -> StorageResult<()> {
        let is_system = self
            .roles
            .get(name)
            .map(|r| r.is_system)
            .ok_or_else(|| StorageError::not_found("role", name))?;
        if is_system {
            return Err(StorageError::Constraint(format!(
                "role '{name}' is a system role"
            )));
        }
        if self.users.iter().any(|u| u.role == name) {
            return Err(StorageError::Constraint(format!(
                "role '{name}' is still assigned to users"
            )));
        }
        self.roles.remove(name);
        Ok(())
    }
}

#[async_trait]
impl ActivityStorage for MemoryStore {
    async fn record_activity(&self, activity: Activity) -> StorageResult<()> {
        Self::push_bounded(&self.activities, activity, self.log_capacity);
        Ok(())
    }

    async fn list_activities(&self, limit: usize) -> StorageResult<Vec<Activity>> {
        Ok(self.activities.read().iter().rev().take(limit).cloned().collect())
    }

    async fn list_activities_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> StorageResult<Vec<Activity>> {
        Ok(self
            .activities
            .read()
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RunLog for MemoryStore {
    async fn record_run(&self, run: JobRun) -> StorageResult<()> {
        Self::push_bounded(&self.runs, run, self.log_capacity);
        Ok(())
    }

    async fn list_runs(&self, limit: usize) -> StorageResult<Vec<JobRun>> {
        Ok(self.runs.read().iter().rev().take(limit).cloned().collect())
    }
}
