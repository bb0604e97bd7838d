//! Startup seeding.

use painel_authz::SUPER_ADMIN_ROLE;

use crate::config::AdminUserConfig;
use crate::password::hash_password;
use crate::storage::{StorageError, User, UserStorage};

/// Result of [`ensure_admin_user`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminBootstrap {
    Created,
    AlreadyExists,
}

/// Creates the configured `ADM` user unless the username is taken.
///
/// An existing user is never modified, so restarting with a changed
/// password does not reset it.
pub async fn ensure_admin_user(
    users: &dyn UserStorage,
    admin: &AdminUserConfig,
) -> anyhow::Result<AdminBootstrap> {
    if users.find_by_username(&admin.username).await?.is_some() {
        tracing::debug!(username = %admin.username, "Bootstrap admin already exists");
        return Ok(AdminBootstrap::AlreadyExists);
    }

    let password = admin.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await?
        .map_err(|e| anyhow::anyhow!("failed to hash bootstrap password: {e}"))?;

    let mut user = User::new(admin.username.clone(), SUPER_ADMIN_ROLE, password_hash);
    user.name = admin.name.clone();

    match users.create_user(user).await {
        Ok(user) => {
            tracing::info!(username = %user.username, "Bootstrap admin user created");
            Ok(AdminBootstrap::Created)
        }
        // Lost a race with another writer
        Err(StorageError::Conflict(_)) => Ok(AdminBootstrap::AlreadyExists),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::verify_password;
    use crate::storage::MemoryStore;

    fn admin() -> AdminUserConfig {
        AdminUserConfig {
            username: "admin".to_string(),
            password: "trocar-esta-senha".to_string(),
            name: Some("Administrador".to_string()),
        }
    }

    #[tokio::test]
    async fn test_creates_admin_once() {
        let store = MemoryStore::new();

        let first = ensure_admin_user(&store, &admin()).await.unwrap();
        assert_eq!(first, AdminBootstrap::Created);

        let user = store.find_by_username("admin").await.unwrap().unwrap();
        assert_eq!(user.role, "ADM");
        assert_eq!(user.name.as_deref(), Some("Administrador"));
        assert!(verify_password("trocar-esta-senha", &user.password_hash).unwrap());

        let mut changed = admin();
        changed.password = "outra".to_string();
        let second = ensure_admin_user(&store, &changed).await.unwrap();
        assert_eq!(second, AdminBootstrap::AlreadyExists);

        let user = store.find_by_username("admin").await.unwrap().unwrap();
        assert!(verify_password("trocar-esta-senha", &user.password_hash).unwrap());
    }
}
