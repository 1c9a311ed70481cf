//! In-process credential store.
//!
//! Backed by [`DashMap`] so concurrent callers never block each other on
//! unrelated keys. Uniqueness of user emails and app names is enforced through
//! the map entry API, which makes check-and-insert a single atomic step.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, instrument};

use super::{App, AppStore, StorageError, StorageResult, User, UserStore};

/// In-memory implementation of [`UserStore`] and [`AppStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    apps: DashMap<i64, App>,
    app_names: DashMap<String, i64>,
    next_user_id: AtomicI64,
    next_app_id: AtomicI64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    #[instrument(skip(self, pass_hash))]
    async fn save_user(&self, email: &str, pass_hash: &[u8]) -> StorageResult<i64> {
        match self.users.entry(email.to_string()) {
            Entry::Occupied(_) => Err(StorageError::UserExists),
            Entry::Vacant(slot) => {
                let id = self.next_user_id.fetch_add(1, Ordering::SeqCst) + 1;
                slot.insert(User {
                    id,
                    email: email.to_string(),
                    pass_hash: pass_hash.to_vec(),
                    roles: Vec::new(),
                });
                debug!(user_id = id, "stored user");
                Ok(id)
            }
        }
    }

    #[instrument(skip(self))]
    async fn user(&self, email: &str) -> StorageResult<User> {
        self.users
            .get(email)
            .map(|entry| entry.value().clone())
            .ok_or(StorageError::UserNotFound)
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, email: &str) -> StorageResult<()> {
        self.users
            .remove(email)
            .map(|_| ())
            .ok_or(StorageError::UserNotFound)
    }

    #[instrument(skip(self))]
    async fn set_roles(&self, email: &str, roles: &[String]) -> StorageResult<()> {
        let mut user = self
            .users
            .get_mut(email)
            .ok_or(StorageError::UserNotFound)?;
        user.roles = roles.to_vec();
        Ok(())
    }

    #[instrument(skip(self))]
    async fn roles(&self, email: &str) -> StorageResult<Vec<String>> {
        self.users
            .get(email)
            .map(|entry| entry.roles.clone())
            .ok_or(StorageError::UserNotFound)
    }
}

#[async_trait]
impl AppStore for MemoryStore {
    #[instrument(skip(self, secret))]
    async fn save_app(&self, name: &str, secret: &str) -> StorageResult<i64> {
        match self.app_names.entry(name.to_string()) {
            Entry::Occupied(_) => Err(StorageError::AppExists),
            Entry::Vacant(slot) => {
                let id = self.next_app_id.fetch_add(1, Ordering::SeqCst) + 1;
                self.apps.insert(
                    id,
                    App {
                        id,
                        name: name.to_string(),
                        secret: secret.to_string(),
                    },
                );
                slot.insert(id);
                debug!(app_id = id, "stored app");
                Ok(id)
            }
        }
    }

    #[instrument(skip(self))]
    async fn app(&self, app_id: i64) -> StorageResult<App> {
        self.apps
            .get(&app_id)
            .map(|entry| entry.value().clone())
            .ok_or(StorageError::AppNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_save_and_fetch_user() {
        let store = MemoryStore::new();

        let id = store.save_user("a@x.com", b"hash").await.unwrap();
        assert_eq!(id, 1);

        let user = store.user("a@x.com").await.unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.pass_hash, b"hash");
        assert!(user.roles.is_empty());

        let second = store.save_user("b@x.com", b"hash").await.unwrap();
        assert_eq!(second, 2);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        store.save_user("a@x.com", b"one").await.unwrap();

        let err = store.save_user("a@x.com", b"two").await.unwrap_err();
        assert!(matches!(err, StorageError::UserExists));

        // Original record untouched
        assert_eq!(store.user("a@x.com").await.unwrap().pass_hash, b"one");
    }

    #[tokio::test]
    async fn test_missing_user_operations() {
        let store = MemoryStore::new();

        assert!(matches!(
            store.user("nobody@x.com").await,
            Err(StorageError::UserNotFound)
        ));
        assert!(matches!(
            store.delete_user("nobody@x.com").await,
            Err(StorageError::UserNotFound)
        ));
        assert!(matches!(
            store.set_roles("nobody@x.com", &[]).await,
            Err(StorageError::UserNotFound)
        ));
        assert!(matches!(
            store.roles("nobody@x.com").await,
            Err(StorageError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_roles_replace() {
        let store = MemoryStore::new();
        store.save_user("a@x.com", b"hash").await.unwrap();

        store
            .set_roles("a@x.com", &["admin".to_string(), "user".to_string()])
            .await
            .unwrap();
        assert_eq!(store.roles("a@x.com").await.unwrap(), vec!["admin", "user"]);

        store.set_roles("a@x.com", &[]).await.unwrap();
        assert!(store.roles("a@x.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apps() {
        let store = MemoryStore::new();

        let id = store.save_app("web", "secret").await.unwrap();
        let app = store.app(id).await.unwrap();
        assert_eq!(app.name, "web");
        assert_eq!(app.secret, "secret");

        assert!(matches!(
            store.save_app("web", "other").await,
            Err(StorageError::AppExists)
        ));
        assert!(matches!(store.app(99).await, Err(StorageError::AppNotFound)));
    }

    #[tokio::test]
    async fn test_concurrent_registration_single_winner() {
        let store = Arc::new(MemoryStore::new());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.save_user("race@x.com", b"hash").await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(store.user_count(), 1);
    }
}
