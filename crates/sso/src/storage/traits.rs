//! Storage trait definitions.

use async_trait::async_trait;

use super::{App, StorageResult, User};

/// Persistence for user records, keyed by email.
///
/// Implementations report a missing user as [`StorageError::UserNotFound`]
/// and an email conflict as [`StorageError::UserExists`].
///
/// [`StorageError::UserNotFound`]: super::StorageError::UserNotFound
/// [`StorageError::UserExists`]: super::StorageError::UserExists
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Save a new user and return the assigned id.
    async fn save_user(&self, email: &str, pass_hash: &[u8]) -> StorageResult<i64>;

    /// Fetch a user by email.
    async fn user(&self, email: &str) -> StorageResult<User>;

    /// Delete a user by email.
    async fn delete_user(&self, email: &str) -> StorageResult<()>;

    /// Replace the user's role set.
    async fn set_roles(&self, email: &str, roles: &[String]) -> StorageResult<()>;

    /// Get the user's role set.
    async fn roles(&self, email: &str) -> StorageResult<Vec<String>>;
}

/// Persistence for registered applications.
#[async_trait]
pub trait AppStore: Send + Sync {
    /// Save a new application and return the assigned id.
    async fn save_app(&self, name: &str, secret: &str) -> StorageResult<i64>;

    /// Fetch an application by id.
    async fn app(&self, app_id: i64) -> StorageResult<App>;
}
