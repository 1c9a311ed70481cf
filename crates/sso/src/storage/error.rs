//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors reported by credential store adapters.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No user with the given email.
    #[error("user not found")]
    UserNotFound,

    /// A user with the given email already exists.
    #[error("user already exists")]
    UserExists,

    /// No application with the given id.
    #[error("app not found")]
    AppNotFound,

    /// An application with the given name already exists.
    #[error("app already exists")]
    AppExists,

    /// Database driver error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}
