//! Credential store abstraction.
//!
//! Users and applications are persisted behind the [`UserStore`] and
//! [`AppStore`] traits so the identity service never depends on a concrete
//! database. Two adapters ship with the crate:
//! - [`MemoryStore`] for tests and throwaway local runs
//! - [`SqliteStore`] backed by `sqlx`

mod error;
mod memory;
mod models;
mod sqlite;
mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use models::{App, User};
pub use sqlite::SqliteStore;
pub use traits::{AppStore, UserStore};
