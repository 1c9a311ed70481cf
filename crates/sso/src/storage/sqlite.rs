//! SQLite credential store.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::{App, AppStore, StorageError, StorageResult, User, UserStore};

/// `sqlx`-backed implementation of [`UserStore`] and [`AppStore`].
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new store over an already migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn user_id<'e, E>(executor: E, email: &str) -> StorageResult<i64>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(executor)
            .await?;

        row.map(|(id,)| id).ok_or(StorageError::UserNotFound)
    }

    async fn roles_for<'e, E>(executor: E, user_id: i64) -> StorageResult<Vec<String>>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT role FROM user_roles WHERE user_id = ? ORDER BY role")
                .bind(user_id)
                .fetch_all(executor)
                .await?;

        Ok(rows.into_iter().map(|(role,)| role).collect())
    }
}

/// Map a unique-constraint violation to `conflict`, anything else to a database error.
fn map_insert_error(err: sqlx::Error, conflict: StorageError) -> StorageError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => conflict,
        _ => StorageError::Database(err),
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    #[instrument(skip(self, pass_hash))]
    async fn save_user(&self, email: &str, pass_hash: &[u8]) -> StorageResult<i64> {
        let result = sqlx::query("INSERT INTO users (email, pass_hash) VALUES (?, ?)")
            .bind(email)
            .bind(pass_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| map_insert_error(e, StorageError::UserExists))?;

        let id = result.last_insert_rowid();
        debug!(user_id = id, "inserted user");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn user(&self, email: &str) -> StorageResult<User> {
        let row: Option<(i64, String, Vec<u8>)> =
            sqlx::query_as("SELECT id, email, pass_hash FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        let (id, email, pass_hash) = row.ok_or(StorageError::UserNotFound)?;
        let roles = Self::roles_for(&self.pool, id).await?;

        Ok(User {
            id,
            email,
            pass_hash,
            roles,
        })
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, email: &str) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE email = ?")
            .bind(email)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::UserNotFound);
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_roles(&self, email: &str, roles: &[String]) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        let user_id = Self::user_id(&mut *tx, email).await?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for role in roles {
            sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role) VALUES (?, ?)")
                .bind(user_id)
                .bind(role)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!(user_id, count = roles.len(), "replaced roles");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn roles(&self, email: &str) -> StorageResult<Vec<String>> {
        let user_id = Self::user_id(&self.pool, email).await?;
        Self::roles_for(&self.pool, user_id).await
    }
}

#[async_trait]
impl AppStore for SqliteStore {
    #[instrument(skip(self, secret))]
    async fn save_app(&self, name: &str, secret: &str) -> StorageResult<i64> {
        let result = sqlx::query("INSERT INTO apps (name, secret) VALUES (?, ?)")
            .bind(name)
            .bind(secret)
            .execute(&self.pool)
            .await
            .map_err(|e| map_insert_error(e, StorageError::AppExists))?;

        let id = result.last_insert_rowid();
        debug!(app_id = id, "inserted app");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn app(&self, app_id: i64) -> StorageResult<App> {
        let row: Option<(i64, String, String)> =
            sqlx::query_as("SELECT id, name, secret FROM apps WHERE id = ?")
                .bind(app_id)
                .fetch_optional(&self.pool)
                .await?;

        let (id, name, secret) = row.ok_or(StorageError::AppNotFound)?;
        Ok(App { id, name, secret })
    }
}
