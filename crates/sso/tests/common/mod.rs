//! Test utilities and common setup.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sso::api::{self, AppState};
use sso::auth::{BcryptHasher, IdentityService, RequestContext};
use sso::db::Database;
use sso::storage::{MemoryStore, SqliteStore};

/// Lowest bcrypt cost; keeps hashing fast in tests.
pub const TEST_COST: u32 = 4;

pub const APP_NAME: &str = "test-app";
pub const APP_SECRET: &str = "test-secret-for-integration-tests";
pub const OTHER_APP_SECRET: &str = "another-secret-for-a-second-app";
pub const ADMIN_TOKEN: &str = "admin-token-for-integration-tests-0123456789";

pub fn test_ttl() -> Duration {
    Duration::from_secs(60 * 60)
}

/// Identity service over a fresh in-memory store.
pub fn memory_service() -> IdentityService {
    let store = Arc::new(MemoryStore::new());
    IdentityService::new(store.clone(), store, test_ttl())
        .with_hasher(Arc::new(BcryptHasher::new(TEST_COST)))
}

/// Identity service over a SQLite database.
pub fn sqlite_service(db: &Database) -> IdentityService {
    let store = Arc::new(SqliteStore::new(db.pool().clone()));
    IdentityService::new(store.clone(), store, test_ttl())
        .with_hasher(Arc::new(BcryptHasher::new(TEST_COST)))
}

/// Register the default test app and return its id.
pub async fn seed_app(service: &IdentityService) -> i64 {
    service
        .create_app(&RequestContext::default(), APP_NAME, APP_SECRET)
        .await
        .unwrap()
}

/// Create a test application over an in-memory database with one app seeded.
///
/// Administrative routes are open.
pub async fn test_app() -> (Router, i64) {
    let db = Database::in_memory().await.unwrap();
    let service = sqlite_service(&db);
    let app_id = seed_app(&service).await;

    (api::create_router(AppState::new(service)), app_id)
}

/// Like [`test_app`], with administrative routes guarded by [`ADMIN_TOKEN`].
pub async fn test_app_with_admin() -> (Router, i64) {
    let db = Database::in_memory().await.unwrap();
    let service = sqlite_service(&db);
    let app_id = seed_app(&service).await;

    let state = AppState::new(service).with_admin_token(Some(ADMIN_TOKEN));
    (api::create_router(state), app_id)
}
