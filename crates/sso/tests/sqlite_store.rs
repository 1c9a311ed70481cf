//! Identity service over the SQLite store.

use sso::auth::{ErrorKind, RequestContext};
use sso::db::Database;

mod common;
use common::{APP_NAME, APP_SECRET, seed_app, sqlite_service};

#[tokio::test]
async fn test_flow_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sso.db");
    let db = Database::open(&path).await.unwrap();
    let service = sqlite_service(&db);
    let ctx = RequestContext::new("req-disk");

    let app_id = seed_app(&service).await;
    let user_id = service
        .register_new_user(&ctx, "a@x.com", "pw123")
        .await
        .unwrap();
    assert_eq!(user_id, 1);

    let token = service.login(&ctx, "a@x.com", "pw123", app_id).await.unwrap();
    assert!(!token.is_empty());

    let err = service
        .login(&ctx, "a@x.com", "wrong", app_id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCredentials);

    service.set_roles(&ctx, "a@x.com", &["admin"]).await.unwrap();
    assert_eq!(
        service.get_roles(&ctx, "a@x.com").await.unwrap(),
        vec!["admin".to_string()]
    );
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sso.db");
    let ctx = RequestContext::default();

    {
        let db = Database::open(&path).await.unwrap();
        let service = sqlite_service(&db);
        seed_app(&service).await;
        service
            .register_new_user(&ctx, "persist@x.com", "pw")
            .await
            .unwrap();
        service
            .set_roles(&ctx, "persist@x.com", &["manager"])
            .await
            .unwrap();
        db.pool().close().await;
    }

    let db = Database::open(&path).await.unwrap();
    let service = sqlite_service(&db);

    let token = service.login(&ctx, "persist@x.com", "pw", 1).await.unwrap();
    let claims = service.validate_token(&ctx, &token, 1).await.unwrap();
    assert_eq!(claims.roles, vec!["manager".to_string()]);

    let err = service
        .create_app(&ctx, APP_NAME, APP_SECRET)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AppExists);
}

#[tokio::test]
async fn test_duplicate_registration() {
    let db = Database::in_memory().await.unwrap();
    let service = sqlite_service(&db);
    let ctx = RequestContext::default();

    service
        .register_new_user(&ctx, "dup@x.com", "pw")
        .await
        .unwrap();
    let err = service
        .register_new_user(&ctx, "dup@x.com", "pw")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UserExists);
}

#[tokio::test]
async fn test_invalid_roles_no_partial_write() {
    let db = Database::in_memory().await.unwrap();
    let service = sqlite_service(&db);
    let ctx = RequestContext::default();

    service
        .register_new_user(&ctx, "roles@x.com", "pw")
        .await
        .unwrap();
    service
        .set_roles(&ctx, "roles@x.com", &["admin", "user"])
        .await
        .unwrap();

    let err = service
        .set_roles(&ctx, "roles@x.com", &["manager", "owner"])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRoles);
    assert_eq!(
        service.get_roles(&ctx, "roles@x.com").await.unwrap(),
        vec!["admin".to_string(), "user".to_string()]
    );

    let none: [&str; 0] = [];
    service.set_roles(&ctx, "roles@x.com", &none).await.unwrap();
    assert!(service.get_roles(&ctx, "roles@x.com").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_then_reregister_starts_clean() {
    let db = Database::in_memory().await.unwrap();
    let service = sqlite_service(&db);
    let ctx = RequestContext::default();

    service
        .register_new_user(&ctx, "again@x.com", "pw")
        .await
        .unwrap();
    service
        .set_roles(&ctx, "again@x.com", &["admin"])
        .await
        .unwrap();

    service.delete_user(&ctx, "again@x.com").await.unwrap();
    let err = service.delete_user(&ctx, "again@x.com").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCredentials);

    service
        .register_new_user(&ctx, "again@x.com", "new-pw")
        .await
        .unwrap();
    assert!(service.get_roles(&ctx, "again@x.com").await.unwrap().is_empty());
}
