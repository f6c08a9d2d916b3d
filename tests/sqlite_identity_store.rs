use std::sync::Arc;

use anyhow::Result;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};

use workforce_authz::authz::codes::{COMMANDS_SEND, RECORDINGS_READ, STREAMING_READ, USERS_READ};
use workforce_authz::authz::{AuthErrorKind, IdentityStore, PermissionCode, PolicyEvaluator};
use workforce_authz::db::SqliteIdentityStore;
use workforce_authz::models::user::{Role, User};

async fn migrated_pool(dir: &TempDir) -> Result<SqlitePool> {
    let opts = SqliteConnectOptions::new()
        .filename(dir.path().join("identity.db"))
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"))
        .await?;
    migrator.run(&pool).await?;
    Ok(pool)
}

fn code(s: &str) -> PermissionCode {
    PermissionCode::new(s).expect("valid permission code")
}

#[tokio::test]
async fn store_contract_against_sqlite() -> Result<()> {
    let dir = tempdir()?;
    let store = SqliteIdentityStore::new(migrated_pool(&dir).await?);

    let supervisor = User::new("auth0|sv", "sv@example.com", "Sam Supervisor", Role::Supervisor);
    let pso = User::new("auth0|pso", "pso@example.com", "Pat PSO", Role::Pso).with_supervisor(supervisor.id);
    let gone = User::new("auth0|gone", "gone@example.com", "Gil Gone", Role::Admin);
    store.insert_user(&supervisor).await?;
    store.insert_user(&pso).await?;
    store.insert_user(&gone).await?;

    store.grant_role_permission(Role::Supervisor, &code(COMMANDS_SEND)).await?;
    store.grant_role_permission(Role::Admin, &code(USERS_READ)).await?;
    store.grant_user_permission("auth0|sv", &code(STREAMING_READ)).await?;
    store.grant_user_permission("auth0|gone", &code(RECORDINGS_READ)).await?;
    assert!(store.soft_delete_user("auth0|gone").await?);
    assert!(!store.soft_delete_user("auth0|gone").await?);

    let found = store.find_user_by_caller_id("auth0|pso").await?.expect("pso exists");
    assert_eq!(found.id, pso.id);
    assert_eq!(found.role, Role::Pso);
    assert_eq!(found.supervisor_id, Some(supervisor.id));
    assert!(found.deleted_at.is_none());

    // deleted users are still resolvable
    let deleted = store.find_user_by_caller_id("auth0|gone").await?.expect("row kept");
    assert!(deleted.is_deleted());
    assert!(store.find_user_by_caller_id("nobody").await?.is_none());

    let effective = store.effective_permission_codes("auth0|sv").await?;
    assert_eq!(effective.len(), 2);
    assert!(effective.contains(&code(COMMANDS_SEND)));
    assert!(effective.contains(&code(STREAMING_READ)));
    assert!(store.effective_permission_codes("auth0|gone").await?.is_empty());
    assert!(store.effective_permission_codes("nobody").await?.is_empty());

    assert!(store.has_role("auth0|pso", Role::Pso).await?);
    assert!(!store.has_role("auth0|gone", Role::Admin).await?);
    assert!(store.has_any_role("auth0|sv", &[Role::Admin, Role::Supervisor]).await?);
    assert!(!store.has_any_role("auth0|sv", &[]).await?);

    assert!(store.exists_and_active("auth0|pso").await?);
    assert!(!store.exists_and_active("auth0|gone").await?);

    let active: Vec<String> = store.list_active_users().await?.into_iter().map(|u| u.caller_id).collect();
    assert_eq!(active, vec!["auth0|pso".to_string(), "auth0|sv".to_string()]);

    Ok(())
}

#[tokio::test]
async fn granting_to_unknown_caller_fails() -> Result<()> {
    let dir = tempdir()?;
    let store = SqliteIdentityStore::new(migrated_pool(&dir).await?);

    assert!(store.grant_user_permission("nobody", &code(USERS_READ)).await.is_err());
    Ok(())
}

#[tokio::test]
async fn evaluator_over_sqlite() -> Result<()> {
    let dir = tempdir()?;
    let store = Arc::new(SqliteIdentityStore::new(migrated_pool(&dir).await?));
    store
        .insert_user(&User::new("cm", "cm@example.com", "Casey", Role::ContactManager))
        .await?;
    store
        .insert_user(&User::new("old", "old@example.com", "Olly", Role::SuperAdmin))
        .await?;
    store.soft_delete_user("old").await?;
    store.grant_role_permission(Role::ContactManager, &code(STREAMING_READ)).await?;

    let policy = PolicyEvaluator::new(store.clone());

    assert!(policy.can_access_streaming_status("cm").await.is_ok());
    assert!(policy.has_permission("cm", &code(STREAMING_READ)).await?);
    assert!(!policy.can_send_commands("cm").await?);

    let err = policy.can_access_super_admin("old").await.unwrap_err();
    assert_eq!(err.as_denied().map(|e| e.kind()), Some(AuthErrorKind::UserDeleted));
    assert!(!policy.is_super_admin("old").await?);
    assert!(!policy.can_access_admin("old").await?);

    let err = policy.authorize_user_query("missing").await.unwrap_err();
    assert_eq!(err.as_denied().map(|e| e.kind()), Some(AuthErrorKind::UserNotFound));

    Ok(())
}
