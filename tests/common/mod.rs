#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt;

use workforce_authz::app::{router, AppState};
use workforce_authz::authz::codes::USERS_READ;
use workforce_authz::authz::PermissionCode;
use workforce_authz::jwt::JwtConfig;
use workforce_authz::models::user::{Role, User};

pub struct Harness {
    _dir: TempDir,
    pub app: Router,
    pub jwt: JwtConfig,
}

pub async fn harness() -> Result<Harness> {
    let dir = tempdir().context("failed to create tempdir")?;
    let opts = SqliteConnectOptions::new()
        .filename(dir.path().join("routes.db"))
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;
    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"))
        .await?;
    migrator.run(&pool).await?;

    let jwt = JwtConfig::new("route-test-secret", 1);
    let state = AppState::new(pool, jwt.clone());

    let store = state.identities.clone();
    store.insert_user(&User::new("pso-1", "pso@example.com", "Pat", Role::Pso)).await?;
    store.insert_user(&User::new("admin-1", "admin@example.com", "Alex", Role::Admin)).await?;
    store.insert_user(&User::new("root-1", "root@example.com", "Robin", Role::SuperAdmin)).await?;
    store.insert_user(&User::new("gone-1", "gone@example.com", "Gil", Role::Admin)).await?;
    store.soft_delete_user("gone-1").await?;
    store
        .grant_role_permission(Role::Admin, &PermissionCode::new(USERS_READ)?)
        .await?;

    Ok(Harness {
        _dir: dir,
        app: router(state),
        jwt,
    })
}

pub async fn send(h: &Harness, method: &str, uri: &str, caller: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(caller) = caller {
        builder = builder.header("authorization", format!("Bearer {}", h.jwt.encode(caller)?));
    }
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))?,
        None => builder.body(Body::empty())?,
    };

    let resp: Response = h.app.clone().oneshot(req).await?;
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 1_048_576).await?;
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
    Ok((status, value))
}
