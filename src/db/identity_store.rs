use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::row_parsers::{permission_code_from_row, user_from_row};
use crate::authz::{IdentityStore, PermissionCode, StoreError, StoreResult};
use crate::models::user::{Role, User};

const USER_COLUMNS: &str =
    "id, caller_id, email, name, role, supervisor_id, created_at, updated_at, deleted_at";

/// Identity store backed by the `users`, `role_permissions` and
/// `user_permissions` tables.
///
/// Effective permissions are the union of the codes granted to the user's
/// role and the codes granted to the user directly. Soft-deleted users match
/// no role and hold no permissions, but are still returned by
/// [`IdentityStore::find_user_by_caller_id`].
#[derive(Debug, Clone)]
pub struct SqliteIdentityStore {
    pool: SqlitePool,
}

impl SqliteIdentityStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_active_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(user_from_row).collect()
    }

    pub async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, caller_id, email, name, role, supervisor_id, created_at, updated_at, deleted_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.caller_id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(user.supervisor_id.map(|id| id.to_string()))
        .bind(user.created_at.to_rfc3339())
        .bind(user.updated_at.to_rfc3339())
        .bind(user.deleted_at.map(|at| at.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn soft_delete_user(&self, caller_id: &str) -> StoreResult<bool> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE users SET deleted_at = ?, updated_at = ? WHERE caller_id = ? AND deleted_at IS NULL",
        )
        .bind(&now)
        .bind(&now)
        .bind(caller_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn grant_role_permission(&self, role: Role, code: &PermissionCode) -> StoreResult<()> {
        self.ensure_permission(code).await?;
        sqlx::query("INSERT OR IGNORE INTO role_permissions (role, permission_code) VALUES (?, ?)")
            .bind(role.as_str())
            .bind(code.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn grant_user_permission(&self, caller_id: &str, code: &PermissionCode) -> StoreResult<()> {
        self.ensure_permission(code).await?;
        let result = sqlx::query(
            "INSERT OR IGNORE INTO user_permissions (user_id, permission_code) \
             SELECT id, ? FROM users WHERE caller_id = ?",
        )
        .bind(code.as_str())
        .bind(caller_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 && self.find_user_by_caller_id(caller_id).await?.is_none() {
            return Err(StoreError::InvalidRecord(format!("no user for caller id {caller_id}")));
        }
        Ok(())
    }

    async fn ensure_permission(&self, code: &PermissionCode) -> StoreResult<()> {
        sqlx::query("INSERT OR IGNORE INTO permissions (code) VALUES (?)")
            .bind(code.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for SqliteIdentityStore {
    async fn find_user_by_caller_id(&self, caller_id: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE caller_id = ?"))
            .bind(caller_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn effective_permission_codes(&self, caller_id: &str) -> StoreResult<HashSet<PermissionCode>> {
        let rows = sqlx::query(
            r#"
            SELECT rp.permission_code AS code
            FROM users u
            INNER JOIN role_permissions rp ON rp.role = u.role
            WHERE u.caller_id = ? AND u.deleted_at IS NULL
            UNION
            SELECT up.permission_code AS code
            FROM users u
            INNER JOIN user_permissions up ON up.user_id = u.id
            WHERE u.caller_id = ? AND u.deleted_at IS NULL
            "#,
        )
        .bind(caller_id)
        .bind(caller_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(permission_code_from_row).collect()
    }

    async fn has_role(&self, caller_id: &str, role: Role) -> StoreResult<bool> {
        self.has_any_role(caller_id, &[role]).await
    }

    async fn has_any_role(&self, caller_id: &str, roles: &[Role]) -> StoreResult<bool> {
        if roles.is_empty() {
            return Ok(false);
        }

        let placeholders = vec!["?"; roles.len()].join(", ");
        let sql = format!(
            "SELECT 1 FROM users WHERE caller_id = ? AND deleted_at IS NULL AND role IN ({placeholders}) LIMIT 1"
        );
        let mut query = sqlx::query(&sql).bind(caller_id);
        for role in roles {
            query = query.bind(role.as_str());
        }

        Ok(query.fetch_optional(&self.pool).await?.is_some())
    }

    async fn exists_and_active(&self, caller_id: &str) -> StoreResult<bool> {
        let row = sqlx::query("SELECT 1 FROM users WHERE caller_id = ? AND deleted_at IS NULL LIMIT 1")
            .bind(caller_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }
}
