use std::collections::HashSet;

use async_trait::async_trait;

use super::permission_code::PermissionCode;
use crate::models::user::{Role, User};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error("invalid identity record: {0}")]
    InvalidRecord(String),
    #[error("identity store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read-only identity contract consumed by the policy evaluator.
///
/// How the effective permission set is aggregated is up to the
/// implementation; the evaluator only sees the resulting set.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Resolve a user by external caller id, deleted or not.
    async fn find_user_by_caller_id(&self, caller_id: &str) -> StoreResult<Option<User>>;

    /// Permission codes currently granted to the caller.
    async fn effective_permission_codes(&self, caller_id: &str) -> StoreResult<HashSet<PermissionCode>>;

    async fn has_role(&self, caller_id: &str, role: Role) -> StoreResult<bool>;

    async fn has_any_role(&self, caller_id: &str, roles: &[Role]) -> StoreResult<bool>;

    /// True when the caller exists and is not soft-deleted.
    async fn exists_and_active(&self, caller_id: &str) -> StoreResult<bool>;
}
