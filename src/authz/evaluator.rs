use std::collections::HashSet;
use std::sync::Arc;

use super::error::{AuthError, AuthzResult};
use super::permission_code::PermissionCode;
use super::store::{IdentityStore, StoreResult};
use super::whitelists;
use crate::models::user::{Role, User};

/// Policy evaluator: every authorization decision in the system goes
/// through here.
///
/// Two families of methods:
/// - advisory checks return `Ok(bool)` and never turn a missing caller into
///   an error;
/// - enforcement checks return `Err(AuthzError::Denied(_))` on denial,
///   evaluated in order: user not found -> user deleted -> insufficient
///   permissions.
///
/// A blank caller id denies without touching the store. Identity store
/// failures are returned as they are. Each permission or role question is
/// resolved with a single store call, however many candidates are checked.
#[derive(Clone)]
pub struct PolicyEvaluator {
    store: Arc<dyn IdentityStore>,
}

fn missing(caller_id: &str) -> bool {
    caller_id.trim().is_empty()
}

impl PolicyEvaluator {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    // -------------------------------------------------------------------------
    // Advisory checks
    // -------------------------------------------------------------------------

    pub async fn has_permission(&self, caller_id: &str, permission: &PermissionCode) -> StoreResult<bool> {
        if missing(caller_id) {
            return Ok(false);
        }
        let granted = self.store.effective_permission_codes(caller_id).await?;
        let allowed = granted.contains(permission);
        tracing::debug!(caller_id = %caller_id, permission = %permission, allowed, "has_permission");
        Ok(allowed)
    }

    pub async fn has_any_permission(&self, caller_id: &str, permissions: &[PermissionCode]) -> StoreResult<bool> {
        if missing(caller_id) || permissions.is_empty() {
            return Ok(false);
        }
        let granted = self.store.effective_permission_codes(caller_id).await?;
        let allowed = permissions.iter().any(|p| granted.contains(p));
        tracing::debug!(caller_id = %caller_id, requested = permissions.len(), allowed, "has_any_permission");
        Ok(allowed)
    }

    /// An empty request list is denied rather than vacuously granted.
    pub async fn has_all_permissions(&self, caller_id: &str, permissions: &[PermissionCode]) -> StoreResult<bool> {
        if missing(caller_id) || permissions.is_empty() {
            return Ok(false);
        }
        let granted = self.store.effective_permission_codes(caller_id).await?;
        let allowed = permissions.iter().all(|p| granted.contains(p));
        tracing::debug!(caller_id = %caller_id, requested = permissions.len(), allowed, "has_all_permissions");
        Ok(allowed)
    }

    pub async fn has_role(&self, caller_id: &str, role: Role) -> StoreResult<bool> {
        if missing(caller_id) {
            return Ok(false);
        }
        self.store.has_role(caller_id, role).await
    }

    pub async fn can_send_commands(&self, caller_id: &str) -> StoreResult<bool> {
        self.in_whitelist(caller_id, whitelists::SEND_COMMANDS).await
    }

    pub async fn can_manage_users(&self, caller_id: &str) -> StoreResult<bool> {
        self.in_whitelist(caller_id, whitelists::MANAGE_USERS).await
    }

    pub async fn can_access_pso(&self, caller_id: &str) -> StoreResult<bool> {
        self.in_whitelist(caller_id, whitelists::PSO_ACCESS).await
    }

    /// SuperAdmin only; Admin is not enough.
    pub async fn can_access_admin(&self, caller_id: &str) -> StoreResult<bool> {
        self.has_role(caller_id, Role::SuperAdmin).await
    }

    pub async fn is_user_active(&self, caller_id: &str) -> StoreResult<bool> {
        if missing(caller_id) {
            return Ok(false);
        }
        self.store.exists_and_active(caller_id).await
    }

    pub async fn is_admin_or_super_admin(&self, caller_id: &str) -> StoreResult<bool> {
        Ok(self
            .resolve_for_advice(caller_id)
            .await?
            .map(|user| whitelists::ADMIN_OR_SUPER_ADMIN.contains(&user.role))
            .unwrap_or(false))
    }

    pub async fn is_super_admin(&self, caller_id: &str) -> StoreResult<bool> {
        Ok(self
            .resolve_for_advice(caller_id)
            .await?
            .map(|user| user.role == Role::SuperAdmin)
            .unwrap_or(false))
    }

    async fn in_whitelist(&self, caller_id: &str, roles: &[Role]) -> StoreResult<bool> {
        if missing(caller_id) {
            return Ok(false);
        }
        let allowed = self.store.has_any_role(caller_id, roles).await?;
        tracing::debug!(caller_id = %caller_id, roles = ?roles, allowed, "role whitelist check");
        Ok(allowed)
    }

    /// Deleted users are treated like unknown ones.
    async fn resolve_for_advice(&self, caller_id: &str) -> StoreResult<Option<User>> {
        if missing(caller_id) {
            return Ok(None);
        }
        let user = self.store.find_user_by_caller_id(caller_id).await?;
        Ok(user.filter(|user| !user.is_deleted()))
    }

    // -------------------------------------------------------------------------
    // Enforcement checks
    // -------------------------------------------------------------------------

    pub async fn authorize_permission(
        &self,
        caller_id: &str,
        permission: &PermissionCode,
        operation: Option<&str>,
    ) -> AuthzResult<()> {
        self.resolve_active_user(caller_id).await?;
        let granted = self.store.effective_permission_codes(caller_id).await?;
        if granted.contains(permission) {
            return Ok(());
        }
        tracing::debug!(caller_id = %caller_id, permission = %permission, operation, "permission denied");
        Err(AuthError::insufficient_permissions(operation).into())
    }

    pub async fn authorize_any_permission(
        &self,
        caller_id: &str,
        permissions: &[PermissionCode],
        operation: Option<&str>,
    ) -> AuthzResult<()> {
        self.resolve_active_user(caller_id).await?;
        if permissions.is_empty() {
            return Err(AuthError::insufficient_permissions(operation).into());
        }
        let granted: HashSet<PermissionCode> = self.store.effective_permission_codes(caller_id).await?;
        if permissions.iter().any(|p| granted.contains(p)) {
            return Ok(());
        }
        tracing::debug!(caller_id = %caller_id, requested = permissions.len(), operation, "permission denied");
        Err(AuthError::insufficient_permissions(operation).into())
    }

    /// Building block for every role-scoped enforcement check.
    pub async fn authorize_user_with_roles(
        &self,
        caller_id: &str,
        allowed_roles: &[Role],
        operation: &str,
    ) -> AuthzResult<User> {
        let user = self.resolve_active_user(caller_id).await?;
        if allowed_roles.contains(&user.role) {
            tracing::debug!(caller_id = %caller_id, role = %user.role, operation, "role allowed");
            return Ok(user);
        }
        tracing::debug!(
            caller_id = %caller_id,
            role = %user.role,
            allowed = ?allowed_roles,
            operation,
            "role denied"
        );
        Err(AuthError::insufficient_permissions(Some(operation)).into())
    }

    pub async fn authorize_user_query(&self, caller_id: &str) -> AuthzResult<User> {
        self.authorize_user_with_roles(caller_id, whitelists::USER_QUERY, "user query")
            .await
    }

    pub async fn authorize_command_acknowledgment(&self, caller_id: &str) -> AuthzResult<User> {
        self.authorize_user_with_roles(caller_id, whitelists::COMMAND_ACKNOWLEDGMENT, "command acknowledgment")
            .await
    }

    pub async fn can_access_super_admin(&self, caller_id: &str) -> AuthzResult<User> {
        self.authorize_user_with_roles(caller_id, whitelists::SUPER_ADMIN_ONLY, "super admin access")
            .await
    }

    pub async fn can_access_contact_manager(&self, caller_id: &str) -> AuthzResult<User> {
        self.authorize_user_with_roles(caller_id, whitelists::CONTACT_MANAGER_ACCESS, "contact manager access")
            .await
    }

    pub async fn can_access_streaming_status(&self, caller_id: &str) -> AuthzResult<User> {
        self.authorize_user_with_roles(caller_id, whitelists::STREAMING_STATUS, "streaming status access")
            .await
    }

    pub async fn authorize_admin_or_super_admin(&self, caller_id: &str) -> AuthzResult<User> {
        self.authorize_user_with_roles(caller_id, whitelists::ADMIN_OR_SUPER_ADMIN, "admin access")
            .await
    }

    /// Stages 1 and 2 of every enforcement check.
    async fn resolve_active_user(&self, caller_id: &str) -> AuthzResult<User> {
        if missing(caller_id) {
            return Err(AuthError::user_not_found().into());
        }
        let user = self
            .store
            .find_user_by_caller_id(caller_id)
            .await?
            .ok_or_else(AuthError::user_not_found)?;
        if user.is_deleted() {
            tracing::warn!(caller_id = %caller_id, user_id = %user.id, "deleted user attempted an authorized operation");
            return Err(AuthError::user_deleted().into());
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::memory::InMemoryIdentityStore;
    use crate::authz::AuthErrorKind;

    fn code(s: &str) -> PermissionCode {
        PermissionCode::new(s).unwrap()
    }

    fn evaluator(store: InMemoryIdentityStore) -> (PolicyEvaluator, Arc<InMemoryIdentityStore>) {
        let store = Arc::new(store);
        (PolicyEvaluator::new(store.clone()), store)
    }

    #[tokio::test]
    async fn blank_caller_is_denied_without_store_call() {
        let (policy, store) = evaluator(InMemoryIdentityStore::new());

        assert!(!policy.has_permission("   ", &code("users:read")).await.unwrap());
        assert!(!policy.can_send_commands("").await.unwrap());
        assert!(!policy.is_super_admin("").await.unwrap());
        assert_eq!(store.calls().total(), 0);
    }

    #[tokio::test]
    async fn enforcement_with_blank_caller_reports_not_found() {
        let (policy, store) = evaluator(InMemoryIdentityStore::new());

        let err = policy.authorize_user_query("").await.unwrap_err();
        assert_eq!(err.as_denied().map(AuthError::kind), Some(AuthErrorKind::UserNotFound));
        assert_eq!(store.calls().total(), 0);
    }

    #[tokio::test]
    async fn role_check_returns_resolved_user() {
        let (policy, _) = evaluator(
            InMemoryIdentityStore::new().with_user(User::new("sv", "sv@example.com", "Sv", Role::Supervisor)),
        );

        let user = policy.authorize_user_query("sv").await.unwrap();
        assert_eq!(user.caller_id, "sv");
    }

    #[tokio::test]
    async fn empty_any_permission_list_denies_after_user_lookup_only() {
        let (policy, store) = evaluator(
            InMemoryIdentityStore::new().with_user(User::new("p", "p@example.com", "P", Role::Pso)),
        );

        let err = policy.authorize_any_permission("p", &[], Some("x")).await.unwrap_err();
        assert_eq!(err.as_denied().map(AuthError::message), Some("Insufficient permissions for x"));
        assert_eq!(store.calls().find_user, 1);
        assert_eq!(store.calls().effective_permissions, 0);
    }

    #[tokio::test]
    async fn can_access_admin_is_super_admin_only() {
        let (policy, store) = evaluator(
            InMemoryIdentityStore::new()
                .with_user(User::new("adm", "a@example.com", "A", Role::Admin))
                .with_user(User::new("root", "r@example.com", "R", Role::SuperAdmin)),
        );

        assert!(!policy.can_access_admin("adm").await.unwrap());
        assert!(policy.can_access_admin("root").await.unwrap());
        assert_eq!(store.calls().has_role, 2);
    }

    #[tokio::test]
    async fn deleted_admin_is_not_admin_for_advice() {
        let (policy, _) = evaluator(
            InMemoryIdentityStore::new().with_user(User::new("adm", "a@example.com", "A", Role::Admin).deleted()),
        );

        assert!(!policy.is_admin_or_super_admin("adm").await.unwrap());
        assert!(!policy.is_user_active("adm").await.unwrap());
    }
}
