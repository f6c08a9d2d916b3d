use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use super::permission_code::PermissionCode;
use super::store::{IdentityStore, StoreError, StoreResult};
use crate::models::user::{Role, User};

/// Number of calls made to each identity store method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub find_user: usize,
    pub effective_permissions: usize,
    pub has_role: usize,
    pub has_any_role: usize,
    pub exists_and_active: usize,
}

impl StoreCalls {
    pub fn total(&self) -> usize {
        self.find_user + self.effective_permissions + self.has_role + self.has_any_role + self.exists_and_active
    }
}

#[derive(Debug, Default)]
struct Counters {
    find_user: AtomicUsize,
    effective_permissions: AtomicUsize,
    has_role: AtomicUsize,
    has_any_role: AtomicUsize,
    exists_and_active: AtomicUsize,
}

#[derive(Debug, Default)]
struct Directory {
    users: HashMap<String, User>,
    role_permissions: HashMap<Role, HashSet<PermissionCode>>,
    direct_permissions: HashMap<String, HashSet<PermissionCode>>,
}

/// In-process identity store.
///
/// Effective permissions are the union of the user's role grants and their
/// direct grants. Deleted users match no role and hold no permissions.
/// Every trait method bumps a counter readable through [`Self::calls`].
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    directory: RwLock<Directory>,
    counters: Counters,
    unavailable: AtomicBool,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user: User) -> Self {
        self.insert_user(user);
        self
    }

    pub fn with_role_permissions(self, role: Role, codes: impl IntoIterator<Item = PermissionCode>) -> Self {
        self.write().role_permissions.entry(role).or_default().extend(codes);
        self
    }

    pub fn with_direct_permissions(self, caller_id: &str, codes: impl IntoIterator<Item = PermissionCode>) -> Self {
        self.write()
            .direct_permissions
            .entry(caller_id.to_string())
            .or_default()
            .extend(codes);
        self
    }

    pub fn insert_user(&self, user: User) {
        self.write().users.insert(user.caller_id.clone(), user);
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn calls(&self) -> StoreCalls {
        StoreCalls {
            find_user: self.counters.find_user.load(Ordering::SeqCst),
            effective_permissions: self.counters.effective_permissions.load(Ordering::SeqCst),
            has_role: self.counters.has_role.load(Ordering::SeqCst),
            has_any_role: self.counters.has_any_role.load(Ordering::SeqCst),
            exists_and_active: self.counters.exists_and_active.load(Ordering::SeqCst),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Directory> {
        self.directory.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Directory> {
        self.directory.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn enter(&self, counter: &AtomicUsize) -> StoreResult<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store switched off".to_string()));
        }
        Ok(())
    }

    fn active_role(&self, caller_id: &str) -> Option<Role> {
        self.read()
            .users
            .get(caller_id)
            .filter(|user| !user.is_deleted())
            .map(|user| user.role)
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn find_user_by_caller_id(&self, caller_id: &str) -> StoreResult<Option<User>> {
        self.enter(&self.counters.find_user)?;
        Ok(self.read().users.get(caller_id).cloned())
    }

    async fn effective_permission_codes(&self, caller_id: &str) -> StoreResult<HashSet<PermissionCode>> {
        self.enter(&self.counters.effective_permissions)?;
        let directory = self.read();
        let Some(user) = directory.users.get(caller_id).filter(|user| !user.is_deleted()) else {
            return Ok(HashSet::new());
        };

        let mut codes: HashSet<PermissionCode> = directory
            .role_permissions
            .get(&user.role)
            .cloned()
            .unwrap_or_default();
        if let Some(direct) = directory.direct_permissions.get(caller_id) {
            codes.extend(direct.iter().cloned());
        }
        Ok(codes)
    }

    async fn has_role(&self, caller_id: &str, role: Role) -> StoreResult<bool> {
        self.enter(&self.counters.has_role)?;
        Ok(self.active_role(caller_id) == Some(role))
    }

    async fn has_any_role(&self, caller_id: &str, roles: &[Role]) -> StoreResult<bool> {
        self.enter(&self.counters.has_any_role)?;
        Ok(self
            .active_role(caller_id)
            .map(|role| roles.contains(&role))
            .unwrap_or(false))
    }

    async fn exists_and_active(&self, caller_id: &str) -> StoreResult<bool> {
        self.enter(&self.counters.exists_and_active)?;
        Ok(self.active_role(caller_id).is_some())
    }
}
