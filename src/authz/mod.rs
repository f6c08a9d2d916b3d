//! Authorization module - policy evaluator and its identity contract
//!
//! This module implements:
//! - `resource:action` permission codes, validated at construction
//! - the `AuthError` taxonomy (not found / deleted / insufficient)
//! - fixed role whitelists per category of operation
//! - advisory (boolean) and enforcement (erroring) policy checks

mod error;
mod evaluator;
pub mod memory;
mod permission_code;
mod store;
pub mod whitelists;

pub use error::{AuthError, AuthErrorKind, AuthzError, AuthzResult};
pub use evaluator::PolicyEvaluator;
pub use memory::{InMemoryIdentityStore, StoreCalls};
pub use permission_code::{codes, PermissionCode};
pub use store::{IdentityStore, StoreError, StoreResult};
