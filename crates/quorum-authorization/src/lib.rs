//! Quorum Authorization - permission ledger and permission manager
//!
//! Every privileged operation in a DAO, a plugin repo or a plugin is gated by
//! a [`PermissionManager`]: an owned ledger of (target, who, permission id)
//! records that may be unconditional or point at a [`PermissionCondition`].
//!
//! The crate is organized as:
//!
//! - [`ledger`]: record and freeze storage with checkpoint and rollback
//! - [`manager`]: ROOT-gated grant, revoke and freeze, fail-closed queries and
//!   atomic permission batches
//! - [`condition`]: the condition capability and two reference conditions

#![forbid(unsafe_code)]

pub mod condition;
pub mod ledger;
pub mod manager;

pub use condition::{
    condition_directory, Comparison, ConditionContext, ConditionDirectory, ConditionError,
    IdentityCondition, InMemoryObjectRegistry, ObjectRegistry, Operand, ParameterScopeCondition,
    PermissionCondition,
};
pub use ledger::{Checkpoint, PermissionKey, PermissionLedger, PermissionRecord};
pub use manager::{PermissionCheck, PermissionManager};
