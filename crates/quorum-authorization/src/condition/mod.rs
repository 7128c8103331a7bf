//! Condition contracts
//!
//! A condition is an immutable predicate consulted by the permission manager
//! when a record points at it. It sees only the call tuple (target, who,
//! permission id, call data) and never a handle to the ledger, so a condition
//! cannot mutate state or re-enter the manager that is evaluating it.
//!
//! Conditions report problems through [`ConditionError`]. The manager treats
//! any error (and any panic) as "not granted".

pub mod identity;
pub mod parameter_scope;

pub use identity::{IdentityCondition, InMemoryObjectRegistry, ObjectRegistry};
pub use parameter_scope::{Comparison, Operand, ParameterScopeCondition};

use quorum_core::calldata::Word;
use quorum_core::{Address, Directory, PermissionId};

/// Call tuple handed to a condition
#[derive(Debug, Clone, Copy)]
pub struct ConditionContext<'a> {
    /// Contract the permission applies to
    pub target: Address,
    /// Caller being checked
    pub who: Address,
    /// Permission being checked
    pub permission_id: PermissionId,
    /// Encoded call data of the guarded call
    pub data: &'a [u8],
}

/// Diagnostics a condition may raise; every one of them means "denied"
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConditionError {
    /// The looked-up object does not exist
    #[error("object {object} not found")]
    ObjectNotFound {
        /// Object that was looked up
        object: Address,
    },
    /// The object exists but carries another identifier
    #[error("object {object} has id 0x{}, expected 0x{}", hex::encode(actual), hex::encode(expected))]
    IdMismatch {
        /// Object that was looked up
        object: Address,
        /// Identifier fixed at construction
        expected: Word,
        /// Identifier found
        actual: Word,
    },
    /// The call data could not be decoded
    #[error("malformed call data: {reason}")]
    MalformedData {
        /// What was missing or wrong
        reason: String,
    },
}

/// Predicate deciding whether a conditional permission applies to a call
pub trait PermissionCondition: Send + Sync {
    /// Evaluate the condition for one call
    fn is_granted(&self, ctx: &ConditionContext<'_>) -> Result<bool, ConditionError>;
}

impl<F> PermissionCondition for F
where
    F: Fn(&ConditionContext<'_>) -> Result<bool, ConditionError> + Send + Sync,
{
    fn is_granted(&self, ctx: &ConditionContext<'_>) -> Result<bool, ConditionError> {
        self(ctx)
    }
}

/// Shared directory of deployed conditions
pub type ConditionDirectory = Directory<dyn PermissionCondition>;

/// Create an empty condition directory
pub fn condition_directory() -> ConditionDirectory {
    Directory::new("condition")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_closures_are_conditions() {
        let directory = condition_directory();
        let always: Arc<dyn PermissionCondition> =
            Arc::new(|_: &ConditionContext<'_>| -> Result<bool, ConditionError> { Ok(true) });
        let address = directory.deploy(Address::from_label("deployer"), b"always", always);

        let condition = directory.get(&address).unwrap();
        let ctx = ConditionContext {
            target: Address::from_label("dao"),
            who: Address::from_label("alice"),
            permission_id: PermissionId::from_name("ANY"),
            data: &[],
        };
        assert_eq!(condition.is_granted(&ctx), Ok(true));
    }
}
