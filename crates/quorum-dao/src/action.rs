//! DAO actions and the executor that performs them
//!
//! The DAO only decides whether a batch of actions may run and which failures
//! are tolerated. Performing an action (a call, a transfer) is the job of an
//! external [`ActionExecutor`].

use quorum_core::Address;
use serde::{Deserialize, Serialize};

/// One call the DAO performs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Callee
    pub to: Address,
    /// Native value attached to the call
    pub value: u128,
    /// Encoded call data
    pub data: Vec<u8>,
}

impl Action {
    /// Build an action
    pub fn new(to: Address, value: u128, data: Vec<u8>) -> Self {
        Self { to, value, data }
    }
}

/// Performs actions on behalf of a DAO
pub trait ActionExecutor {
    /// Perform `action` as `dao`, returning the call's output
    fn execute(&self, dao: Address, action: &Action) -> anyhow::Result<Vec<u8>>;
}

/// Result of a successful execute call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Output of each action; empty for tolerated failures
    pub results: Vec<Vec<u8>>,
    /// Bit `i` is set when action `i` failed and its failure was tolerated
    pub failure_map: u128,
}

impl ExecutionOutcome {
    /// Whether action `index` failed
    pub fn failed(&self, index: usize) -> bool {
        u32::try_from(index)
            .ok()
            .and_then(|shift| 1u128.checked_shl(shift))
            .is_some_and(|bit| self.failure_map & bit != 0)
    }
}
