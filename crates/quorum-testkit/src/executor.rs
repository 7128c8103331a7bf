//! Action executor double

use anyhow::bail;
use quorum_core::Address;
use quorum_dao::{Action, ActionExecutor};
use std::cell::RefCell;
use std::collections::BTreeSet;

/// Records performed actions and fails calls to configured callees
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    failing: BTreeSet<Address>,
    performed: RefCell<Vec<(Address, Action)>>,
}

impl RecordingExecutor {
    /// Executor that performs every action
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `callee` fail
    pub fn failing_on(mut self, callee: Address) -> Self {
        self.failing.insert(callee);
        self
    }

    /// `(dao, action)` pairs performed so far
    pub fn performed(&self) -> Vec<(Address, Action)> {
        self.performed.borrow().clone()
    }
}

impl ActionExecutor for RecordingExecutor {
    fn execute(&self, dao: Address, action: &Action) -> anyhow::Result<Vec<u8>> {
        if self.failing.contains(&action.to) {
            bail!("call to {} reverted", action.to);
        }
        self.performed.borrow_mut().push((dao, action.clone()));
        Ok(action.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_failing_callee_is_not_recorded() {
        let dao = Address::from_label("dao");
        let broken = Address::from_label("broken");
        let executor = RecordingExecutor::new().failing_on(broken);
        let ok = Action::new(Address::from_label("payee"), 1, vec![9]);

        assert_matches!(executor.execute(dao, &ok), Ok(output) if output == vec![9]);
        assert_matches!(
            executor.execute(dao, &Action::new(broken, 0, Vec::new())),
            Err(err) if err.to_string().contains("reverted")
        );
        assert_eq!(executor.performed(), vec![(dao, ok)]);
    }
}
