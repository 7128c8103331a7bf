//! Execution and delegation behaviour of a DAO.

#![allow(clippy::unwrap_used, clippy::expect_used, missing_docs)]

use anyhow::bail;
use assert_matches::assert_matches;
use proptest::prelude::*;
use quorum_authorization::{
    condition_directory, Comparison, Operand, ParameterScopeCondition, PermissionCondition,
};
use quorum_core::calldata::{self, word_from_u128};
use quorum_core::config::DaoConfig;
use quorum_core::{Address, Event, QuorumError, EXECUTE_PERMISSION_ID, ROOT_PERMISSION_ID};
use quorum_dao::{execute_call_data, execute_selector, Action, ActionExecutor, Dao, DaoSettings};
use std::cell::RefCell;
use std::sync::Arc;

/// Fails every action whose first data byte is zero and records the rest.
#[derive(Default)]
struct RecordingExecutor {
    performed: RefCell<Vec<Address>>,
}

impl ActionExecutor for RecordingExecutor {
    fn execute(&self, _dao: Address, action: &Action) -> anyhow::Result<Vec<u8>> {
        if action.data.first() == Some(&0) {
            bail!("call to {} reverted", action.to);
        }
        self.performed.borrow_mut().push(action.to);
        Ok(action.data.clone())
    }
}

fn new_dao(max_actions: usize) -> (Dao, Address) {
    let owner = Address::from_label("owner");
    let dao = Dao::initialize(
        Address::from_label("dao"),
        DaoSettings {
            metadata: b"ipfs://dao".to_vec(),
            dao_uri: "https://dao.example".into(),
            trusted_forwarder: Address::ZERO,
        },
        owner,
        condition_directory(),
        DaoConfig { max_actions },
    );
    (dao, owner)
}

fn action(label: &str, ok: bool) -> Action {
    Action::new(Address::from_label(label), 0, vec![u8::from(ok)])
}

#[test]
fn execute_requires_permission() {
    let (mut dao, owner) = new_dao(16);
    let executor = RecordingExecutor::default();

    assert_matches!(
        dao.execute(owner, [1; 32], &[action("a", true)], 0, &executor),
        Err(QuorumError::Unauthorized { permission_id, .. }) if permission_id == *EXECUTE_PERMISSION_ID
    );
    assert!(executor.performed.borrow().is_empty());
}

#[test]
fn tolerated_failures_are_reported_in_the_bitmap() {
    let (mut dao, owner) = new_dao(16);
    let address = dao.address();
    dao.grant(owner, address, owner, *EXECUTE_PERMISSION_ID)
        .unwrap();
    let executor = RecordingExecutor::default();
    let actions = [action("a", true), action("b", false), action("c", true)];

    let outcome = dao
        .execute(owner, [7; 32], &actions, 0b010, &executor)
        .unwrap();

    assert_eq!(outcome.failure_map, 0b010);
    assert!(outcome.failed(1));
    assert!(!outcome.failed(0));
    assert_eq!(outcome.results.len(), 3);
    assert_eq!(executor.performed.borrow().len(), 2);
    assert_eq!(
        dao.events().last(),
        Some(&Event::Executed {
            actor: owner,
            call_id: [7; 32],
            action_count: 3,
            failure_map: 0b010,
        })
    );
}

#[test]
fn untolerated_failure_aborts() {
    let (mut dao, owner) = new_dao(16);
    let address = dao.address();
    dao.grant(owner, address, owner, *EXECUTE_PERMISSION_ID)
        .unwrap();
    let executor = RecordingExecutor::default();

    assert_matches!(
        dao.execute(owner, [0; 32], &[action("a", true), action("b", false)], 0, &executor),
        Err(QuorumError::ActionFailed { index: 1, .. })
    );
    assert!(dao.events().is_empty());
}

#[test]
fn too_many_actions() {
    let (mut dao, owner) = new_dao(2);
    let address = dao.address();
    dao.grant(owner, address, owner, *EXECUTE_PERMISSION_ID)
        .unwrap();
    let actions = vec![action("a", true); 3];

    assert_eq!(
        dao.execute(owner, [0; 32], &actions, 0, &RecordingExecutor::default()),
        Err(QuorumError::TooManyActions { count: 3, max: 2 })
    );
}

#[test]
fn handed_over_root_cannot_be_used_after_revocation() {
    let (mut dao, _owner) = new_dao(16);
    let address = dao.address();
    let factory = Address::from_label("factory");
    let plugin = Address::from_label("plugin");

    dao.grant(address, address, factory, *ROOT_PERMISSION_ID)
        .unwrap();
    dao.grant(factory, address, plugin, *EXECUTE_PERMISSION_ID)
        .unwrap();
    dao.revoke(factory, address, factory, *ROOT_PERMISSION_ID)
        .unwrap();

    assert_matches!(
        dao.grant(factory, address, factory, *EXECUTE_PERMISSION_ID),
        Err(QuorumError::Unauthorized { .. })
    );
    assert_matches!(
        dao.revoke(factory, address, plugin, *EXECUTE_PERMISSION_ID),
        Err(QuorumError::Unauthorized { .. })
    );

    let executor = RecordingExecutor::default();
    dao.execute(plugin, [2; 32], &[action("target", true)], 0, &executor)
        .unwrap();
    assert_eq!(executor.performed.borrow().len(), 1);
}

#[test]
fn execute_condition_sees_callees_and_values() {
    let conditions = condition_directory();
    let owner = Address::from_label("owner");
    let spender = Address::from_label("spender");
    let mut dao = Dao::initialize(
        Address::from_label("dao"),
        DaoSettings::default(),
        owner,
        conditions.clone(),
        DaoConfig::default(),
    );
    let address = dao.address();

    // The first action may carry at most 100.
    let cap: Arc<dyn PermissionCondition> = Arc::new(ParameterScopeCondition::new(
        execute_selector(),
        Operand::Argument(4),
        Comparison::Le,
        Operand::Constant(word_from_u128(100)),
    ));
    let cap = conditions.deploy(owner, b"spend-cap", cap);
    dao.grant_with_condition(owner, address, spender, *EXECUTE_PERMISSION_ID, cap)
        .unwrap();

    let pay = |value| vec![Action::new(Address::from_label("payee"), value, vec![1])];
    let data = execute_call_data([3; 32], &pay(40), 0);
    assert_eq!(calldata::argument(&data, 2), Some(word_from_u128(1)));
    assert_eq!(
        calldata::argument(&data, 3),
        Some(calldata::word_from_address(Address::from_label("payee")))
    );

    let executor = RecordingExecutor::default();
    dao.execute(spender, [3; 32], &pay(40), 0, &executor)
        .unwrap();
    assert_matches!(
        dao.execute(spender, [4; 32], &pay(101), 0, &executor),
        Err(QuorumError::Unauthorized { who, .. }) if who == spender
    );
    assert_matches!(
        dao.execute(spender, [5; 32], &[], 0, &executor),
        Err(QuorumError::Unauthorized { .. })
    );
    assert_eq!(executor.performed.borrow().len(), 1);
}

proptest! {
    /// Exactly the tolerated, failing actions show up in the failure map.
    #[test]
    fn failure_map_is_subset_of_allowed(
        outcomes in prop::collection::vec(any::<bool>(), 0..20),
    ) {
        let (mut dao, owner) = new_dao(32);
        let address = dao.address();
        dao.grant(owner, address, owner, *EXECUTE_PERMISSION_ID).unwrap();
        let actions: Vec<Action> = outcomes
            .iter()
            .enumerate()
            .map(|(i, ok)| action(&format!("target-{i}"), *ok))
            .collect();
        let expected = outcomes
            .iter()
            .enumerate()
            .filter(|(_, ok)| !**ok)
            .fold(0u128, |map, (i, _)| map | (1u128 << i));

        let outcome = dao
            .execute(owner, [0; 32], &actions, u128::MAX, &RecordingExecutor::default())
            .unwrap();
        prop_assert_eq!(outcome.failure_map, expected);
    }
}
