//! The DAO contract
//!
//! A [`Dao`] hosts a [`PermissionManager`] whose `here` is the DAO itself.
//! Every privileged entry point checks a permission on the DAO before acting:
//!
//! | entry point | permission |
//! |---|---|
//! | `execute` | `EXECUTE_PERMISSION` |
//! | `set_metadata`, `set_dao_uri` | `SET_METADATA_PERMISSION` |
//! | `set_trusted_forwarder` | `SET_TRUSTED_FORWARDER_PERMISSION` |
//! | `set_signature_validator` | `SET_SIGNATURE_VALIDATOR_PERMISSION` |
//! | `register_standard_callback` | `REGISTER_STANDARD_CALLBACK_PERMISSION` |
//! | grant / revoke / freeze | ROOT on the target or on the DAO |

use crate::action::{Action, ActionExecutor, ExecutionOutcome};
use crate::callbacks::StandardCallbacks;
use quorum_authorization::{ConditionDirectory, PermissionCheck, PermissionManager};
use quorum_core::calldata::{self, Selector};
use quorum_core::config::DaoConfig;
use quorum_core::{
    Address, Event, EventLog, MultiTargetPermission, PermissionId, QuorumError, Result,
    SingleTargetPermission, EXECUTE_PERMISSION_ID, REGISTER_STANDARD_CALLBACK_PERMISSION_ID,
    SET_METADATA_PERMISSION_ID, SET_SIGNATURE_VALIDATOR_PERMISSION_ID,
    SET_TRUSTED_FORWARDER_PERMISSION_ID,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Initial settings of a DAO
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoSettings {
    /// Opaque metadata (usually a content URI)
    pub metadata: Vec<u8>,
    /// Public URI of the DAO
    pub dao_uri: String,
    /// Forwarder trusted for meta-transactions
    pub trusted_forwarder: Address,
}

/// A DAO hosting its own permission manager
#[derive(Debug, Clone)]
pub struct Dao {
    address: Address,
    permissions: PermissionManager,
    config: DaoConfig,
    metadata: Vec<u8>,
    dao_uri: String,
    trusted_forwarder: Address,
    signature_validator: Address,
    callbacks: StandardCallbacks,
    events: EventLog,
}

impl Dao {
    /// Initialize a DAO at `address`
    ///
    /// The DAO and `initial_owner` both receive ROOT on the DAO.
    pub fn initialize(
        address: Address,
        settings: DaoSettings,
        initial_owner: Address,
        conditions: ConditionDirectory,
        config: DaoConfig,
    ) -> Self {
        let mut permissions = PermissionManager::new(address, conditions);
        permissions.initialize(initial_owner);
        info!(dao = %address, owner = %initial_owner, "dao initialized");
        Self {
            address,
            permissions,
            config,
            metadata: settings.metadata,
            dao_uri: settings.dao_uri,
            trusted_forwarder: settings.trusted_forwarder,
            signature_validator: Address::ZERO,
            callbacks: StandardCallbacks::default(),
            events: EventLog::new(),
        }
    }

    /// Address of the DAO
    pub fn address(&self) -> Address {
        self.address
    }

    /// The DAO's permission manager
    pub fn permissions(&self) -> &PermissionManager {
        &self.permissions
    }

    /// DAO-level events (permission events live in [`Dao::permissions`])
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Current metadata
    pub fn metadata(&self) -> &[u8] {
        &self.metadata
    }

    /// Current URI
    pub fn dao_uri(&self) -> &str {
        &self.dao_uri
    }

    /// Current trusted forwarder
    pub fn trusted_forwarder(&self) -> Address {
        self.trusted_forwarder
    }

    /// Current signature validator
    pub fn signature_validator(&self) -> Address {
        self.signature_validator
    }

    /// Run `actions` through `executor`
    ///
    /// Bit `i` of `allow_failure_map` tolerates a failure of action `i`; any
    /// other failure aborts the call with [`QuorumError::ActionFailed`]. A
    /// condition on `EXECUTE_PERMISSION` sees [`execute_call_data`].
    pub fn execute(
        &mut self,
        caller: Address,
        call_id: [u8; 32],
        actions: &[Action],
        allow_failure_map: u128,
        executor: &dyn ActionExecutor,
    ) -> Result<ExecutionOutcome> {
        let data = execute_call_data(call_id, actions, allow_failure_map);
        self.auth(caller, *EXECUTE_PERMISSION_ID, &data)?;

        if actions.len() > self.config.max_actions {
            return Err(QuorumError::TooManyActions {
                count: actions.len(),
                max: self.config.max_actions,
            });
        }

        let mut outcome = ExecutionOutcome::default();
        for (index, action) in actions.iter().enumerate() {
            match executor.execute(self.address, action) {
                Ok(output) => outcome.results.push(output),
                Err(err) if allow_failure_map & failure_bit(index) != 0 => {
                    debug!(dao = %self.address, index, error = %err, "tolerated action failure");
                    outcome.failure_map |= failure_bit(index);
                    outcome.results.push(Vec::new());
                }
                Err(err) => {
                    return Err(QuorumError::ActionFailed {
                        index,
                        reason: err.to_string(),
                    })
                }
            }
        }

        info!(
            dao = %self.address,
            %caller,
            actions = actions.len(),
            failure_map = outcome.failure_map,
            "actions executed"
        );
        self.events.emit(Event::Executed {
            actor: caller,
            call_id,
            action_count: actions.len(),
            failure_map: outcome.failure_map,
        });
        Ok(outcome)
    }

    /// Replace the metadata
    pub fn set_metadata(&mut self, caller: Address, metadata: Vec<u8>) -> Result<()> {
        self.auth(caller, *SET_METADATA_PERMISSION_ID, &metadata)?;
        self.metadata = metadata.clone();
        self.events.emit(Event::MetadataSet { metadata });
        Ok(())
    }

    /// Replace the URI
    pub fn set_dao_uri(&mut self, caller: Address, dao_uri: String) -> Result<()> {
        self.auth(caller, *SET_METADATA_PERMISSION_ID, dao_uri.as_bytes())?;
        self.dao_uri = dao_uri.clone();
        self.events.emit(Event::NewUri { dao_uri });
        Ok(())
    }

    /// Replace the trusted forwarder
    pub fn set_trusted_forwarder(&mut self, caller: Address, forwarder: Address) -> Result<()> {
        let data = calldata::word_from_address(forwarder);
        self.auth(caller, *SET_TRUSTED_FORWARDER_PERMISSION_ID, &data)?;
        self.trusted_forwarder = forwarder;
        self.events.emit(Event::TrustedForwarderSet { forwarder });
        Ok(())
    }

    /// Replace the signature validator
    pub fn set_signature_validator(&mut self, caller: Address, validator: Address) -> Result<()> {
        let data = calldata::word_from_address(validator);
        self.auth(caller, *SET_SIGNATURE_VALIDATOR_PERMISSION_ID, &data)?;
        self.signature_validator = validator;
        self.events.emit(Event::SignatureValidatorSet { validator });
        Ok(())
    }

    /// Answer `callback_selector` with `magic_number` and advertise `interface_id`
    pub fn register_standard_callback(
        &mut self,
        caller: Address,
        interface_id: Selector,
        callback_selector: Selector,
        magic_number: Selector,
    ) -> Result<()> {
        self.auth(caller, *REGISTER_STANDARD_CALLBACK_PERMISSION_ID, &[])?;
        self.callbacks
            .register(interface_id, callback_selector, magic_number);
        self.events.emit(Event::StandardCallbackRegistered {
            interface_id,
            callback_selector,
            magic_number,
        });
        Ok(())
    }

    /// Magic number registered for `selector`
    pub fn handle_callback(&self, selector: Selector) -> Result<Selector> {
        self.callbacks.handle(selector)
    }

    /// Whether `interface_id` was registered through a standard callback
    pub fn supports_interface(&self, interface_id: Selector) -> bool {
        self.callbacks.supports_interface(interface_id)
    }

    /// Grant a permission through the DAO's manager
    pub fn grant(
        &mut self,
        caller: Address,
        target: Address,
        who: Address,
        permission_id: PermissionId,
    ) -> Result<()> {
        self.permissions.grant(caller, target, who, permission_id)
    }

    /// Grant a conditional permission through the DAO's manager
    pub fn grant_with_condition(
        &mut self,
        caller: Address,
        target: Address,
        who: Address,
        permission_id: PermissionId,
        condition: Address,
    ) -> Result<()> {
        self.permissions
            .grant_with_condition(caller, target, who, permission_id, condition)
    }

    /// Revoke a permission through the DAO's manager
    pub fn revoke(
        &mut self,
        caller: Address,
        target: Address,
        who: Address,
        permission_id: PermissionId,
    ) -> Result<()> {
        self.permissions.revoke(caller, target, who, permission_id)
    }

    /// Freeze a permission through the DAO's manager
    pub fn freeze(
        &mut self,
        caller: Address,
        target: Address,
        permission_id: PermissionId,
    ) -> Result<()> {
        self.permissions.freeze(caller, target, permission_id)
    }

    /// Apply a single-target batch through the DAO's manager
    pub fn apply_single_target_permissions(
        &mut self,
        caller: Address,
        target: Address,
        items: &[SingleTargetPermission],
    ) -> Result<()> {
        self.permissions
            .apply_single_target_permissions(caller, target, items)
    }

    /// Apply a multi-target batch through the DAO's manager
    pub fn apply_multi_target_permissions(
        &mut self,
        caller: Address,
        items: &[MultiTargetPermission],
    ) -> Result<()> {
        self.permissions.apply_multi_target_permissions(caller, items)
    }

    /// Whether `who` holds `permission_id` on `target`
    pub fn is_granted(
        &self,
        target: Address,
        who: Address,
        permission_id: PermissionId,
        data: &[u8],
    ) -> bool {
        self.permissions.is_granted(target, who, permission_id, data)
    }

    fn auth(&self, caller: Address, permission_id: PermissionId, data: &[u8]) -> Result<()> {
        if self
            .permissions
            .is_granted(self.address, caller, permission_id, data)
        {
            Ok(())
        } else {
            Err(QuorumError::unauthorized(
                self.address,
                self.address,
                caller,
                permission_id,
            ))
        }
    }
}

/// Selector of the call data conditions on `EXECUTE_PERMISSION` receive
pub fn execute_selector() -> Selector {
    Selector::from_signature("execute(bytes32,(address,uint256,bytes)[],uint256)")
}

/// Call data conditions on `EXECUTE_PERMISSION` receive
///
/// Argument words: `call_id`, `allow_failure_map`, the action count, then
/// the callee and value of each action in order, so action `i` sits at
/// words `3 + 2i` and `4 + 2i`.
pub fn execute_call_data(
    call_id: [u8; 32],
    actions: &[Action],
    allow_failure_map: u128,
) -> Vec<u8> {
    let mut words = Vec::with_capacity(3 + 2 * actions.len());
    words.push(call_id);
    words.push(calldata::word_from_u128(allow_failure_map));
    words.push(calldata::word_from_u128(actions.len() as u128));
    for action in actions {
        words.push(calldata::word_from_address(action.to));
        words.push(calldata::word_from_u128(action.value));
    }
    calldata::encode_call(execute_selector(), &words)
}

fn failure_bit(index: usize) -> u128 {
    u32::try_from(index)
        .ok()
        .and_then(|shift| 1u128.checked_shl(shift))
        .unwrap_or(0)
}

impl PermissionCheck for Dao {
    fn host(&self) -> Address {
        self.address
    }

    fn has_permission(
        &self,
        target: Address,
        who: Address,
        permission_id: PermissionId,
        data: &[u8],
    ) -> bool {
        self.permissions.is_granted(target, who, permission_id, data)
    }
}
