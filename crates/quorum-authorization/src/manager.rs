//! Permission manager
//!
//! The authorization ledger embedded in every DAO and every plugin repo. It
//! gates grant, revoke and freeze behind ROOT, evaluates conditional records
//! fail-closed, and applies permission batches all-or-nothing.
//!
//! # Authorization rule
//!
//! A caller may manage permissions on `target` when it holds ROOT on `target`
//! or ROOT on the manager's host (`here`). The second clause lets the host
//! administer permissions of contracts it owns.
//!
//! # Wildcard policy
//!
//! [`ANY_ADDR`] is accepted as `who` for grant and grant-with-condition, never
//! as `target`, and never together with ROOT.

use crate::condition::{ConditionContext, ConditionDirectory};
use crate::ledger::{Checkpoint, PermissionKey, PermissionLedger, PermissionRecord};
use quorum_core::{
    Address, Event, EventLog, MultiTargetPermission, PermissionId, PermissionOperation,
    QuorumError, Result, SingleTargetPermission, ALLOW_FLAG, ANY_ADDR, ROOT_PERMISSION_ID,
    UNSET_FLAG,
};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// Read-only permission queries other contracts consult
pub trait PermissionCheck {
    /// Contract whose ledger answers the queries
    fn host(&self) -> Address;

    /// Whether `who` holds `permission_id` on `target` for a call carrying `data`
    fn has_permission(
        &self,
        target: Address,
        who: Address,
        permission_id: PermissionId,
        data: &[u8],
    ) -> bool;
}

/// Authorization ledger hosted by one contract
#[derive(Debug, Clone)]
pub struct PermissionManager {
    here: Address,
    ledger: PermissionLedger,
    conditions: ConditionDirectory,
    events: EventLog,
}

impl PermissionManager {
    /// Create an empty manager hosted at `here`
    pub fn new(here: Address, conditions: ConditionDirectory) -> Self {
        Self {
            here,
            ledger: PermissionLedger::new(),
            conditions,
            events: EventLog::new(),
        }
    }

    /// Grant ROOT on the host to the host itself and to `initial_owner`
    pub fn initialize(&mut self, initial_owner: Address) {
        let here = self.here;
        for who in [here, initial_owner] {
            let key = PermissionKey::new(here, who, *ROOT_PERMISSION_ID);
            if self.ledger.get(&key).is_none() {
                self.write_grant(here, key, PermissionRecord::Allow);
            }
        }
    }

    /// Address of the contract hosting this manager
    pub fn here(&self) -> Address {
        self.here
    }

    /// Directory conditions are resolved against
    pub fn conditions(&self) -> &ConditionDirectory {
        &self.conditions
    }

    /// Grant `permission_id` on `target` to `who` unconditionally
    pub fn grant(
        &mut self,
        caller: Address,
        target: Address,
        who: Address,
        permission_id: PermissionId,
    ) -> Result<()> {
        self.authorize(caller, target)?;
        self.grant_record(caller, target, who, permission_id, PermissionRecord::Allow)
    }

    /// Grant `permission_id` on `target` to `who` behind `condition`
    pub fn grant_with_condition(
        &mut self,
        caller: Address,
        target: Address,
        who: Address,
        permission_id: PermissionId,
        condition: Address,
    ) -> Result<()> {
        self.authorize(caller, target)?;
        self.check_condition(condition)?;
        self.grant_record(
            caller,
            target,
            who,
            permission_id,
            PermissionRecord::Condition(condition),
        )
    }

    /// Revoke `permission_id` on `target` from `who`
    pub fn revoke(
        &mut self,
        caller: Address,
        target: Address,
        who: Address,
        permission_id: PermissionId,
    ) -> Result<()> {
        self.authorize(caller, target)?;
        self.revoke_record(caller, target, who, permission_id)
    }

    /// Freeze (`target`, `permission_id`) forever
    pub fn freeze(
        &mut self,
        caller: Address,
        target: Address,
        permission_id: PermissionId,
    ) -> Result<()> {
        self.authorize(caller, target)?;
        self.freeze_record(caller, target, permission_id)
    }

    /// Whether `who` holds `permission_id` on `target` for a call carrying `data`
    ///
    /// The exact record is consulted first, then the wildcard record for
    /// (`target`, [`ANY_ADDR`]). Never mutates state.
    pub fn is_granted(
        &self,
        target: Address,
        who: Address,
        permission_id: PermissionId,
        data: &[u8],
    ) -> bool {
        self.check_key(PermissionKey::new(target, who, permission_id), who, data)
            || self.check_key(PermissionKey::new(target, ANY_ADDR, permission_id), who, data)
    }

    /// Whether (`target`, `permission_id`) is frozen
    pub fn is_frozen(&self, target: Address, permission_id: PermissionId) -> bool {
        self.ledger.is_frozen(target, permission_id)
    }

    /// Raw record stored for the exact key
    pub fn record(
        &self,
        target: Address,
        who: Address,
        permission_id: PermissionId,
    ) -> Option<PermissionRecord> {
        self.ledger.get(&PermissionKey::new(target, who, permission_id))
    }

    /// Every stored record
    pub fn records(&self) -> impl Iterator<Item = (&PermissionKey, &PermissionRecord)> {
        self.ledger.records()
    }

    /// Apply grant, revoke and freeze entries to one target, all-or-nothing
    pub fn apply_single_target_permissions(
        &mut self,
        caller: Address,
        target: Address,
        items: &[SingleTargetPermission],
    ) -> Result<()> {
        self.transact(|manager| {
            for item in items {
                match item.operation {
                    PermissionOperation::Grant => {
                        manager.grant(caller, target, item.who, item.permission_id)?;
                    }
                    PermissionOperation::Revoke => {
                        manager.revoke(caller, target, item.who, item.permission_id)?;
                    }
                    PermissionOperation::Freeze => {
                        manager.freeze(caller, target, item.permission_id)?;
                    }
                    PermissionOperation::GrantWithCondition => {
                        return Err(QuorumError::GrantWithConditionNotSupported);
                    }
                }
            }
            Ok(())
        })
    }

    /// Apply entries that each name their own target, in order, all-or-nothing
    ///
    /// Every entry is authorized against the ledger as left by the previous
    /// entries, so a batch may grant a temporary ROOT, use it and revoke it.
    pub fn apply_multi_target_permissions(
        &mut self,
        caller: Address,
        items: &[MultiTargetPermission],
    ) -> Result<()> {
        self.transact(|manager| {
            for item in items {
                manager.apply_entry(caller, item)?;
            }
            Ok(())
        })
    }

    /// Run `f` as one transaction over ledger and events
    ///
    /// On error every ledger write and event of `f` is rolled back.
    pub fn transact<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let checkpoint = self.begin();
        match f(self) {
            Ok(value) => {
                self.ledger.commit(checkpoint.0);
                Ok(value)
            }
            Err(err) => {
                self.abort(checkpoint);
                Err(err)
            }
        }
    }

    /// Events emitted by this manager
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    fn begin(&mut self) -> (Checkpoint, usize) {
        (self.ledger.checkpoint(), self.events.checkpoint())
    }

    fn abort(&mut self, (ledger, events): (Checkpoint, usize)) {
        self.ledger.rollback(ledger);
        self.events.rollback(events);
    }

    fn apply_entry(&mut self, caller: Address, item: &MultiTargetPermission) -> Result<()> {
        match item.operation {
            PermissionOperation::Grant => {
                self.grant(caller, item.target, item.who, item.permission_id)
            }
            PermissionOperation::GrantWithCondition => self.grant_with_condition(
                caller,
                item.target,
                item.who,
                item.permission_id,
                item.condition,
            ),
            PermissionOperation::Revoke => {
                self.revoke(caller, item.target, item.who, item.permission_id)
            }
            PermissionOperation::Freeze => self.freeze(caller, item.target, item.permission_id),
        }
    }

    fn authorize(&self, caller: Address, target: Address) -> Result<()> {
        let root = *ROOT_PERMISSION_ID;
        if self.is_granted(target, caller, root, &[])
            || self.is_granted(self.here, caller, root, &[])
        {
            return Ok(());
        }
        debug!(here = %self.here, %target, %caller, "permission management denied");
        Err(QuorumError::unauthorized(self.here, target, caller, root))
    }

    fn check_condition(&self, condition: Address) -> Result<()> {
        if condition == UNSET_FLAG || condition == ALLOW_FLAG || condition == ANY_ADDR {
            return Err(QuorumError::InvalidCondition { condition });
        }
        if !self.conditions.contains(&condition) {
            return Err(QuorumError::ConditionNotAContract { condition });
        }
        Ok(())
    }

    fn grant_record(
        &mut self,
        caller: Address,
        target: Address,
        who: Address,
        permission_id: PermissionId,
        record: PermissionRecord,
    ) -> Result<()> {
        if target == ANY_ADDR {
            return Err(QuorumError::AnyAddressTargetDisallowed);
        }
        if who == ANY_ADDR && permission_id == *ROOT_PERMISSION_ID {
            return Err(QuorumError::PermissionsForAnyAddressDisallowed);
        }
        if self.ledger.is_frozen(target, permission_id) {
            return Err(QuorumError::PermissionFrozen {
                target,
                permission_id,
            });
        }

        let key = PermissionKey::new(target, who, permission_id);
        match self.ledger.get(&key) {
            None => {
                self.write_grant(caller, key, record);
                Ok(())
            }
            Some(current) if current == record => Ok(()),
            Some(current) => Err(QuorumError::PermissionAlreadyGrantedForDifferentCondition {
                target,
                who,
                permission_id,
                current_condition: current.as_address(),
                new_condition: record.as_address(),
            }),
        }
    }

    fn write_grant(&mut self, actor: Address, key: PermissionKey, record: PermissionRecord) {
        self.ledger.set(key, record);
        debug!(
            here = %self.here,
            target = %key.target,
            who = %key.who,
            permission = %key.permission_id,
            condition = %record.as_address(),
            "permission granted"
        );
        self.events.emit(Event::Granted {
            permission_id: key.permission_id,
            actor,
            here: self.here,
            target: key.target,
            who: key.who,
            condition: record.as_address(),
        });
    }

    fn revoke_record(
        &mut self,
        caller: Address,
        target: Address,
        who: Address,
        permission_id: PermissionId,
    ) -> Result<()> {
        if self.ledger.is_frozen(target, permission_id) {
            return Err(QuorumError::PermissionFrozen {
                target,
                permission_id,
            });
        }
        let key = PermissionKey::new(target, who, permission_id);
        if self.ledger.clear(&key).is_some() {
            debug!(
                here = %self.here,
                %target,
                %who,
                permission = %permission_id,
                "permission revoked"
            );
            self.events.emit(Event::Revoked {
                permission_id,
                actor: caller,
                here: self.here,
                target,
                who,
            });
        }
        Ok(())
    }

    fn freeze_record(
        &mut self,
        caller: Address,
        target: Address,
        permission_id: PermissionId,
    ) -> Result<()> {
        if target == ANY_ADDR {
            return Err(QuorumError::AnyAddressTargetDisallowed);
        }
        if self.ledger.freeze(target, permission_id) {
            debug!(here = %self.here, %target, permission = %permission_id, "permission frozen");
            self.events.emit(Event::Frozen {
                permission_id,
                actor: caller,
                here: self.here,
                target,
            });
        }
        Ok(())
    }

    fn check_key(&self, key: PermissionKey, caller: Address, data: &[u8]) -> bool {
        match self.ledger.get(&key) {
            None => false,
            Some(PermissionRecord::Allow) => true,
            Some(PermissionRecord::Condition(address)) => {
                self.evaluate(address, key.target, caller, key.permission_id, data)
            }
        }
    }

    fn evaluate(
        &self,
        address: Address,
        target: Address,
        who: Address,
        permission_id: PermissionId,
        data: &[u8],
    ) -> bool {
        let Some(condition) = self.conditions.get(&address) else {
            warn!(condition = %address, "condition missing, denying");
            return false;
        };
        let ctx = ConditionContext {
            target,
            who,
            permission_id,
            data,
        };
        match panic::catch_unwind(AssertUnwindSafe(|| condition.is_granted(&ctx))) {
            Ok(Ok(granted)) => {
                debug!(condition = %address, %target, %who, granted, "condition evaluated");
                granted
            }
            Ok(Err(err)) => {
                warn!(condition = %address, %target, %who, error = %err, "condition failed, denying");
                false
            }
            Err(_) => {
                warn!(condition = %address, %target, %who, "condition panicked, denying");
                false
            }
        }
    }
}

impl PermissionCheck for PermissionManager {
    fn host(&self) -> Address {
        self.here
    }

    fn has_permission(
        &self,
        target: Address,
        who: Address,
        permission_id: PermissionId,
        data: &[u8],
    ) -> bool {
        self.is_granted(target, who, permission_id, data)
    }
}
