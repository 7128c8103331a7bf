//! DAO factory
//!
//! Creates a DAO with at least one plugin installed. While the call runs the
//! factory owns the new DAO and the setup processor holds ROOT on it; both
//! grants are revoked before the DAO is returned. A failed creation leaves
//! the processor's bookkeeping untouched.

use crate::processor::{ApplyInstallation, PluginSetupProcessor, PrepareInstallation};
use crate::registry::PluginRepoRegistry;
use quorum_authorization::ConditionDirectory;
use quorum_core::config::DaoConfig;
use quorum_core::{
    Address, Event, EventLog, PermissionId, PermissionOperation, QuorumError, Result,
    SingleTargetPermission, APPLY_INSTALLATION_PERMISSION_ID, REGISTER_STANDARD_CALLBACK_PERMISSION_ID,
    ROOT_PERMISSION_ID, SET_METADATA_PERMISSION_ID, SET_SIGNATURE_VALIDATOR_PERMISSION_ID,
    SET_TRUSTED_FORWARDER_PERMISSION_ID, UPGRADE_DAO_PERMISSION_ID,
};
use quorum_dao::{Dao, DaoSettings};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A plugin to install at DAO creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSettings {
    /// Repo the build is published in
    pub repo: Address,
    /// Setup of the build
    pub plugin_setup: Address,
    /// Data handed to the setup
    pub data: Vec<u8>,
}

/// Factory of DAOs
#[derive(Debug, Clone)]
pub struct DaoFactory {
    address: Address,
    conditions: ConditionDirectory,
    dao_config: DaoConfig,
    nonce: u64,
    events: EventLog,
}

impl DaoFactory {
    /// Create a factory at `address`
    pub fn new(address: Address, conditions: ConditionDirectory, dao_config: DaoConfig) -> Self {
        Self {
            address,
            conditions,
            dao_config,
            nonce: 0,
            events: EventLog::new(),
        }
    }

    /// Address of the factory
    pub fn address(&self) -> Address {
        self.address
    }

    /// Factory events
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Address the next DAO will be created at
    pub fn next_dao_address(&self) -> Address {
        Address::derive(self.address, &self.nonce.to_be_bytes())
    }

    /// Create a DAO and install `plugins` into it
    pub fn create_dao(
        &mut self,
        caller: Address,
        processor: &mut PluginSetupProcessor,
        registry: &PluginRepoRegistry,
        settings: DaoSettings,
        plugins: &[PluginSettings],
    ) -> Result<Dao> {
        if plugins.is_empty() {
            return Err(QuorumError::NoPluginProvided);
        }

        let snapshot = processor.snapshot();
        match self.build(processor, registry, settings, plugins) {
            Ok((dao, installed)) => {
                self.nonce += 1;
                info!(dao = %dao.address(), creator = %caller, plugins = installed.len(), "dao created");
                self.events.emit(Event::DaoCreated {
                    dao: dao.address(),
                    creator: caller,
                    plugins: installed,
                });
                Ok(dao)
            }
            Err(err) => {
                warn!(creator = %caller, error = %err, "dao creation failed");
                processor.restore(snapshot);
                Err(err)
            }
        }
    }

    fn build(
        &self,
        processor: &mut PluginSetupProcessor,
        registry: &PluginRepoRegistry,
        settings: DaoSettings,
        plugins: &[PluginSettings],
    ) -> Result<(Dao, Vec<Address>)> {
        let address = self.next_dao_address();
        let mut dao = Dao::initialize(
            address,
            settings,
            self.address,
            self.conditions.clone(),
            self.dao_config.clone(),
        );
        let root = *ROOT_PERMISSION_ID;
        let apply = *APPLY_INSTALLATION_PERMISSION_ID;

        dao.grant(self.address, address, processor.address(), root)?;
        dao.grant(self.address, address, self.address, apply)?;

        let mut installed = Vec::with_capacity(plugins.len());
        for plugin in plugins {
            let prepared = processor.prepare_installation(
                self.address,
                registry,
                address,
                PrepareInstallation {
                    repo: plugin.repo,
                    plugin_setup: plugin.plugin_setup,
                    data: plugin.data.clone(),
                },
            )?;
            processor.process_installation(
                self.address,
                registry,
                &mut dao,
                ApplyInstallation {
                    repo: plugin.repo,
                    plugin_setup: plugin.plugin_setup,
                    plugin: prepared.plugin,
                    helpers: prepared.helpers,
                    permissions: prepared.permissions,
                },
            )?;
            installed.push(prepared.plugin);
        }

        let grant = |id: PermissionId| SingleTargetPermission {
            operation: PermissionOperation::Grant,
            who: address,
            permission_id: id,
        };
        let revoke = |who: Address, id: PermissionId| SingleTargetPermission {
            operation: PermissionOperation::Revoke,
            who,
            permission_id: id,
        };
        let items = [
            grant(root),
            grant(*UPGRADE_DAO_PERMISSION_ID),
            grant(*SET_METADATA_PERMISSION_ID),
            grant(*SET_TRUSTED_FORWARDER_PERMISSION_ID),
            grant(*SET_SIGNATURE_VALIDATOR_PERMISSION_ID),
            grant(*REGISTER_STANDARD_CALLBACK_PERMISSION_ID),
            revoke(processor.address(), root),
            revoke(self.address, apply),
            revoke(self.address, root),
        ];
        dao.apply_single_target_permissions(self.address, address, &items)?;
        Ok((dao, installed))
    }
}
