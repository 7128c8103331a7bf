//! Plugin setups and their deployment context
//!
//! A plugin setup is the deployment-plus-permission recipe of one plugin
//! build. The setup processor hands it a [`SetupContext`] through which it
//! deploys the plugin and its helpers at deterministic addresses, and it
//! answers with the permission batch that wires them into the DAO. A setup
//! never touches a permission ledger itself.
//!
//! Deployment addresses are `derive(setup, salt ‖ label)` where the salt
//! hashes the DAO and the caller-supplied data, so every address is
//! computable off-line with [`predict_address`] before anything is prepared.

use crate::proxy::ProxyTable;
use quorum_authorization::{ConditionDirectory, PermissionCondition};
use quorum_core::hash::{self, DomainHasher};
use quorum_core::{Address, Directory, MultiTargetPermission, Result, Version};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared directory of deployed plugin setups
pub type SetupDirectory = Directory<dyn PluginSetup>;

/// Create an empty setup directory
pub fn setup_directory() -> SetupDirectory {
    Directory::new("plugin-setup")
}

/// Output of an installation preparation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedInstallation {
    /// Deployed plugin
    pub plugin: Address,
    /// Deployed helper contracts
    pub helpers: Vec<Address>,
    /// Batch wiring plugin and helpers into the DAO
    pub permissions: Vec<MultiTargetPermission>,
}

/// Output of an update preparation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedUpdate {
    /// Helpers after the update
    pub helpers: Vec<Address>,
    /// Migration batch
    pub permissions: Vec<MultiTargetPermission>,
}

/// What a setup knows about an installed plugin
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupPayload {
    /// Installed plugin
    pub plugin: Address,
    /// Helpers recorded at installation (or the last update)
    pub current_helpers: Vec<Address>,
    /// Grants currently held because of the plugin
    pub installed_permissions: Vec<MultiTargetPermission>,
    /// Caller-supplied data
    pub data: Vec<u8>,
}

/// Request to migrate an installed plugin to another build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    /// Version being replaced
    pub from: Version,
    /// Version being installed
    pub to: Version,
    /// Installed plugin state
    pub payload: SetupPayload,
}

/// Deployment-plus-permission recipe of a plugin build
pub trait PluginSetup: Send + Sync {
    /// Implementation contract the plugin proxy points at for `version`
    fn implementation(&self, version: &Version) -> Address;

    /// Deploy the plugin and helpers and compute the installation batch
    fn prepare_installation(
        &self,
        ctx: &SetupContext<'_>,
        data: &[u8],
    ) -> Result<PreparedInstallation>;

    /// Compute the migration from an older build of the same release
    ///
    /// Builds without migration logic keep their helpers and change nothing;
    /// the proxy is still pointed at the new version's implementation.
    fn prepare_update(
        &self,
        _ctx: &SetupContext<'_>,
        request: &UpdateRequest,
    ) -> Result<PreparedUpdate> {
        Ok(PreparedUpdate {
            helpers: request.payload.current_helpers.clone(),
            permissions: Vec::new(),
        })
    }

    /// Compute the batch that removes the plugin from the DAO
    fn prepare_uninstallation(
        &self,
        ctx: &SetupContext<'_>,
        payload: &SetupPayload,
    ) -> Result<Vec<MultiTargetPermission>>;
}

fn salt_hasher(dao: Address, data: &[u8]) -> DomainHasher {
    let mut h = hash::hasher("quorum/setup-salt");
    h.update(dao.as_bytes()).update_field(data);
    h
}

fn labelled(salt: &[u8; 32], label: &str) -> Vec<u8> {
    let mut bytes = salt.to_vec();
    bytes.extend_from_slice(label.as_bytes());
    bytes
}

/// Address the setup at `setup` deploys `label` to when installing into `dao` with `data`
pub fn predict_address(setup: Address, dao: Address, data: &[u8], label: &str) -> Address {
    let salt = salt_hasher(dao, data).finalize();
    Address::derive(setup, &labelled(&salt, label))
}

/// Deterministic deployment context handed to a setup
pub struct SetupContext<'a> {
    dao: Address,
    setup: Address,
    version: Version,
    salt: [u8; 32],
    conditions: &'a ConditionDirectory,
    proxies: &'a ProxyTable,
}

impl<'a> SetupContext<'a> {
    /// Context for installing `version` into `dao` with `data`
    pub fn for_installation(
        setup: Address,
        version: Version,
        dao: Address,
        data: &[u8],
        conditions: &'a ConditionDirectory,
        proxies: &'a ProxyTable,
    ) -> Self {
        Self {
            dao,
            setup,
            version,
            salt: salt_hasher(dao, data).finalize(),
            conditions,
            proxies,
        }
    }

    /// Context for updating or uninstalling `plugin` in `dao` with `data`
    ///
    /// `version` is the version the plugin runs after the operation.
    pub fn for_plugin(
        setup: Address,
        version: Version,
        dao: Address,
        plugin: Address,
        data: &[u8],
        conditions: &'a ConditionDirectory,
        proxies: &'a ProxyTable,
    ) -> Self {
        let mut h = salt_hasher(dao, data);
        h.update(plugin.as_bytes());
        Self {
            dao,
            setup,
            version,
            salt: h.finalize(),
            conditions,
            proxies,
        }
    }

    /// DAO being set up
    pub fn dao(&self) -> Address {
        self.dao
    }

    /// Address of the setup contract
    pub fn setup(&self) -> Address {
        self.setup
    }

    /// Version being set up
    pub fn version(&self) -> Version {
        self.version
    }

    /// Address `label` deploys to in this context
    pub fn predict(&self, label: &str) -> Address {
        Address::derive(self.setup, &labelled(&self.salt, label))
    }

    /// Deploy a plain contract
    pub fn deploy(&self, label: &str) -> Address {
        self.predict(label)
    }

    /// Deploy an upgradeable proxy pointing at `implementation`
    pub fn deploy_proxy(&self, label: &str, implementation: Address) -> Address {
        let proxy = self.predict(label);
        self.proxies.deploy(proxy, implementation);
        proxy
    }

    /// Deploy a condition contract
    pub fn deploy_condition(
        &self,
        label: &str,
        condition: Arc<dyn PermissionCondition>,
    ) -> Address {
        self.conditions
            .deploy(self.setup, &labelled(&self.salt, label), condition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_authorization::condition_directory;
    use quorum_authorization::{ConditionContext, ConditionError};

    #[test]
    fn test_prediction_matches_deployment() {
        let conditions = condition_directory();
        let proxies = ProxyTable::new();
        let setup = Address::from_label("setup");
        let dao = Address::from_label("dao");
        let ctx = SetupContext::for_installation(
            setup,
            Version::new(1, 0, 0),
            dao,
            b"data",
            &conditions,
            &proxies,
        );

        let plugin = ctx.deploy_proxy("plugin", Address::from_label("impl"));
        assert_eq!(plugin, predict_address(setup, dao, b"data", "plugin"));
        assert!(proxies.is_proxy(&plugin));

        let condition = ctx.deploy_condition(
            "cond",
            Arc::new(
                |_: &ConditionContext<'_>| -> std::result::Result<bool, ConditionError> {
                    Ok(true)
                },
            ),
        );
        assert_eq!(condition, predict_address(setup, dao, b"data", "cond"));
        assert!(conditions.contains(&condition));
    }

    #[test]
    fn test_salt_depends_on_dao_and_data() {
        let setup = Address::from_label("setup");
        let dao = Address::from_label("dao");
        let other = Address::from_label("other-dao");
        assert_ne!(
            predict_address(setup, dao, b"a", "plugin"),
            predict_address(setup, dao, b"b", "plugin")
        );
        assert_ne!(
            predict_address(setup, dao, b"a", "plugin"),
            predict_address(setup, other, b"a", "plugin")
        );
    }
}
