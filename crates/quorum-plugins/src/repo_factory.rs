//! Plugin repo factory
//!
//! Creates a repo, optionally publishes its first version, hands the
//! maintainer the repo's management permissions and registers it. The
//! factory holds ROOT on the new repo only while the call runs.

use crate::registry::PluginRepoRegistry;
use crate::repo::PluginRepo;
use crate::setup::SetupDirectory;
use quorum_authorization::{ConditionDirectory, PermissionCheck};
use quorum_core::{
    Address, PermissionOperation, Result, SingleTargetPermission, Version,
    CREATE_VERSION_PERMISSION_ID, ROOT_PERMISSION_ID, UPGRADE_REPO_PERMISSION_ID,
};
use tracing::debug;

/// Factory of plugin repos
#[derive(Debug, Clone)]
pub struct PluginRepoFactory {
    address: Address,
    conditions: ConditionDirectory,
    setups: SetupDirectory,
}

impl PluginRepoFactory {
    /// Create a factory at `address`
    pub fn new(address: Address, conditions: ConditionDirectory, setups: SetupDirectory) -> Self {
        Self {
            address,
            conditions,
            setups,
        }
    }

    /// Address of the factory
    pub fn address(&self) -> Address {
        self.address
    }

    /// Address the repo named `name` is created at
    pub fn repo_address(&self, name: &str) -> Address {
        Address::derive(self.address, name.as_bytes())
    }

    /// Create and register an empty repo maintained by `maintainer`
    pub fn create_plugin_repo(
        &self,
        registry: &mut PluginRepoRegistry,
        managing_dao: &dyn PermissionCheck,
        name: &str,
        maintainer: Address,
    ) -> Result<Address> {
        let mut repo = self.new_repo(name);
        self.hand_over(&mut repo, maintainer)?;
        registry.register_plugin_repo(self.address, managing_dao, name, repo)
    }

    /// Create a repo, publish its first version and register it
    pub fn create_plugin_repo_with_version(
        &self,
        registry: &mut PluginRepoRegistry,
        managing_dao: &dyn PermissionCheck,
        name: &str,
        version: Version,
        plugin_setup: Address,
        content_uri: Vec<u8>,
        maintainer: Address,
    ) -> Result<Address> {
        let mut repo = self.new_repo(name);
        let address = repo.address();
        repo.grant(self.address, address, self.address, *CREATE_VERSION_PERMISSION_ID)?;
        repo.create_version(self.address, version, plugin_setup, content_uri)?;
        repo.revoke(self.address, address, self.address, *CREATE_VERSION_PERMISSION_ID)?;
        self.hand_over(&mut repo, maintainer)?;
        registry.register_plugin_repo(self.address, managing_dao, name, repo)
    }

    fn new_repo(&self, name: &str) -> PluginRepo {
        PluginRepo::initialize(
            self.repo_address(name),
            self.address,
            self.conditions.clone(),
            self.setups.clone(),
        )
    }

    fn hand_over(&self, repo: &mut PluginRepo, maintainer: Address) -> Result<()> {
        let entry = |operation, who, permission_id| SingleTargetPermission {
            operation,
            who,
            permission_id,
        };
        let items = [
            entry(PermissionOperation::Grant, maintainer, *CREATE_VERSION_PERMISSION_ID),
            entry(PermissionOperation::Grant, maintainer, *UPGRADE_REPO_PERMISSION_ID),
            entry(PermissionOperation::Grant, maintainer, *ROOT_PERMISSION_ID),
            entry(PermissionOperation::Revoke, self.address, *ROOT_PERMISSION_ID),
        ];
        let address = repo.address();
        repo.apply_single_target_permissions(self.address, address, &items)?;
        debug!(repo = %address, %maintainer, "repo handed over");
        Ok(())
    }
}
