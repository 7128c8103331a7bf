//! Framework bootstrap
//!
//! [`Framework::deploy`] wires one complete deployment: the shared condition
//! and setup directories, the proxy table, the managing DAO, the plugin repo
//! registry, the repo factory, the setup processor and the DAO factory. Every
//! component address derives from the deployer, so two deployments by the
//! same deployer are identical.

use crate::dao_factory::{DaoFactory, PluginSettings};
use crate::processor::PluginSetupProcessor;
use crate::proxy::ProxyTable;
use crate::registry::PluginRepoRegistry;
use crate::repo_factory::PluginRepoFactory;
use crate::setup::{setup_directory, PluginSetup, SetupDirectory};
use quorum_authorization::{condition_directory, ConditionDirectory, PermissionCondition};
use quorum_core::config::{FrameworkConfig, QuorumConfig};
use quorum_core::{Address, Result, Version, REGISTER_PLUGIN_REPO_PERMISSION_ID};
use quorum_dao::{Dao, DaoSettings};
use std::sync::Arc;
use tracing::info;

/// A deployed framework
#[derive(Debug)]
pub struct Framework {
    config: FrameworkConfig,
    deployer: Address,
    conditions: ConditionDirectory,
    setups: SetupDirectory,
    proxies: ProxyTable,
    managing_dao: Dao,
    registry: PluginRepoRegistry,
    repo_factory: PluginRepoFactory,
    processor: PluginSetupProcessor,
    dao_factory: DaoFactory,
}

impl Framework {
    /// Validate `config` and deploy every component on behalf of `deployer`
    ///
    /// The deployer owns the managing DAO; the repo factory may register
    /// repos in the registry.
    pub fn deploy(config: FrameworkConfig, deployer: Address) -> Result<Self> {
        config.validate()?;

        let conditions = condition_directory();
        let setups = setup_directory();
        let proxies = ProxyTable::new();

        let at = |label: &str| Address::derive(deployer, label.as_bytes());
        let mut managing_dao = Dao::initialize(
            at("managing-dao"),
            DaoSettings::default(),
            deployer,
            conditions.clone(),
            config.dao.clone(),
        );
        let registry = PluginRepoRegistry::new(
            at("plugin-repo-registry"),
            managing_dao.address(),
            config.registry.clone(),
        );
        let repo_factory =
            PluginRepoFactory::new(at("plugin-repo-factory"), conditions.clone(), setups.clone());
        let processor = PluginSetupProcessor::new(
            at("plugin-setup-processor"),
            config.processor.clone(),
            setups.clone(),
            conditions.clone(),
            proxies.clone(),
        );
        let dao_factory = DaoFactory::new(at("dao-factory"), conditions.clone(), config.dao.clone());

        managing_dao.grant(
            deployer,
            registry.address(),
            repo_factory.address(),
            *REGISTER_PLUGIN_REPO_PERMISSION_ID,
        )?;

        info!(
            %deployer,
            managing_dao = %managing_dao.address(),
            registry = %registry.address(),
            processor = %processor.address(),
            "framework deployed"
        );
        Ok(Self {
            config,
            deployer,
            conditions,
            setups,
            proxies,
            managing_dao,
            registry,
            repo_factory,
            processor,
            dao_factory,
        })
    }

    /// Configuration the framework was deployed with
    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    /// Account that deployed the framework
    pub fn deployer(&self) -> Address {
        self.deployer
    }

    /// Shared condition directory
    pub fn conditions(&self) -> &ConditionDirectory {
        &self.conditions
    }

    /// Shared setup directory
    pub fn setups(&self) -> &SetupDirectory {
        &self.setups
    }

    /// Shared proxy table
    pub fn proxies(&self) -> &ProxyTable {
        &self.proxies
    }

    /// The DAO administering the registry
    pub fn managing_dao(&self) -> &Dao {
        &self.managing_dao
    }

    /// Mutable access to the managing DAO
    pub fn managing_dao_mut(&mut self) -> &mut Dao {
        &mut self.managing_dao
    }

    /// The plugin repo registry
    pub fn registry(&self) -> &PluginRepoRegistry {
        &self.registry
    }

    /// Mutable access to the registry (publishing through registered repos)
    pub fn registry_mut(&mut self) -> &mut PluginRepoRegistry {
        &mut self.registry
    }

    /// The plugin repo factory
    pub fn repo_factory(&self) -> &PluginRepoFactory {
        &self.repo_factory
    }

    /// The setup processor
    pub fn processor(&self) -> &PluginSetupProcessor {
        &self.processor
    }

    /// The setup processor and the registry it reads
    pub fn processor_mut(&mut self) -> (&mut PluginSetupProcessor, &PluginRepoRegistry) {
        (&mut self.processor, &self.registry)
    }

    /// The DAO factory
    pub fn dao_factory(&self) -> &DaoFactory {
        &self.dao_factory
    }

    /// Deploy a plugin setup from `deployer` with `salt`
    pub fn deploy_setup(
        &self,
        deployer: Address,
        salt: &[u8],
        setup: Arc<dyn PluginSetup>,
    ) -> Address {
        self.setups.deploy(deployer, salt, setup)
    }

    /// Deploy a condition from `deployer` with `salt`
    pub fn deploy_condition(
        &self,
        deployer: Address,
        salt: &[u8],
        condition: Arc<dyn PermissionCondition>,
    ) -> Address {
        self.conditions.deploy(deployer, salt, condition)
    }

    /// Create and register an empty repo through the repo factory
    pub fn create_plugin_repo(&mut self, name: &str, maintainer: Address) -> Result<Address> {
        self.repo_factory
            .create_plugin_repo(&mut self.registry, &self.managing_dao, name, maintainer)
    }

    /// Create, publish and register a repo through the repo factory
    pub fn create_plugin_repo_with_version(
        &mut self,
        name: &str,
        version: Version,
        plugin_setup: Address,
        content_uri: Vec<u8>,
        maintainer: Address,
    ) -> Result<Address> {
        self.repo_factory.create_plugin_repo_with_version(
            &mut self.registry,
            &self.managing_dao,
            name,
            version,
            plugin_setup,
            content_uri,
            maintainer,
        )
    }

    /// Create a DAO with `plugins` through the DAO factory
    pub fn create_dao(
        &mut self,
        caller: Address,
        settings: DaoSettings,
        plugins: &[PluginSettings],
    ) -> Result<Dao> {
        self.dao_factory.create_dao(
            caller,
            &mut self.processor,
            &self.registry,
            settings,
            plugins,
        )
    }
}
