//! Deployed framework fixture
//!
//! [`TestFramework`] deploys a [`Framework`] and publishes the sample plugins:
//!
//! | repo | versions | setup |
//! |---|---|---|
//! | `admin` | `1.0.0` | [`AdminSetup`] |
//! | `treasury` | `1.0.0` | [`TreasurySetup`] |
//! | `counter` | `1.0.0` | [`CounterSetup`] |
//!
//! Further builds are published by the maintainer with
//! [`TestFramework::publish`].

use crate::setups::{AdminSetup, CounterSetup, TreasurySetup};
use quorum_core::config::FrameworkConfig;
use quorum_core::{
    Address, QuorumError, Result, Version, APPLY_INSTALLATION_PERMISSION_ID,
    APPLY_UNINSTALLATION_PERMISSION_ID, APPLY_UPDATE_PERMISSION_ID, ROOT_PERMISSION_ID,
};
use quorum_dao::{Dao, DaoSettings};
use quorum_plugins::{
    ApplyInstallation, Framework, InstallationState, PluginSettings, PluginSetup,
    PrepareInstallation, PreparedInstallation,
};
use std::sync::Arc;

/// Named externally-owned accounts
pub mod accounts {
    use quorum_core::Address;

    /// Deploys the framework
    pub fn deployer() -> Address {
        Address::from_label("deployer")
    }

    /// Maintains every sample plugin repo
    pub fn maintainer() -> Address {
        Address::from_label("maintainer")
    }

    /// Deploys the sample setups
    pub fn publisher() -> Address {
        Address::from_label("publisher")
    }

    /// Test user
    pub fn alice() -> Address {
        Address::from_label("alice")
    }

    /// Test user
    pub fn bob() -> Address {
        Address::from_label("bob")
    }

    /// Holds no permission anywhere
    pub fn mallory() -> Address {
        Address::from_label("mallory")
    }
}

/// A sample plugin published in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishedPlugin {
    /// Registered repo name
    pub name: &'static str,
    /// Repo address
    pub repo: Address,
    /// Setup of every published build
    pub setup: Address,
}

impl PublishedPlugin {
    /// Settings installing this plugin at DAO creation
    pub fn settings(&self, data: Vec<u8>) -> PluginSettings {
        PluginSettings {
            repo: self.repo,
            plugin_setup: self.setup,
            data,
        }
    }

    /// Parameters preparing an installation of this plugin
    pub fn prepare(&self, data: Vec<u8>) -> PrepareInstallation {
        PrepareInstallation {
            repo: self.repo,
            plugin_setup: self.setup,
            data,
        }
    }
}

/// A framework with the sample plugins published
pub struct TestFramework {
    /// The deployment
    pub framework: Framework,
    /// Single-admin plugin
    pub admin: PublishedPlugin,
    /// Treasury plugin with a conditioned helper
    pub treasury: PublishedPlugin,
    /// Upgradeable counter plugin
    pub counter: PublishedPlugin,
}

impl Default for TestFramework {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFramework {
    /// Deploy with the default configuration
    pub fn new() -> Self {
        Self::with_config(FrameworkConfig::default())
    }

    /// Deploy with `config`
    pub fn with_config(config: FrameworkConfig) -> Self {
        let mut framework =
            Framework::deploy(config, accounts::deployer()).expect("framework deploys");
        let admin = publish(&mut framework, "admin", Arc::new(AdminSetup));
        let treasury = publish(&mut framework, "treasury", Arc::new(TreasurySetup));
        let counter = publish(&mut framework, "counter", Arc::new(CounterSetup));

        Self {
            framework,
            admin,
            treasury,
            counter,
        }
    }

    /// Publish `version` of `plugin` as its maintainer, keeping its setup
    pub fn publish(&mut self, plugin: &PublishedPlugin, version: Version) -> Result<u32> {
        let repo = self
            .framework
            .registry_mut()
            .repo_mut(&plugin.repo)
            .ok_or(QuorumError::PluginRepoNonexistant { repo: plugin.repo })?;
        repo.create_version(
            accounts::maintainer(),
            version,
            plugin.setup,
            format!("ipfs://{}/{version}", plugin.name).into_bytes(),
        )
    }

    /// Create a DAO through the DAO factory
    pub fn create_dao(&mut self, creator: Address, plugins: &[PluginSettings]) -> Result<Dao> {
        self.framework
            .create_dao(creator, DaoSettings::default(), plugins)
    }

    /// Create a DAO governed by the admin plugin with `admin` as its admin
    pub fn create_dao_with_admin(&mut self, admin: Address) -> Dao {
        let settings = self.admin.settings(AdminSetup::install_data(admin));
        self.create_dao(admin, &[settings])
            .expect("dao with admin plugin is created")
    }

    /// A DAO owned directly by `owner`
    ///
    /// `owner` holds ROOT and every `APPLY_*` permission on the DAO, and the
    /// setup processor holds ROOT.
    pub fn owned_dao(&self, owner: Address) -> Dao {
        let address = Address::derive(owner, b"test-dao");
        let mut dao = Dao::initialize(
            address,
            DaoSettings::default(),
            owner,
            self.framework.conditions().clone(),
            self.framework.config().dao.clone(),
        );
        let processor = self.framework.processor().address();
        dao.grant(owner, address, processor, *ROOT_PERMISSION_ID)
            .expect("owner grants processor root");
        for permission_id in [
            *APPLY_INSTALLATION_PERMISSION_ID,
            *APPLY_UPDATE_PERMISSION_ID,
            *APPLY_UNINSTALLATION_PERMISSION_ID,
        ] {
            dao.grant(owner, address, owner, permission_id)
                .expect("owner grants itself apply permissions");
        }
        dao
    }

    /// Prepare and process an installation of `plugin` into `dao`
    pub fn install(
        &mut self,
        caller: Address,
        dao: &mut Dao,
        plugin: &PublishedPlugin,
        data: Vec<u8>,
    ) -> Result<PreparedInstallation> {
        let (processor, registry) = self.framework.processor_mut();
        let prepared =
            processor.prepare_installation(caller, registry, dao.address(), plugin.prepare(data))?;
        processor.process_installation(
            caller,
            registry,
            dao,
            ApplyInstallation {
                repo: plugin.repo,
                plugin_setup: plugin.setup,
                plugin: prepared.plugin,
                helpers: prepared.helpers.clone(),
                permissions: prepared.permissions.clone(),
            },
        )?;
        Ok(prepared)
    }

    /// Recorded state of `plugin` in `dao`
    pub fn installation(&self, dao: &Dao, plugin: Address) -> Option<&InstallationState> {
        self.framework.processor().installation(dao.address(), plugin)
    }
}

fn publish(
    framework: &mut Framework,
    name: &'static str,
    setup: Arc<dyn PluginSetup>,
) -> PublishedPlugin {
    let setup = framework.deploy_setup(accounts::publisher(), name.as_bytes(), setup);
    let repo = framework
        .create_plugin_repo_with_version(
            name,
            Version::new(1, 0, 0),
            setup,
            format!("ipfs://{name}/1.0.0").into_bytes(),
            accounts::maintainer(),
        )
        .expect("sample repo is created");
    PublishedPlugin {
        name,
        repo,
        setup,
    }
}
