//! Quorum Plugins - plugin repos, setups and the setup processor
//!
//! Plugins reach a DAO through a fixed pipeline:
//!
//! 1. a maintainer publishes builds in a [`PluginRepo`], created by the
//!    [`PluginRepoFactory`] and listed in the [`PluginRepoRegistry`]
//! 2. each build names a [`PluginSetup`] that deploys the plugin and computes
//!    the permissions it needs
//! 3. the [`PluginSetupProcessor`] prepares and then processes installations,
//!    updates and uninstallations against the DAO's permission manager
//!
//! [`DaoFactory`] creates DAOs with plugins pre-installed and
//! [`Framework::deploy`] wires one complete deployment.

#![forbid(unsafe_code)]

pub mod dao_factory;
pub mod framework;
pub mod processor;
pub mod proxy;
pub mod registry;
pub mod repo;
pub mod repo_factory;
pub mod setup;

pub use dao_factory::{DaoFactory, PluginSettings};
pub use framework::Framework;
pub use processor::{
    ApplyInstallation, ApplyUninstallation, ApplyUpdate, InstallationState, PluginSetupProcessor,
    PluginStatus, PrepareInstallation, PrepareUninstallation, PrepareUpdate, ProcessorSnapshot,
    SetupBinding, SetupId, SetupKind,
};
pub use proxy::ProxyTable;
pub use registry::PluginRepoRegistry;
pub use repo::{PluginRepo, PluginVersion};
pub use repo_factory::PluginRepoFactory;
pub use setup::{
    predict_address, setup_directory, PluginSetup, PreparedInstallation, PreparedUpdate,
    SetupContext, SetupDirectory, SetupPayload, UpdateRequest,
};
