//! Parameters of the setup processor's prepare and process calls

use quorum_core::{Address, MultiTargetPermission, Version};
use serde::{Deserialize, Serialize};

/// Prepare an installation of the build published with `plugin_setup`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareInstallation {
    /// Repo the build is published in
    pub repo: Address,
    /// Setup of the build
    pub plugin_setup: Address,
    /// Data handed to the setup
    pub data: Vec<u8>,
}

/// Apply a prepared installation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyInstallation {
    /// Repo the build is published in
    pub repo: Address,
    /// Setup of the build
    pub plugin_setup: Address,
    /// Plugin returned by the preparation
    pub plugin: Address,
    /// Helpers returned by the preparation
    pub helpers: Vec<Address>,
    /// Batch returned by the preparation
    pub permissions: Vec<MultiTargetPermission>,
}

/// Prepare an update of an installed plugin to `target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareUpdate {
    /// Installed plugin
    pub plugin: Address,
    /// Version to update to
    pub target: Version,
    /// Helpers the caller believes are installed
    pub current_helpers: Vec<Address>,
    /// Data handed to the setup
    pub data: Vec<u8>,
}

/// Apply a prepared update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyUpdate {
    /// Installed plugin
    pub plugin: Address,
    /// Version to update to
    pub target: Version,
    /// Helpers returned by the preparation
    pub helpers: Vec<Address>,
    /// Batch returned by the preparation
    pub permissions: Vec<MultiTargetPermission>,
}

/// Prepare the removal of an installed plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareUninstallation {
    /// Installed plugin
    pub plugin: Address,
    /// Helpers the caller believes are installed
    pub current_helpers: Vec<Address>,
    /// Data handed to the setup
    pub data: Vec<u8>,
}

/// Apply a prepared uninstallation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyUninstallation {
    /// Installed plugin
    pub plugin: Address,
    /// Batch returned by the preparation
    pub permissions: Vec<MultiTargetPermission>,
}
