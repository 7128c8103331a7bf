//! Installation state and prepared-setup identifiers

use quorum_core::hash;
use quorum_core::{Address, MultiTargetPermission, PermissionOperation, Version};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a (dao, plugin) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PluginStatus {
    /// Installed and wired into the DAO
    Installed,
    /// Removed from the DAO
    Uninstalled,
}

/// What the processor remembers about a plugin in a DAO
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationState {
    /// Lifecycle status
    pub status: PluginStatus,
    /// Repo the plugin was installed from
    pub repo: Address,
    /// Setup of the installed build
    pub plugin_setup: Address,
    /// Installed version
    pub version: Version,
    /// Current helpers
    pub helpers: Vec<Address>,
    /// Grants currently held because of the plugin
    pub permissions: Vec<MultiTargetPermission>,
}

impl InstallationState {
    /// Whether the plugin is currently installed
    pub fn is_installed(&self) -> bool {
        self.status == PluginStatus::Installed
    }

    /// Fold an applied batch into the installed grant set
    pub fn apply_delta(&mut self, batch: &[MultiTargetPermission]) {
        for entry in batch {
            match entry.operation {
                PermissionOperation::Grant | PermissionOperation::GrantWithCondition => {
                    if !self.permissions.iter().any(|held| held.key() == entry.key()) {
                        self.permissions.push(entry.clone());
                    }
                }
                PermissionOperation::Revoke => {
                    self.permissions.retain(|held| held.key() != entry.key());
                }
                PermissionOperation::Freeze => {}
            }
        }
    }
}

/// Kind of a prepared setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetupKind {
    /// Installation
    Installation,
    /// Update
    Update,
    /// Uninstallation
    Uninstallation,
}

impl SetupKind {
    fn tag(self) -> u8 {
        match self {
            SetupKind::Installation => 0,
            SetupKind::Update => 1,
            SetupKind::Uninstallation => 2,
        }
    }
}

/// Identifier binding a prepared setup to everything it will apply
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SetupId(pub [u8; 32]);

impl fmt::Debug for SetupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SetupId({}…)", hex::encode(&self.0[..6]))
    }
}

fn operation_tag(operation: PermissionOperation) -> u8 {
    match operation {
        PermissionOperation::Grant => 0,
        PermissionOperation::Revoke => 1,
        PermissionOperation::Freeze => 2,
        PermissionOperation::GrantWithCondition => 3,
    }
}

/// Fields a prepared setup is bound to
#[derive(Debug, Clone, Copy)]
pub struct SetupBinding<'a> {
    /// Kind of setup
    pub kind: SetupKind,
    /// Target DAO
    pub dao: Address,
    /// Plugin
    pub plugin: Address,
    /// Source repo
    pub repo: Address,
    /// Version the setup leads to
    pub version: Version,
    /// Helpers after the setup
    pub helpers: &'a [Address],
    /// Batch the setup applies
    pub permissions: &'a [MultiTargetPermission],
}

impl SetupBinding<'_> {
    /// Hash of every bound field
    pub fn id(&self) -> SetupId {
        let mut h = hash::hasher("quorum/prepared-setup");
        h.update(&[self.kind.tag()])
            .update(self.dao.as_bytes())
            .update(self.plugin.as_bytes())
            .update(self.repo.as_bytes())
            .update(&self.version.major.to_be_bytes())
            .update(&self.version.minor.to_be_bytes())
            .update(&self.version.patch.to_be_bytes());
        h.update(&(self.helpers.len() as u64).to_be_bytes());
        for helper in self.helpers {
            h.update(helper.as_bytes());
        }
        h.update(&(self.permissions.len() as u64).to_be_bytes());
        for entry in self.permissions {
            h.update(&[operation_tag(entry.operation)])
                .update(entry.target.as_bytes())
                .update(entry.who.as_bytes())
                .update(entry.condition.as_bytes())
                .update(entry.permission_id.as_bytes());
        }
        SetupId(h.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_core::{EXECUTE_PERMISSION_ID, ROOT_PERMISSION_ID};

    fn binding<'a>(
        helpers: &'a [Address],
        permissions: &'a [MultiTargetPermission],
    ) -> SetupBinding<'a> {
        SetupBinding {
            kind: SetupKind::Installation,
            dao: Address::from_label("dao"),
            plugin: Address::from_label("plugin"),
            repo: Address::from_label("repo"),
            version: Version::new(1, 0, 0),
            helpers,
            permissions,
        }
    }

    #[test]
    fn test_id_binds_every_field() {
        let dao = Address::from_label("dao");
        let plugin = Address::from_label("plugin");
        let helpers = [Address::from_label("helper")];
        let batch = [MultiTargetPermission::grant(dao, plugin, *EXECUTE_PERMISSION_ID)];
        let other = [MultiTargetPermission::grant(dao, plugin, *ROOT_PERMISSION_ID)];

        let base = binding(&helpers, &batch).id();
        assert_eq!(base, binding(&helpers, &batch).id());
        assert_ne!(base, binding(&[], &batch).id());
        assert_ne!(base, binding(&helpers, &other).id());
        assert_ne!(
            base,
            SetupBinding {
                kind: SetupKind::Update,
                ..binding(&helpers, &batch)
            }
            .id()
        );
    }

    #[test]
    fn test_delta_tracks_grants() {
        let dao = Address::from_label("dao");
        let plugin = Address::from_label("plugin");
        let mut state = InstallationState {
            status: PluginStatus::Installed,
            repo: Address::from_label("repo"),
            plugin_setup: Address::from_label("setup"),
            version: Version::new(1, 0, 0),
            helpers: vec![],
            permissions: vec![],
        };
        let grant = MultiTargetPermission::grant(dao, plugin, *EXECUTE_PERMISSION_ID);
        state.apply_delta(&[grant.clone(), grant.clone()]);
        assert_eq!(state.permissions, vec![grant]);

        state.apply_delta(&[MultiTargetPermission::revoke(
            dao,
            plugin,
            *EXECUTE_PERMISSION_ID,
        )]);
        assert!(state.permissions.is_empty());
    }
}
