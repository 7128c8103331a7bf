//! Plugin repo: append-only version ledger of one plugin
//!
//! Every published [`PluginVersion`] maps a semantic version to the setup
//! contract of that build and a content URI. Versions only ever grow by one
//! adjacent bump (see [`quorum_core::is_valid_bump`]), and minor or patch
//! releases must keep the setup contract of the latest version.
//!
//! Publishing is gated by `CREATE_VERSION_PERMISSION` on the repo's own
//! permission manager.

use crate::setup::SetupDirectory;
use quorum_authorization::{ConditionDirectory, PermissionManager};
use quorum_core::{
    is_valid_bump, Address, BumpKind, Event, EventLog, PermissionId, QuorumError, Result,
    SingleTargetPermission, Version, CREATE_VERSION_PERMISSION_ID,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// One published build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginVersion {
    /// Sequential id, starting at 1
    pub id: u32,
    /// Semantic version
    pub version: Version,
    /// Setup contract of the build
    pub plugin_setup: Address,
    /// Content URI (release notes, UI metadata)
    pub content_uri: Vec<u8>,
}

/// Version ledger of one plugin
#[derive(Debug, Clone)]
pub struct PluginRepo {
    address: Address,
    permissions: PermissionManager,
    setups: SetupDirectory,
    versions: Vec<PluginVersion>,
    by_version: BTreeMap<Version, usize>,
    latest_for_setup: BTreeMap<Address, usize>,
    events: EventLog,
}

impl PluginRepo {
    /// Initialize an empty repo at `address` owned by `initial_owner`
    pub fn initialize(
        address: Address,
        initial_owner: Address,
        conditions: ConditionDirectory,
        setups: SetupDirectory,
    ) -> Self {
        let mut permissions = PermissionManager::new(address, conditions);
        permissions.initialize(initial_owner);
        Self {
            address,
            permissions,
            setups,
            versions: Vec::new(),
            by_version: BTreeMap::new(),
            latest_for_setup: BTreeMap::new(),
            events: EventLog::new(),
        }
    }

    /// Address of the repo
    pub fn address(&self) -> Address {
        self.address
    }

    /// The repo's permission manager
    pub fn permissions(&self) -> &PermissionManager {
        &self.permissions
    }

    /// Repo events
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Publish `version` built by `plugin_setup`
    ///
    /// Returns the id of the new version.
    pub fn create_version(
        &mut self,
        caller: Address,
        version: Version,
        plugin_setup: Address,
        content_uri: Vec<u8>,
    ) -> Result<u32> {
        if !self
            .permissions
            .is_granted(self.address, caller, *CREATE_VERSION_PERMISSION_ID, &[])
        {
            return Err(QuorumError::unauthorized(
                self.address,
                self.address,
                caller,
                *CREATE_VERSION_PERMISSION_ID,
            ));
        }
        if !self.setups.contains(&plugin_setup) {
            return Err(QuorumError::InvalidPluginSetupInterface {
                setup: plugin_setup,
            });
        }

        let latest = self.latest_version();
        let current = latest.map_or(Version::ZERO, |v| v.version);
        if !is_valid_bump(&current, &version) {
            return Err(QuorumError::InvalidBump {
                current,
                proposed: version,
            });
        }
        if let Some(latest) = latest {
            let keeps_setup = latest.plugin_setup == plugin_setup;
            if current.bump_kind(&version) != Some(BumpKind::Major) && !keeps_setup {
                return Err(QuorumError::InvalidContractAddressForMajorBump {
                    previous: latest.plugin_setup,
                    proposed: plugin_setup,
                });
            }
        }

        let index = self.versions.len();
        let id = u32::try_from(index + 1).map_err(|_| QuorumError::InvalidBump {
            current,
            proposed: version,
        })?;
        self.versions.push(PluginVersion {
            id,
            version,
            plugin_setup,
            content_uri: content_uri.clone(),
        });
        self.by_version.insert(version, index);
        self.latest_for_setup.insert(plugin_setup, index);

        info!(repo = %self.address, %version, setup = %plugin_setup, id, "version published");
        self.events.emit(Event::NewVersion {
            repo: self.address,
            version_id: id,
            version,
            plugin_setup,
            content_uri,
        });
        Ok(id)
    }

    /// Most recently published version
    pub fn latest_version(&self) -> Option<&PluginVersion> {
        self.versions.last()
    }

    /// Version with sequential id `id`
    pub fn version_by_id(&self, id: u32) -> Option<&PluginVersion> {
        let index = usize::try_from(id).ok()?.checked_sub(1)?;
        self.versions.get(index)
    }

    /// Exact semantic version
    pub fn version(&self, version: &Version) -> Result<&PluginVersion> {
        self.by_version
            .get(version)
            .and_then(|index| self.versions.get(*index))
            .ok_or(QuorumError::VersionNotFound {
                repo: self.address,
                version: *version,
            })
    }

    /// Newest version published with `plugin_setup`
    pub fn latest_version_for_setup(&self, plugin_setup: Address) -> Result<&PluginVersion> {
        self.latest_for_setup
            .get(&plugin_setup)
            .and_then(|index| self.versions.get(*index))
            .ok_or(QuorumError::SetupNotInRepo {
                setup: plugin_setup,
                repo: self.address,
            })
    }

    /// Number of published versions
    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    /// All versions, oldest first
    pub fn versions(&self) -> &[PluginVersion] {
        &self.versions
    }

    /// Grant a permission on the repo's manager
    pub fn grant(
        &mut self,
        caller: Address,
        target: Address,
        who: Address,
        permission_id: PermissionId,
    ) -> Result<()> {
        self.permissions.grant(caller, target, who, permission_id)
    }

    /// Revoke a permission on the repo's manager
    pub fn revoke(
        &mut self,
        caller: Address,
        target: Address,
        who: Address,
        permission_id: PermissionId,
    ) -> Result<()> {
        self.permissions.revoke(caller, target, who, permission_id)
    }

    /// Apply a single-target batch on the repo's manager
    pub fn apply_single_target_permissions(
        &mut self,
        caller: Address,
        target: Address,
        items: &[SingleTargetPermission],
    ) -> Result<()> {
        self.permissions
            .apply_single_target_permissions(caller, target, items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::{
        setup_directory, PluginSetup, PreparedInstallation, SetupContext, SetupPayload,
    };
    use assert_matches::assert_matches;
    use quorum_authorization::condition_directory;
    use quorum_core::MultiTargetPermission;
    use std::sync::Arc;

    struct NoopSetup;

    impl PluginSetup for NoopSetup {
        fn implementation(&self, _version: &Version) -> Address {
            Address::from_label("noop-impl")
        }

        fn prepare_installation(
            &self,
            ctx: &SetupContext<'_>,
            _data: &[u8],
        ) -> Result<PreparedInstallation> {
            Ok(PreparedInstallation {
                plugin: ctx.deploy("plugin"),
                ..PreparedInstallation::default()
            })
        }

        fn prepare_uninstallation(
            &self,
            _ctx: &SetupContext<'_>,
            _payload: &SetupPayload,
        ) -> Result<Vec<MultiTargetPermission>> {
            Ok(Vec::new())
        }
    }

    struct Fixture {
        repo: PluginRepo,
        maintainer: Address,
        setup_a: Address,
        setup_b: Address,
    }

    fn fixture() -> Fixture {
        let setups = setup_directory();
        let deployer = Address::from_label("deployer");
        let setup_a = setups.deploy(deployer, b"a", Arc::new(NoopSetup));
        let setup_b = setups.deploy(deployer, b"b", Arc::new(NoopSetup));
        let maintainer = Address::from_label("maintainer");
        let address = Address::from_label("repo");
        let mut repo = PluginRepo::initialize(address, maintainer, condition_directory(), setups);
        repo.grant(maintainer, address, maintainer, *CREATE_VERSION_PERMISSION_ID)
            .unwrap();
        Fixture {
            repo,
            maintainer,
            setup_a,
            setup_b,
        }
    }

    #[test]
    fn test_first_version_must_bump_from_zero() {
        let mut f = fixture();
        assert_matches!(
            f.repo
                .create_version(f.maintainer, Version::new(1, 1, 0), f.setup_a, vec![]),
            Err(QuorumError::InvalidBump { .. })
        );
        let id = f
            .repo
            .create_version(f.maintainer, Version::new(1, 0, 0), f.setup_a, vec![])
            .unwrap();
        assert_eq!(id, 1);
        assert_eq!(f.repo.version_by_id(1).unwrap().version, Version::new(1, 0, 0));
        assert!(f.repo.version_by_id(0).is_none());
    }

    #[test]
    fn test_only_major_bump_may_change_setup() {
        let mut f = fixture();
        f.repo
            .create_version(f.maintainer, Version::new(1, 0, 0), f.setup_a, vec![])
            .unwrap();
        assert_eq!(
            f.repo
                .create_version(f.maintainer, Version::new(1, 1, 0), f.setup_b, vec![]),
            Err(QuorumError::InvalidContractAddressForMajorBump {
                previous: f.setup_a,
                proposed: f.setup_b,
            })
        );
        f.repo
            .create_version(f.maintainer, Version::new(1, 0, 1), f.setup_a, vec![])
            .unwrap();
        f.repo
            .create_version(f.maintainer, Version::new(2, 0, 0), f.setup_b, b"v2".to_vec())
            .unwrap();

        assert_eq!(f.repo.version_count(), 3);
        assert_eq!(
            f.repo.latest_version_for_setup(f.setup_a).unwrap().version,
            Version::new(1, 0, 1)
        );
        assert_eq!(f.repo.latest_version().unwrap().plugin_setup, f.setup_b);
        assert_matches!(
            f.repo.version(&Version::new(1, 1, 0)),
            Err(QuorumError::VersionNotFound { .. })
        );
    }

    #[test]
    fn test_publishing_requires_permission_and_known_setup() {
        let mut f = fixture();
        let stranger = Address::from_label("stranger");
        assert_matches!(
            f.repo
                .create_version(stranger, Version::new(1, 0, 0), f.setup_a, vec![]),
            Err(QuorumError::Unauthorized { .. })
        );
        let bogus = Address::from_label("not-a-setup");
        assert_eq!(
            f.repo
                .create_version(f.maintainer, Version::new(1, 0, 0), bogus, vec![]),
            Err(QuorumError::InvalidPluginSetupInterface { setup: bogus })
        );
        assert!(f.repo.events().is_empty());
    }
}
