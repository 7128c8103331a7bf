//! Plugin setup processor
//!
//! Installs, updates and uninstalls plugins in two phases:
//!
//! 1. **prepare** asks the plugin setup to deploy contracts and compute a
//!    permission batch. Nothing is applied; the processor only records a
//!    [`SetupId`] binding the DAO, plugin, repo, version, helpers and batch.
//! 2. **process** re-validates everything, checks that the submitted setup
//!    matches a prepared one, and applies the batch to the DAO's permission
//!    manager atomically, acting as itself.
//!
//! Process calls check, in order: the repo is still registered, the caller
//! holds the matching `APPLY_*` permission on the DAO (or is the DAO), the
//! processor holds ROOT on the DAO, and the setup was prepared.

mod params;
mod state;

pub use params::{
    ApplyInstallation, ApplyUninstallation, ApplyUpdate, PrepareInstallation,
    PrepareUninstallation, PrepareUpdate,
};
pub use state::{InstallationState, PluginStatus, SetupBinding, SetupId, SetupKind};

use crate::proxy::ProxyTable;
use crate::registry::PluginRepoRegistry;
use crate::repo::PluginRepo;
use crate::setup::{
    PluginSetup, PreparedInstallation, PreparedUpdate, SetupContext, SetupDirectory, SetupPayload,
    UpdateRequest,
};
use quorum_authorization::ConditionDirectory;
use quorum_core::config::ProcessorConfig;
use quorum_core::{
    Address, Event, EventLog, MultiTargetPermission, PermissionId, QuorumError, Result,
    APPLY_INSTALLATION_PERMISSION_ID, APPLY_UNINSTALLATION_PERMISSION_ID,
    APPLY_UPDATE_PERMISSION_ID, ROOT_PERMISSION_ID, UPGRADE_PLUGIN_PERMISSION_ID,
};
use quorum_dao::Dao;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

type PluginKey = (Address, Address);

/// Restorable copy of the processor's bookkeeping
#[derive(Debug, Clone)]
pub struct ProcessorSnapshot {
    installations: BTreeMap<PluginKey, InstallationState>,
    prepared: BTreeMap<PluginKey, BTreeSet<SetupId>>,
    events: usize,
}

/// Two-phase plugin installer
#[derive(Debug, Clone)]
pub struct PluginSetupProcessor {
    address: Address,
    config: ProcessorConfig,
    setups: SetupDirectory,
    conditions: ConditionDirectory,
    proxies: ProxyTable,
    installations: BTreeMap<PluginKey, InstallationState>,
    prepared: BTreeMap<PluginKey, BTreeSet<SetupId>>,
    events: EventLog,
}

impl PluginSetupProcessor {
    /// Create a processor at `address`
    pub fn new(
        address: Address,
        config: ProcessorConfig,
        setups: SetupDirectory,
        conditions: ConditionDirectory,
        proxies: ProxyTable,
    ) -> Self {
        Self {
            address,
            config,
            setups,
            conditions,
            proxies,
            installations: BTreeMap::new(),
            prepared: BTreeMap::new(),
            events: EventLog::new(),
        }
    }

    /// Address of the processor
    pub fn address(&self) -> Address {
        self.address
    }

    /// Processor events
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Proxy table plugins are deployed into
    pub fn proxies(&self) -> &ProxyTable {
        &self.proxies
    }

    /// State of `plugin` in `dao`
    pub fn installation(&self, dao: Address, plugin: Address) -> Option<&InstallationState> {
        self.installations.get(&(dao, plugin))
    }

    /// Whether a setup with `id` is waiting to be processed for `plugin` in `dao`
    pub fn is_prepared(&self, dao: Address, plugin: Address, id: SetupId) -> bool {
        self.prepared
            .get(&(dao, plugin))
            .is_some_and(|ids| ids.contains(&id))
    }

    /// Copy of the bookkeeping, for callers composing several calls atomically
    pub fn snapshot(&self) -> ProcessorSnapshot {
        ProcessorSnapshot {
            installations: self.installations.clone(),
            prepared: self.prepared.clone(),
            events: self.events.checkpoint(),
        }
    }

    /// Return to `snapshot`
    pub fn restore(&mut self, snapshot: ProcessorSnapshot) {
        self.installations = snapshot.installations;
        self.prepared = snapshot.prepared;
        self.events.rollback(snapshot.events);
    }

    /// Deploy the plugin through its setup and compute the installation batch
    pub fn prepare_installation(
        &mut self,
        caller: Address,
        registry: &PluginRepoRegistry,
        dao: Address,
        params: PrepareInstallation,
    ) -> Result<PreparedInstallation> {
        let repo = registered(registry, params.repo)?;
        let version = repo.latest_version_for_setup(params.plugin_setup)?.version;
        let setup = self.setup_code(params.plugin_setup)?;

        let ctx = SetupContext::for_installation(
            params.plugin_setup,
            version,
            dao,
            &params.data,
            &self.conditions,
            &self.proxies,
        );
        let prepared = setup.prepare_installation(&ctx, &params.data)?;
        self.check_batch_len(&prepared.permissions)?;
        if self.installed(dao, prepared.plugin).is_some() {
            return Err(QuorumError::PluginAlreadyInstalled {
                dao,
                plugin: prepared.plugin,
            });
        }

        let id = SetupBinding {
            kind: SetupKind::Installation,
            dao,
            plugin: prepared.plugin,
            repo: params.repo,
            version,
            helpers: &prepared.helpers,
            permissions: &prepared.permissions,
        }
        .id();
        self.remember(dao, prepared.plugin, id);

        debug!(%dao, plugin = %prepared.plugin, ?id, "installation prepared");
        self.events.emit(Event::InstallationPrepared {
            sender: caller,
            dao,
            plugin: prepared.plugin,
            plugin_setup: params.plugin_setup,
            version,
            helpers: prepared.helpers.clone(),
            permissions: prepared.permissions.clone(),
        });
        Ok(prepared)
    }

    /// Apply a prepared installation to `dao`
    ///
    /// If the plugin's proxy already exists and points at another
    /// implementation than the installed build's, it is repointed; this needs
    /// the same authority on the plugin as [`Self::process_update`].
    pub fn process_installation(
        &mut self,
        caller: Address,
        registry: &PluginRepoRegistry,
        dao: &mut Dao,
        params: ApplyInstallation,
    ) -> Result<()> {
        let dao_address = dao.address();
        let repo = registered(registry, params.repo)?;
        self.check_process_auth(dao, caller, *APPLY_INSTALLATION_PERMISSION_ID)?;

        let version = repo.latest_version_for_setup(params.plugin_setup)?.version;
        let id = SetupBinding {
            kind: SetupKind::Installation,
            dao: dao_address,
            plugin: params.plugin,
            repo: params.repo,
            version,
            helpers: &params.helpers,
            permissions: &params.permissions,
        }
        .id();
        self.check_prepared(dao_address, params.plugin, id)?;
        if self.installed(dao_address, params.plugin).is_some() {
            return Err(QuorumError::PluginAlreadyInstalled {
                dao: dao_address,
                plugin: params.plugin,
            });
        }

        // A reinstallation lands on the proxy left behind by the previous
        // installation, which may still point at an older build.
        let implementation = self
            .setup_code(params.plugin_setup)?
            .implementation(&version);
        let repoint = self
            .proxies
            .implementation(&params.plugin)
            .is_some_and(|current| current != implementation);
        if repoint {
            self.check_upgrade_authority(dao, params.plugin)?;
        }

        dao.apply_multi_target_permissions(self.address, &params.permissions)?;
        if repoint {
            self.proxies.upgrade(params.plugin, implementation);
        }

        let mut state = InstallationState {
            status: PluginStatus::Installed,
            repo: params.repo,
            plugin_setup: params.plugin_setup,
            version,
            helpers: params.helpers,
            permissions: Vec::new(),
        };
        state.apply_delta(&params.permissions);
        self.installations.insert((dao_address, params.plugin), state);
        self.prepared.remove(&(dao_address, params.plugin));

        info!(dao = %dao_address, plugin = %params.plugin, %version, "installation processed");
        self.events.emit(Event::InstallationProcessed {
            dao: dao_address,
            plugin: params.plugin,
        });
        Ok(())
    }

    /// Compute the migration of an installed plugin to `params.target`
    pub fn prepare_update(
        &mut self,
        caller: Address,
        registry: &PluginRepoRegistry,
        dao: Address,
        params: PrepareUpdate,
    ) -> Result<PreparedUpdate> {
        let state = self
            .installed(dao, params.plugin)
            .ok_or(QuorumError::PluginNotInstalled {
                dao,
                plugin: params.plugin,
            })?
            .clone();
        let repo = registered(registry, state.repo)?;
        if params.current_helpers != state.helpers {
            return Err(QuorumError::HelpersMismatch {
                plugin: params.plugin,
            });
        }
        if params.target.major != state.version.major || params.target <= state.version {
            return Err(QuorumError::IncompatibleUpdate {
                current: state.version,
                target: params.target,
            });
        }
        let target_setup = repo.version(&params.target)?.plugin_setup;
        if !self.proxies.is_proxy(&params.plugin) {
            return Err(QuorumError::PluginNonupgradeable {
                plugin: params.plugin,
            });
        }

        let setup = self.setup_code(target_setup)?;
        let ctx = SetupContext::for_plugin(
            target_setup,
            params.target,
            dao,
            params.plugin,
            &params.data,
            &self.conditions,
            &self.proxies,
        );
        let request = UpdateRequest {
            from: state.version,
            to: params.target,
            payload: SetupPayload {
                plugin: params.plugin,
                current_helpers: state.helpers.clone(),
                installed_permissions: state.permissions.clone(),
                data: params.data.clone(),
            },
        };
        let prepared = setup.prepare_update(&ctx, &request)?;
        self.check_batch_len(&prepared.permissions)?;

        let id = SetupBinding {
            kind: SetupKind::Update,
            dao,
            plugin: params.plugin,
            repo: state.repo,
            version: params.target,
            helpers: &prepared.helpers,
            permissions: &prepared.permissions,
        }
        .id();
        self.remember(dao, params.plugin, id);

        debug!(%dao, plugin = %params.plugin, from = %state.version, to = %params.target, "update prepared");
        self.events.emit(Event::UpdatePrepared {
            sender: caller,
            dao,
            plugin: params.plugin,
            from: state.version,
            to: params.target,
            helpers: prepared.helpers.clone(),
            permissions: prepared.permissions.clone(),
        });
        Ok(prepared)
    }

    /// Apply a prepared update to `dao`
    ///
    /// The processor must also hold `UPGRADE_PLUGIN_PERMISSION` or ROOT on the
    /// plugin whenever the target version's implementation differs from the
    /// one behind the proxy. An update that keeps the implementation needs no
    /// authority on the plugin at all, and `UPGRADE_PLUGIN_PERMISSION` is
    /// accepted in place of ROOT on the plugin.
    pub fn process_update(
        &mut self,
        caller: Address,
        registry: &PluginRepoRegistry,
        dao: &mut Dao,
        params: ApplyUpdate,
    ) -> Result<()> {
        let dao_address = dao.address();
        let state = self
            .installed(dao_address, params.plugin)
            .ok_or(QuorumError::PluginNotInstalled {
                dao: dao_address,
                plugin: params.plugin,
            })?
            .clone();
        let repo = registered(registry, state.repo)?;
        self.check_process_auth(dao, caller, *APPLY_UPDATE_PERMISSION_ID)?;

        let id = SetupBinding {
            kind: SetupKind::Update,
            dao: dao_address,
            plugin: params.plugin,
            repo: state.repo,
            version: params.target,
            helpers: &params.helpers,
            permissions: &params.permissions,
        }
        .id();
        self.check_prepared(dao_address, params.plugin, id)?;

        let target_setup = repo.version(&params.target)?.plugin_setup;
        let implementation = self
            .setup_code(target_setup)?
            .implementation(&params.target);
        let current_implementation = self
            .proxies
            .implementation(&params.plugin)
            .ok_or(QuorumError::PluginNonupgradeable {
                plugin: params.plugin,
            })?;
        let upgrade = current_implementation != implementation;
        if upgrade {
            self.check_upgrade_authority(dao, params.plugin)?;
        }

        dao.apply_multi_target_permissions(self.address, &params.permissions)?;
        if upgrade {
            self.proxies.upgrade(params.plugin, implementation);
        }

        let key = (dao_address, params.plugin);
        if let Some(state) = self.installations.get_mut(&key) {
            state.plugin_setup = target_setup;
            state.version = params.target;
            state.helpers = params.helpers;
            state.apply_delta(&params.permissions);
        }
        self.prepared.remove(&key);

        info!(dao = %dao_address, plugin = %params.plugin, version = %params.target, upgrade, "update processed");
        self.events.emit(Event::UpdateProcessed {
            dao: dao_address,
            plugin: params.plugin,
            version: params.target,
        });
        Ok(())
    }

    /// Compute the batch removing an installed plugin
    pub fn prepare_uninstallation(
        &mut self,
        caller: Address,
        registry: &PluginRepoRegistry,
        dao: Address,
        params: PrepareUninstallation,
    ) -> Result<Vec<MultiTargetPermission>> {
        let state = self
            .installed(dao, params.plugin)
            .ok_or(QuorumError::PluginNotInstalled {
                dao,
                plugin: params.plugin,
            })?
            .clone();
        registered(registry, state.repo)?;
        if params.current_helpers != state.helpers {
            return Err(QuorumError::HelpersMismatch {
                plugin: params.plugin,
            });
        }

        let setup = self.setup_code(state.plugin_setup)?;
        let ctx = SetupContext::for_plugin(
            state.plugin_setup,
            state.version,
            dao,
            params.plugin,
            &params.data,
            &self.conditions,
            &self.proxies,
        );
        let payload = SetupPayload {
            plugin: params.plugin,
            current_helpers: state.helpers.clone(),
            installed_permissions: state.permissions.clone(),
            data: params.data,
        };
        let permissions = setup.prepare_uninstallation(&ctx, &payload)?;
        self.check_batch_len(&permissions)?;

        let id = Self::uninstallation_id(dao, params.plugin, &state, &permissions);
        self.remember(dao, params.plugin, id);

        debug!(%dao, plugin = %params.plugin, entries = permissions.len(), "uninstallation prepared");
        self.events.emit(Event::UninstallationPrepared {
            sender: caller,
            dao,
            plugin: params.plugin,
            permissions: permissions.clone(),
        });
        Ok(permissions)
    }

    /// Apply a prepared uninstallation to `dao`
    pub fn process_uninstallation(
        &mut self,
        caller: Address,
        registry: &PluginRepoRegistry,
        dao: &mut Dao,
        params: ApplyUninstallation,
    ) -> Result<()> {
        let dao_address = dao.address();
        let state = self
            .installed(dao_address, params.plugin)
            .ok_or(QuorumError::PluginNotInstalled {
                dao: dao_address,
                plugin: params.plugin,
            })?
            .clone();
        registered(registry, state.repo)?;
        self.check_process_auth(dao, caller, *APPLY_UNINSTALLATION_PERMISSION_ID)?;

        let id = Self::uninstallation_id(dao_address, params.plugin, &state, &params.permissions);
        self.check_prepared(dao_address, params.plugin, id)?;

        dao.apply_multi_target_permissions(self.address, &params.permissions)?;

        let key = (dao_address, params.plugin);
        if let Some(state) = self.installations.get_mut(&key) {
            state.apply_delta(&params.permissions);
            state.status = PluginStatus::Uninstalled;
        }
        self.prepared.remove(&key);

        info!(dao = %dao_address, plugin = %params.plugin, "plugin uninstalled");
        self.events.emit(Event::PluginUninstalled {
            dao: dao_address,
            plugin: params.plugin,
        });
        Ok(())
    }

    fn uninstallation_id(
        dao: Address,
        plugin: Address,
        state: &InstallationState,
        permissions: &[MultiTargetPermission],
    ) -> SetupId {
        SetupBinding {
            kind: SetupKind::Uninstallation,
            dao,
            plugin,
            repo: state.repo,
            version: state.version,
            helpers: &state.helpers,
            permissions,
        }
        .id()
    }

    fn installed(&self, dao: Address, plugin: Address) -> Option<&InstallationState> {
        self.installations
            .get(&(dao, plugin))
            .filter(|state| state.is_installed())
    }

    fn setup_code(&self, setup: Address) -> Result<Arc<dyn PluginSetup>> {
        self.setups
            .get(&setup)
            .ok_or(QuorumError::InvalidPluginSetupInterface { setup })
    }

    fn check_batch_len(&self, permissions: &[MultiTargetPermission]) -> Result<()> {
        if permissions.len() > self.config.max_batch_len {
            return Err(QuorumError::BatchTooLarge {
                len: permissions.len(),
                max: self.config.max_batch_len,
            });
        }
        Ok(())
    }

    fn check_process_auth(
        &self,
        dao: &Dao,
        caller: Address,
        permission_id: PermissionId,
    ) -> Result<()> {
        let here = dao.address();
        if caller != here && !dao.is_granted(here, caller, permission_id, &[]) {
            return Err(QuorumError::unauthorized(here, here, caller, permission_id));
        }
        if !dao.is_granted(here, self.address, *ROOT_PERMISSION_ID, &[]) {
            return Err(QuorumError::unauthorized(
                here,
                here,
                self.address,
                *ROOT_PERMISSION_ID,
            ));
        }
        Ok(())
    }

    fn check_upgrade_authority(&self, dao: &Dao, plugin: Address) -> Result<()> {
        let upgrade_id = *UPGRADE_PLUGIN_PERMISSION_ID;
        let may_upgrade = dao.is_granted(plugin, self.address, upgrade_id, &[])
            || dao.is_granted(plugin, self.address, *ROOT_PERMISSION_ID, &[]);
        if may_upgrade {
            Ok(())
        } else {
            Err(QuorumError::unauthorized(
                dao.address(),
                plugin,
                self.address,
                upgrade_id,
            ))
        }
    }

    fn check_prepared(&self, dao: Address, plugin: Address, id: SetupId) -> Result<()> {
        if self.is_prepared(dao, plugin, id) {
            Ok(())
        } else {
            Err(QuorumError::SetupNotAllowed { dao, plugin })
        }
    }

    fn remember(&mut self, dao: Address, plugin: Address, id: SetupId) {
        self.prepared.entry((dao, plugin)).or_default().insert(id);
    }
}

fn registered(registry: &PluginRepoRegistry, repo: Address) -> Result<&PluginRepo> {
    registry
        .repo(&repo)
        .ok_or(QuorumError::PluginRepoNonexistant { repo })
}
