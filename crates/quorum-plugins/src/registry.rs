//! Plugin repo registry
//!
//! Owns every registered [`PluginRepo`] and keeps the name → repo index
//! unique. Registration is gated by `REGISTER_PLUGIN_REPO_PERMISSION` on the
//! registry, checked against the managing DAO's permission manager.

use crate::repo::PluginRepo;
use quorum_authorization::PermissionCheck;
use quorum_core::config::RegistryConfig;
use quorum_core::{
    Address, Event, EventLog, QuorumError, Result, REGISTER_PLUGIN_REPO_PERMISSION_ID,
};
use std::collections::BTreeMap;
use tracing::info;

/// Registry of plugin repos
#[derive(Debug, Clone)]
pub struct PluginRepoRegistry {
    address: Address,
    managing_dao: Address,
    config: RegistryConfig,
    repos: BTreeMap<Address, PluginRepo>,
    names: BTreeMap<String, Address>,
    events: EventLog,
}

impl PluginRepoRegistry {
    /// Create an empty registry at `address`, administered by `managing_dao`
    pub fn new(address: Address, managing_dao: Address, config: RegistryConfig) -> Self {
        Self {
            address,
            managing_dao,
            config,
            repos: BTreeMap::new(),
            names: BTreeMap::new(),
            events: EventLog::new(),
        }
    }

    /// Address of the registry
    pub fn address(&self) -> Address {
        self.address
    }

    /// DAO whose ledger gates registration
    pub fn managing_dao(&self) -> Address {
        self.managing_dao
    }

    /// Registry events
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Register `repo` under `name`
    ///
    /// `authority` must be the managing DAO and must grant `caller`
    /// `REGISTER_PLUGIN_REPO_PERMISSION` on this registry.
    pub fn register_plugin_repo(
        &mut self,
        caller: Address,
        authority: &dyn PermissionCheck,
        name: &str,
        repo: PluginRepo,
    ) -> Result<Address> {
        let permission_id = *REGISTER_PLUGIN_REPO_PERMISSION_ID;
        if authority.host() != self.managing_dao
            || !authority.has_permission(self.address, caller, permission_id, name.as_bytes())
        {
            return Err(QuorumError::unauthorized(
                self.managing_dao,
                self.address,
                caller,
                permission_id,
            ));
        }
        self.validate_name(name)?;

        let address = repo.address();
        if self.repos.contains_key(&address) {
            return Err(QuorumError::ContractAlreadyRegistered {
                registrant: address,
            });
        }
        if self.names.contains_key(name) {
            return Err(QuorumError::PluginNameAlreadyRegistered {
                name: name.to_string(),
            });
        }

        self.repos.insert(address, repo);
        self.names.insert(name.to_string(), address);
        info!(registry = %self.address, name, repo = %address, "plugin repo registered");
        self.events.emit(Event::RepoRegistered {
            name: name.to_string(),
            repo: address,
        });
        Ok(address)
    }

    /// Whether `repo` is registered
    pub fn contains(&self, repo: &Address) -> bool {
        self.repos.contains_key(repo)
    }

    /// Registered repo at `address`
    pub fn repo(&self, address: &Address) -> Option<&PluginRepo> {
        self.repos.get(address)
    }

    /// Mutable access to a registered repo (publishing, permission changes)
    pub fn repo_mut(&mut self, address: &Address) -> Option<&mut PluginRepo> {
        self.repos.get_mut(address)
    }

    /// Address registered under `name`
    pub fn address_of(&self, name: &str) -> Option<Address> {
        self.names.get(name).copied()
    }

    /// Number of registered repos
    pub fn len(&self) -> usize {
        self.repos.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    fn validate_name(&self, name: &str) -> Result<()> {
        let charset_ok = name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
        let valid = !name.is_empty()
            && name.len() <= self.config.max_name_length
            && charset_ok
            && !name.starts_with('-')
            && !name.ends_with('-');
        if valid {
            Ok(())
        } else {
            Err(QuorumError::InvalidPluginName {
                name: name.to_string(),
            })
        }
    }
}
