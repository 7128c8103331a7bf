//! Observable events emitted by ledger, repo, registry and setup processor
//!
//! Each contract keeps its own [`EventLog`]. Logs are truncated back to a
//! checkpoint when a transaction rolls back, so a failed call never leaves
//! events behind.

use crate::address::Address;
use crate::calldata::Selector;
use crate::permission::{MultiTargetPermission, PermissionId};
use crate::version::Version;
use serde::{Deserialize, Serialize};

/// An observable state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// A permission was granted
    Granted {
        /// Permission identifier
        permission_id: PermissionId,
        /// Caller that performed the grant
        actor: Address,
        /// Contract hosting the ledger
        here: Address,
        /// Contract the permission applies to
        target: Address,
        /// Grantee
        who: Address,
        /// Condition contract, or the allow sentinel
        condition: Address,
    },
    /// A permission was revoked
    Revoked {
        /// Permission identifier
        permission_id: PermissionId,
        /// Caller that performed the revocation
        actor: Address,
        /// Contract hosting the ledger
        here: Address,
        /// Contract the permission applied to
        target: Address,
        /// Former grantee
        who: Address,
    },
    /// A (target, permission id) pair was frozen
    Frozen {
        /// Permission identifier
        permission_id: PermissionId,
        /// Caller that froze it
        actor: Address,
        /// Contract hosting the ledger
        here: Address,
        /// Contract the permission applies to
        target: Address,
    },
    /// DAO actions were executed
    Executed {
        /// Caller
        actor: Address,
        /// Caller-supplied correlation id
        call_id: [u8; 32],
        /// Number of actions
        action_count: usize,
        /// Bitmap of tolerated failures that occurred
        failure_map: u128,
    },
    /// DAO metadata changed
    MetadataSet {
        /// New metadata
        metadata: Vec<u8>,
    },
    /// DAO URI changed
    NewUri {
        /// New URI
        dao_uri: String,
    },
    /// DAO trusted forwarder changed
    TrustedForwarderSet {
        /// New forwarder
        forwarder: Address,
    },
    /// DAO signature validator changed
    SignatureValidatorSet {
        /// New validator
        validator: Address,
    },
    /// A standard callback was registered
    StandardCallbackRegistered {
        /// Interface the callback belongs to
        interface_id: Selector,
        /// Callback selector
        callback_selector: Selector,
        /// Value returned when the callback is invoked
        magic_number: Selector,
    },
    /// A plugin repo published a version
    NewVersion {
        /// Repo address
        repo: Address,
        /// Sequential version id (1-based)
        version_id: u32,
        /// Published version
        version: Version,
        /// Setup contract of the version
        plugin_setup: Address,
        /// Content URI
        content_uri: Vec<u8>,
    },
    /// A plugin repo was registered
    RepoRegistered {
        /// Registered name
        name: String,
        /// Repo address
        repo: Address,
    },
    /// A plugin installation was prepared
    InstallationPrepared {
        /// Caller
        sender: Address,
        /// Target DAO
        dao: Address,
        /// Deployed plugin
        plugin: Address,
        /// Setup used
        plugin_setup: Address,
        /// Version being installed
        version: Version,
        /// Deployed helpers
        helpers: Vec<Address>,
        /// Batch to apply on processing
        permissions: Vec<MultiTargetPermission>,
    },
    /// A plugin installation was applied
    InstallationProcessed {
        /// Target DAO
        dao: Address,
        /// Installed plugin
        plugin: Address,
    },
    /// A plugin update was prepared
    UpdatePrepared {
        /// Caller
        sender: Address,
        /// Target DAO
        dao: Address,
        /// Plugin being updated
        plugin: Address,
        /// Installed version
        from: Version,
        /// Target version
        to: Version,
        /// Helpers after the update
        helpers: Vec<Address>,
        /// Migration batch
        permissions: Vec<MultiTargetPermission>,
    },
    /// A plugin update was applied
    UpdateProcessed {
        /// Target DAO
        dao: Address,
        /// Updated plugin
        plugin: Address,
        /// Version now installed
        version: Version,
    },
    /// A plugin uninstallation was prepared
    UninstallationPrepared {
        /// Caller
        sender: Address,
        /// Target DAO
        dao: Address,
        /// Plugin being removed
        plugin: Address,
        /// Revocation batch
        permissions: Vec<MultiTargetPermission>,
    },
    /// A plugin was uninstalled
    PluginUninstalled {
        /// Target DAO
        dao: Address,
        /// Removed plugin
        plugin: Address,
    },
    /// A DAO was created by the factory
    DaoCreated {
        /// New DAO
        dao: Address,
        /// Caller that requested it
        creator: Address,
        /// Plugins installed at creation
        plugins: Vec<Address>,
    },
}

/// Append-only event log with rollback to a checkpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event
    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Current length, usable as a rollback checkpoint
    pub fn checkpoint(&self) -> usize {
        self.events.len()
    }

    /// Drop every event emitted after `checkpoint`
    pub fn rollback(&mut self, checkpoint: usize) {
        self.events.truncate(checkpoint);
    }

    /// All events in emission order
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing was emitted
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Most recent event
    pub fn last(&self) -> Option<&Event> {
        self.events.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollback_truncates() {
        let mut log = EventLog::new();
        log.emit(Event::NewUri {
            dao_uri: "a".into(),
        });
        let checkpoint = log.checkpoint();
        log.emit(Event::NewUri {
            dao_uri: "b".into(),
        });
        log.rollback(checkpoint);

        assert_eq!(log.len(), 1);
        assert_eq!(
            log.last(),
            Some(&Event::NewUri {
                dao_uri: "a".into()
            })
        );
    }
}
