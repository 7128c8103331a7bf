//! Permission identifiers and permission batch entries
//!
//! A [`PermissionId`] is the hash of a human-readable name and is treated as
//! an opaque 32-byte key everywhere else. Batches of [`MultiTargetPermission`]
//! entries are the unit of change that plugin setups produce and that the
//! permission manager applies atomically.

use crate::address::{Address, UNSET_FLAG};
use crate::hash;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque 32-byte permission identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionId(pub [u8; 32]);

impl PermissionId {
    /// Derive the identifier for a permission name
    pub fn from_name(name: &str) -> Self {
        Self(hash::hash(name.as_bytes()))
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PermissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match well_known_name(self) {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{}", hex::encode(self.0)),
        }
    }
}

impl fmt::Debug for PermissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PermissionId({self})")
    }
}

macro_rules! well_known_permissions {
    ($($(#[$doc:meta])* $ident:ident => $name:literal),+ $(,)?) => {
        $(
            $(#[$doc])*
            pub static $ident: Lazy<PermissionId> = Lazy::new(|| PermissionId::from_name($name));
        )+

        fn well_known_name(id: &PermissionId) -> Option<&'static str> {
            $(
                if *id == *$ident {
                    return Some($name);
                }
            )+
            None
        }
    };
}

well_known_permissions! {
    /// Master permission: manage every other permission on a target
    ROOT_PERMISSION_ID => "ROOT_PERMISSION",
    /// Run actions through a DAO
    EXECUTE_PERMISSION_ID => "EXECUTE_PERMISSION",
    /// Upgrade the DAO implementation
    UPGRADE_DAO_PERMISSION_ID => "UPGRADE_DAO_PERMISSION",
    /// Change DAO metadata and URI
    SET_METADATA_PERMISSION_ID => "SET_METADATA_PERMISSION",
    /// Change the DAO's trusted forwarder
    SET_TRUSTED_FORWARDER_PERMISSION_ID => "SET_TRUSTED_FORWARDER_PERMISSION",
    /// Change the DAO's signature validator
    SET_SIGNATURE_VALIDATOR_PERMISSION_ID => "SET_SIGNATURE_VALIDATOR_PERMISSION",
    /// Register standard callbacks on a DAO
    REGISTER_STANDARD_CALLBACK_PERMISSION_ID => "REGISTER_STANDARD_CALLBACK_PERMISSION",
    /// Process a prepared plugin installation
    APPLY_INSTALLATION_PERMISSION_ID => "APPLY_INSTALLATION_PERMISSION",
    /// Process a prepared plugin update
    APPLY_UPDATE_PERMISSION_ID => "APPLY_UPDATE_PERMISSION",
    /// Process a prepared plugin uninstallation
    APPLY_UNINSTALLATION_PERMISSION_ID => "APPLY_UNINSTALLATION_PERMISSION",
    /// Upgrade a plugin proxy
    UPGRADE_PLUGIN_PERMISSION_ID => "UPGRADE_PLUGIN_PERMISSION",
    /// Publish a new version in a plugin repo
    CREATE_VERSION_PERMISSION_ID => "CREATE_VERSION_PERMISSION",
    /// Upgrade a plugin repo implementation
    UPGRADE_REPO_PERMISSION_ID => "UPGRADE_REPO_PERMISSION",
    /// Register a plugin repo in the registry
    REGISTER_PLUGIN_REPO_PERMISSION_ID => "REGISTER_PLUGIN_REPO_PERMISSION",
}

/// Operation carried by a batch entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PermissionOperation {
    /// Unconditional grant
    Grant,
    /// Revoke any existing grant
    Revoke,
    /// Freeze the (where, permission id) pair
    Freeze,
    /// Grant gated by a condition contract
    GrantWithCondition,
}

impl fmt::Display for PermissionOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PermissionOperation::Grant => "grant",
            PermissionOperation::Revoke => "revoke",
            PermissionOperation::Freeze => "freeze",
            PermissionOperation::GrantWithCondition => "grant_with_condition",
        };
        f.write_str(name)
    }
}

/// Batch entry scoped to a single, externally supplied target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleTargetPermission {
    /// Operation to perform
    pub operation: PermissionOperation,
    /// Grantee (ignored for freeze)
    pub who: Address,
    /// Permission identifier
    pub permission_id: PermissionId,
}

/// Batch entry naming its own target
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MultiTargetPermission {
    /// Operation to perform
    pub operation: PermissionOperation,
    /// Contract the permission applies to
    pub target: Address,
    /// Grantee (ignored for freeze)
    pub who: Address,
    /// Condition contract for [`PermissionOperation::GrantWithCondition`],
    /// [`UNSET_FLAG`] otherwise
    pub condition: Address,
    /// Permission identifier
    pub permission_id: PermissionId,
}

impl MultiTargetPermission {
    /// Unconditional grant entry
    pub fn grant(target: Address, who: Address, permission_id: PermissionId) -> Self {
        Self {
            operation: PermissionOperation::Grant,
            target,
            who,
            condition: UNSET_FLAG,
            permission_id,
        }
    }

    /// Conditional grant entry
    pub fn grant_with_condition(
        target: Address,
        who: Address,
        permission_id: PermissionId,
        condition: Address,
    ) -> Self {
        Self {
            operation: PermissionOperation::GrantWithCondition,
            target,
            who,
            condition,
            permission_id,
        }
    }

    /// Revoke entry
    pub fn revoke(target: Address, who: Address, permission_id: PermissionId) -> Self {
        Self {
            operation: PermissionOperation::Revoke,
            target,
            who,
            condition: UNSET_FLAG,
            permission_id,
        }
    }

    /// Freeze entry
    pub fn freeze(target: Address, permission_id: PermissionId) -> Self {
        Self {
            operation: PermissionOperation::Freeze,
            target,
            who: UNSET_FLAG,
            condition: UNSET_FLAG,
            permission_id,
        }
    }

    /// Whether the entry adds a grant
    pub fn is_grant(&self) -> bool {
        matches!(
            self.operation,
            PermissionOperation::Grant | PermissionOperation::GrantWithCondition
        )
    }

    /// The (target, who, permission id) triple this entry touches
    pub fn key(&self) -> (Address, Address, PermissionId) {
        (self.target, self.who, self.permission_id)
    }
}

/// Turn the grants of a batch into the revocations that undo them
///
/// Entries are emitted in reverse order; revocations and freezes in the input
/// have no inverse and are skipped.
pub fn inverse(batch: &[MultiTargetPermission]) -> Vec<MultiTargetPermission> {
    batch
        .iter()
        .rev()
        .filter(|entry| entry.is_grant())
        .map(|entry| MultiTargetPermission::revoke(entry.target, entry.who, entry.permission_id))
        .collect()
}
