//! Quorum Core - shared vocabulary of the DAO framework
//!
//! This crate holds the types every other Quorum crate speaks: addresses and
//! the ledger sentinels, permission identifiers and batch entries, semantic
//! versions with the bump law, call data words, events, the unified error
//! type, the deterministic deployment directory, and configuration.
//!
//! It contains no authorization logic; see `quorum-authorization` for the
//! permission manager and `quorum-plugins` for the setup processor.

#![forbid(unsafe_code)]

/// Addresses and ledger sentinels
pub mod address;

/// Call data selectors and argument words
pub mod calldata;

/// Framework configuration
pub mod config;

/// Shared directory of deployed contract code
pub mod directory;

/// Unified error handling
pub mod errors;

/// Observable events
pub mod events;

/// Content hashing
pub mod hash;

/// Permission identifiers and batch entries
pub mod permission;

/// Semantic versions and the bump law
pub mod version;

pub use address::{Address, ALLOW_FLAG, ANY_ADDR, UNSET_FLAG};
pub use calldata::{Selector, Word};
pub use config::{FrameworkConfig, QuorumConfig};
pub use directory::Directory;
pub use errors::{ErrorClass, QuorumError, Result};
pub use events::{Event, EventLog};
pub use permission::{
    inverse, MultiTargetPermission, PermissionId, PermissionOperation, SingleTargetPermission,
    APPLY_INSTALLATION_PERMISSION_ID, APPLY_UNINSTALLATION_PERMISSION_ID,
    APPLY_UPDATE_PERMISSION_ID, CREATE_VERSION_PERMISSION_ID, EXECUTE_PERMISSION_ID,
    REGISTER_PLUGIN_REPO_PERMISSION_ID, REGISTER_STANDARD_CALLBACK_PERMISSION_ID,
    ROOT_PERMISSION_ID, SET_METADATA_PERMISSION_ID, SET_SIGNATURE_VALIDATOR_PERMISSION_ID,
    SET_TRUSTED_FORWARDER_PERMISSION_ID, UPGRADE_DAO_PERMISSION_ID, UPGRADE_PLUGIN_PERMISSION_ID,
    UPGRADE_REPO_PERMISSION_ID,
};
pub use version::{is_valid_bump, BumpKind, Version};
