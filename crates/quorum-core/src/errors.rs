//! Unified error type for Quorum
//!
//! Every failing mutation aborts its transaction synchronously and reports the
//! exact offending tuple. Condition evaluation failures never show up here:
//! the permission manager folds them into "not granted".

use crate::address::Address;
use crate::permission::PermissionId;
use crate::version::Version;
use serde::{Deserialize, Serialize};

/// Error classes of the failure taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Missing permission
    AuthorizationDenied,
    /// Target is frozen
    StateImmutable,
    /// Bad semantic bump or illegal setup-address change
    VersioningViolation,
    /// Duplicate registration or unsupported interface
    RegistryViolation,
    /// Plugin setup lifecycle precondition failed
    SetupViolation,
    /// Malformed permission request
    InvalidRequest,
    /// DAO action execution failed
    ExecutionFailure,
    /// Configuration could not be loaded or validated
    Configuration,
}

/// Unified error type for all Quorum operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum QuorumError {
    /// Caller lacks the permission required on `target`
    #[error("unauthorized: {who} lacks {permission_id} on {target} (dao {dao})")]
    Unauthorized {
        /// Contract whose ledger was consulted
        dao: Address,
        /// Contract the permission applies to
        target: Address,
        /// Caller that was denied
        who: Address,
        /// Permission that was required
        permission_id: PermissionId,
    },

    /// The (target, permission id) pair is frozen
    #[error("permission {permission_id} on {target} is frozen")]
    PermissionFrozen {
        /// Contract the permission applies to
        target: Address,
        /// Frozen permission
        permission_id: PermissionId,
    },

    /// The key is already held under another condition (or unconditionally)
    #[error(
        "{who} already holds {permission_id} on {target} under condition {current_condition}, cannot regrant under {new_condition}"
    )]
    PermissionAlreadyGrantedForDifferentCondition {
        /// Contract the permission applies to
        target: Address,
        /// Grantee
        who: Address,
        /// Permission identifier
        permission_id: PermissionId,
        /// Record currently stored
        current_condition: Address,
        /// Record that was requested
        new_condition: Address,
    },

    /// ROOT cannot be granted to the wildcard caller
    #[error("root permission cannot be granted to any address")]
    PermissionsForAnyAddressDisallowed,

    /// The wildcard is never a valid target
    #[error("the any-address wildcard cannot be used as a target")]
    AnyAddressTargetDisallowed,

    /// A sentinel was supplied where a condition contract is required
    #[error("invalid condition address {condition}")]
    InvalidCondition {
        /// Rejected condition address
        condition: Address,
    },

    /// No condition contract is deployed at the address
    #[error("no condition contract deployed at {condition}")]
    ConditionNotAContract {
        /// Rejected condition address
        condition: Address,
    },

    /// Single-target batches only carry grant, revoke and freeze
    #[error("grant with condition is not supported in single-target batches")]
    GrantWithConditionNotSupported,

    /// Proposed version is not an adjacent bump of the latest
    #[error("invalid version bump from {current} to {proposed}")]
    InvalidBump {
        /// Latest published version
        current: Version,
        /// Rejected version
        proposed: Version,
    },

    /// A minor or patch release changed the setup contract
    #[error("setup contract may only change on a major bump ({previous} -> {proposed})")]
    InvalidContractAddressForMajorBump {
        /// Setup of the latest version
        previous: Address,
        /// Setup that was proposed
        proposed: Address,
    },

    /// The address does not host a plugin setup
    #[error("no plugin setup deployed at {setup}")]
    InvalidPluginSetupInterface {
        /// Rejected setup address
        setup: Address,
    },

    /// Version lookup failed
    #[error("version {version} not found in repo {repo}")]
    VersionNotFound {
        /// Repo that was queried
        repo: Address,
        /// Requested version
        version: Version,
    },

    /// The setup was never published in the repo
    #[error("setup {setup} is not published in repo {repo}")]
    SetupNotInRepo {
        /// Setup address
        setup: Address,
        /// Repo address
        repo: Address,
    },

    /// The repo is not registered
    #[error("plugin repo {repo} is not registered")]
    PluginRepoNonexistant {
        /// Unregistered repo address
        repo: Address,
    },

    /// No prepared setup matches the submitted one
    #[error("setup for plugin {plugin} on dao {dao} was not prepared or does not match")]
    SetupNotAllowed {
        /// DAO the setup targets
        dao: Address,
        /// Plugin the setup targets
        plugin: Address,
    },

    /// The address is already registered
    #[error("contract {registrant} is already registered")]
    ContractAlreadyRegistered {
        /// Address that was registered twice
        registrant: Address,
    },

    /// The repo name is already taken
    #[error("plugin name '{name}' is already registered")]
    PluginNameAlreadyRegistered {
        /// Taken name
        name: String,
    },

    /// The repo name is not a valid lowercase label
    #[error("invalid plugin name '{name}'")]
    InvalidPluginName {
        /// Rejected name
        name: String,
    },

    /// The plugin is already installed in the DAO
    #[error("plugin {plugin} is already installed on dao {dao}")]
    PluginAlreadyInstalled {
        /// DAO address
        dao: Address,
        /// Plugin address
        plugin: Address,
    },

    /// The plugin is not installed in the DAO
    #[error("plugin {plugin} is not installed on dao {dao}")]
    PluginNotInstalled {
        /// DAO address
        dao: Address,
        /// Plugin address
        plugin: Address,
    },

    /// Submitted helpers differ from the recorded ones
    #[error("helpers supplied for plugin {plugin} do not match the installed helpers")]
    HelpersMismatch {
        /// Plugin address
        plugin: Address,
    },

    /// Update target is not build-compatible with the installed version
    #[error("cannot update from {current} to {target}")]
    IncompatibleUpdate {
        /// Installed version
        current: Version,
        /// Requested version
        target: Version,
    },

    /// The plugin is not behind an upgradeable proxy
    #[error("plugin {plugin} is not upgradeable")]
    PluginNonupgradeable {
        /// Plugin address
        plugin: Address,
    },

    /// A prepared batch exceeds the configured bound
    #[error("permission batch of {len} entries exceeds the limit of {max}")]
    BatchTooLarge {
        /// Batch length
        len: usize,
        /// Configured bound
        max: usize,
    },

    /// DAO creation needs at least one plugin
    #[error("no plugin provided")]
    NoPluginProvided,

    /// Plugin setup logic rejected its input
    #[error("setup {setup} failed: {reason}")]
    SetupFailed {
        /// Setup address
        setup: Address,
        /// Reason reported by the setup
        reason: String,
    },

    /// Too many actions in one execute call
    #[error("{count} actions exceed the limit of {max}")]
    TooManyActions {
        /// Requested action count
        count: usize,
        /// Configured bound
        max: usize,
    },

    /// A non-tolerated action failed
    #[error("action {index} failed: {reason}")]
    ActionFailed {
        /// Index of the failed action
        index: usize,
        /// Executor diagnostic
        reason: String,
    },

    /// No callback is registered for the selector
    #[error("unknown callback {selector}")]
    UnknownCallback {
        /// Hex-encoded selector
        selector: String,
    },

    /// Configuration could not be loaded or validated
    #[error("config error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },
}

impl QuorumError {
    /// Create an unauthorized error
    pub fn unauthorized(
        dao: Address,
        target: Address,
        who: Address,
        permission_id: PermissionId,
    ) -> Self {
        Self::Unauthorized {
            dao,
            target,
            who,
            permission_id,
        }
    }

    /// Create a setup failure
    pub fn setup_failed(setup: Address, reason: impl Into<String>) -> Self {
        Self::SetupFailed {
            setup,
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Taxonomy class of this error
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Unauthorized { .. } => ErrorClass::AuthorizationDenied,
            Self::PermissionFrozen { .. } => ErrorClass::StateImmutable,
            Self::PermissionAlreadyGrantedForDifferentCondition { .. }
            | Self::PermissionsForAnyAddressDisallowed
            | Self::AnyAddressTargetDisallowed
            | Self::InvalidCondition { .. }
            | Self::ConditionNotAContract { .. }
            | Self::GrantWithConditionNotSupported => ErrorClass::InvalidRequest,
            Self::InvalidBump { .. }
            | Self::InvalidContractAddressForMajorBump { .. }
            | Self::VersionNotFound { .. }
            | Self::IncompatibleUpdate { .. } => ErrorClass::VersioningViolation,
            Self::InvalidPluginSetupInterface { .. }
            | Self::PluginRepoNonexistant { .. }
            | Self::ContractAlreadyRegistered { .. }
            | Self::PluginNameAlreadyRegistered { .. }
            | Self::InvalidPluginName { .. } => ErrorClass::RegistryViolation,
            Self::SetupNotInRepo { .. }
            | Self::SetupNotAllowed { .. }
            | Self::PluginAlreadyInstalled { .. }
            | Self::PluginNotInstalled { .. }
            | Self::HelpersMismatch { .. }
            | Self::PluginNonupgradeable { .. }
            | Self::BatchTooLarge { .. }
            | Self::NoPluginProvided
            | Self::SetupFailed { .. } => ErrorClass::SetupViolation,
            Self::TooManyActions { .. }
            | Self::ActionFailed { .. }
            | Self::UnknownCallback { .. } => ErrorClass::ExecutionFailure,
            Self::Config { .. } => ErrorClass::Configuration,
        }
    }
}

/// Standard Result type for Quorum operations
pub type Result<T> = std::result::Result<T, QuorumError>;

impl From<std::io::Error> for QuorumError {
    fn from(err: std::io::Error) -> Self {
        Self::config(err.to_string())
    }
}

impl From<toml::de::Error> for QuorumError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("invalid TOML: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::EXECUTE_PERMISSION_ID;

    #[test]
    fn test_unauthorized_carries_tuple() {
        let dao = Address::from_label("dao");
        let who = Address::from_label("mallory");
        let err = QuorumError::unauthorized(dao, dao, who, *EXECUTE_PERMISSION_ID);

        assert_eq!(err.class(), ErrorClass::AuthorizationDenied);
        let message = err.to_string();
        assert!(message.contains("EXECUTE_PERMISSION"));
        assert!(message.contains(&who.to_string()));
    }

    #[test]
    fn test_error_classes() {
        let err = QuorumError::InvalidBump {
            current: Version::new(1, 0, 0),
            proposed: Version::new(1, 0, 0),
        };
        assert_eq!(err.class(), ErrorClass::VersioningViolation);
        assert_eq!(
            QuorumError::ContractAlreadyRegistered {
                registrant: Address::ZERO
            }
            .class(),
            ErrorClass::RegistryViolation
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.toml");
        let err = QuorumError::from(io_err);
        assert!(matches!(err, QuorumError::Config { .. }));
    }
}
