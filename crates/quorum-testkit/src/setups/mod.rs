//! Sample plugin setups
//!
//! - [`AdminSetup`]: a single-admin plugin that may execute on the DAO
//! - [`TreasurySetup`]: a plugin with a vault helper whose withdrawals are
//!   guarded by a parameter-scoped condition
//! - [`CounterSetup`]: an upgradeable plugin whose build `1.1` adds a helper
//!   and points the proxy at a new implementation

mod admin;
mod counter;
mod treasury;

pub use admin::{AdminSetup, EXECUTE_PROPOSAL_PERMISSION_ID};
pub use counter::{CounterSetup, WRITE_LOG_PERMISSION_ID};
pub use treasury::{withdraw_call, withdraw_selector, TreasurySetup, WITHDRAW_PERMISSION_ID};
