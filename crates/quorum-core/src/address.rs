//! Account and contract addresses, including the ledger sentinels
//!
//! An [`Address`] is an opaque 20-byte identifier. Three values are reserved
//! by the permission ledger and never belong to a real account:
//!
//! - [`UNSET_FLAG`] (all zeros): no record
//! - [`ALLOW_FLAG`] (`0x…02`): unconditional grant
//! - [`ANY_ADDR`] (all ones): wildcard `who`

use crate::hash;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of an address in bytes
pub const ADDRESS_LENGTH: usize = 20;

/// A 20-byte account or contract address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Address(pub [u8; ADDRESS_LENGTH]);

/// Record value meaning "no grant"
pub const UNSET_FLAG: Address = Address::ZERO;

/// Record value meaning "granted without condition"
pub const ALLOW_FLAG: Address = Address([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2,
]);

/// Wildcard caller, usable only as `who`
pub const ANY_ADDR: Address = Address([0xff; ADDRESS_LENGTH]);

impl Address {
    /// The zero address
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    /// Derive a deterministic deployment address from a deployer and a salt
    ///
    /// The result is computable off-line before any deployment happens.
    pub fn derive(deployer: Address, salt: &[u8]) -> Self {
        let mut h = hash::hasher("quorum/deploy");
        h.update(&deployer.0).update_field(salt);
        Self::from_digest(h.finalize())
    }

    /// Derive a stable address from a human-readable label
    ///
    /// Used for externally-owned accounts in fixtures and tooling.
    pub fn from_label(label: &str) -> Self {
        let mut h = hash::hasher("quorum/label");
        h.update_field(label.as_bytes());
        Self::from_digest(h.finalize())
    }

    fn from_digest(digest: [u8; 32]) -> Self {
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&digest[32 - ADDRESS_LENGTH..]);
        Self(bytes)
    }

    /// Whether this is the zero address
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Whether this is one of the ledger sentinels
    pub fn is_sentinel(&self) -> bool {
        *self == UNSET_FLAG || *self == ALLOW_FLAG || *self == ANY_ADDR
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; ADDRESS_LENGTH];
        hex::decode_to_slice(stripped, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl From<[u8; ADDRESS_LENGTH]> for Address {
    fn from(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }
}
