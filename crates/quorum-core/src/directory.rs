//! Shared directory of deployed contract code
//!
//! A [`Directory`] maps addresses to immutable contract handles (conditions,
//! plugin setups). It is append-only: code deployed at an address never
//! changes, and deploying identical code twice at the same deterministic
//! address is a no-op. Handles are cheap to clone and share one store.

use crate::address::Address;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Append-only address → code map shared between contracts
pub struct Directory<T: ?Sized> {
    kind: &'static str,
    entries: Arc<RwLock<BTreeMap<Address, Arc<T>>>>,
}

impl<T: ?Sized> Directory<T> {
    /// Create an empty directory for one kind of contract
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Deploy `code` at `deployer`/`salt`, returning its address
    ///
    /// If code already lives at the derived address the existing code is kept.
    pub fn deploy(&self, deployer: Address, salt: &[u8], code: Arc<T>) -> Address {
        let address = Address::derive(deployer, salt);
        self.deploy_at(address, code);
        address
    }

    /// Deploy `code` at an explicit address
    ///
    /// Returns false when the address was already occupied.
    pub fn deploy_at(&self, address: Address, code: Arc<T>) -> bool {
        let mut entries = self.entries.write();
        if entries.contains_key(&address) {
            return false;
        }
        debug!(kind = self.kind, %address, "contract deployed");
        entries.insert(address, code);
        true
    }

    /// Code at `address`
    ///
    /// The lock is released before the handle is returned, so callers may
    /// invoke the code without blocking further deployments.
    pub fn get(&self, address: &Address) -> Option<Arc<T>> {
        self.entries.read().get(address).cloned()
    }

    /// Whether code lives at `address`
    pub fn contains(&self, address: &Address) -> bool {
        self.entries.read().contains_key(address)
    }

    /// Number of deployed contracts
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing is deployed
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<T: ?Sized> Clone for Directory<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Directory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directory")
            .field("kind", &self.kind)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_is_idempotent_and_shared() {
        let directory: Directory<str> = Directory::new("label");
        let shared = directory.clone();
        let deployer = Address::from_label("deployer");

        let first = directory.deploy(deployer, b"salt", Arc::from("one"));
        let second = shared.deploy(deployer, b"salt", Arc::from("two"));

        assert_eq!(first, second);
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.get(&first).as_deref(), Some("one"));
    }

    #[test]
    fn test_missing_address() {
        let directory: Directory<str> = Directory::new("label");
        assert!(!directory.contains(&Address::from_label("nowhere")));
        assert!(directory.get(&Address::ZERO).is_none());
    }
}
