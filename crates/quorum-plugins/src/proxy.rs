//! Upgradeable plugin proxies
//!
//! A proxy is an address whose behaviour is delegated to an implementation
//! address that can be swapped later. The table only records the pointer;
//! whether an upgrade is allowed is decided by the caller's permission check.

use parking_lot::RwLock;
use quorum_core::Address;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Shared proxy → implementation table
#[derive(Debug, Clone, Default)]
pub struct ProxyTable {
    proxies: Arc<RwLock<BTreeMap<Address, Address>>>,
}

impl ProxyTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy a proxy at `proxy` pointing at `implementation`
    ///
    /// Returns false when a proxy already lives at `proxy`; its pointer is kept.
    pub fn deploy(&self, proxy: Address, implementation: Address) -> bool {
        let mut proxies = self.proxies.write();
        if proxies.contains_key(&proxy) {
            return false;
        }
        debug!(%proxy, %implementation, "proxy deployed");
        proxies.insert(proxy, implementation);
        true
    }

    /// Implementation behind `proxy`
    pub fn implementation(&self, proxy: &Address) -> Option<Address> {
        self.proxies.read().get(proxy).copied()
    }

    /// Whether `address` is a proxy
    pub fn is_proxy(&self, address: &Address) -> bool {
        self.proxies.read().contains_key(address)
    }

    /// Point `proxy` at `implementation`; returns false if `proxy` is unknown
    pub fn upgrade(&self, proxy: Address, implementation: Address) -> bool {
        match self.proxies.write().get_mut(&proxy) {
            Some(current) => {
                debug!(%proxy, from = %current, to = %implementation, "proxy upgraded");
                *current = implementation;
                true
            }
            None => false,
        }
    }
}
