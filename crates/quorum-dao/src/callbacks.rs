//! Standard callback registry of a DAO

use quorum_core::{QuorumError, Result, Selector};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Callback selectors the DAO answers, and the interfaces it advertises
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardCallbacks {
    magic_numbers: BTreeMap<Selector, Selector>,
    interfaces: BTreeSet<Selector>,
}

impl StandardCallbacks {
    /// Answer `callback_selector` with `magic_number` and advertise `interface_id`
    pub fn register(
        &mut self,
        interface_id: Selector,
        callback_selector: Selector,
        magic_number: Selector,
    ) {
        self.interfaces.insert(interface_id);
        self.magic_numbers.insert(callback_selector, magic_number);
    }

    /// Magic number for `selector`
    pub fn handle(&self, selector: Selector) -> Result<Selector> {
        self.magic_numbers
            .get(&selector)
            .copied()
            .ok_or_else(|| QuorumError::UnknownCallback {
                selector: selector.to_string(),
            })
    }

    /// Whether `interface_id` was registered
    pub fn supports_interface(&self, interface_id: Selector) -> bool {
        self.interfaces.contains(&interface_id)
    }
}
