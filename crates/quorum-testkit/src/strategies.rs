//! Property test strategies for Quorum types
//!
//! Addresses and permission ids are drawn from small pools so generated
//! operations collide often enough to exercise overwrites and conflicts.

use proptest::prelude::*;

pub use proptest;

use quorum_core::{
    Address, MultiTargetPermission, PermissionId, Version, ANY_ADDR, EXECUTE_PERMISSION_ID,
    ROOT_PERMISSION_ID, SET_METADATA_PERMISSION_ID, UPGRADE_PLUGIN_PERMISSION_ID,
};

/// One of eight labelled addresses
pub fn arb_address() -> impl Strategy<Value = Address> {
    (0u8..8).prop_map(|n| Address::from_label(&format!("account-{n}")))
}

/// A labelled address or the wildcard
pub fn arb_who() -> impl Strategy<Value = Address> {
    prop_oneof![4 => arb_address(), 1 => Just(ANY_ADDR)]
}

/// One of a few well-known permission ids
pub fn arb_permission_id() -> impl Strategy<Value = PermissionId> {
    prop_oneof![
        Just(*ROOT_PERMISSION_ID),
        Just(*EXECUTE_PERMISSION_ID),
        Just(*SET_METADATA_PERMISSION_ID),
        Just(*UPGRADE_PLUGIN_PERMISSION_ID),
    ]
}

/// Small semantic versions, biased towards adjacent values
pub fn arb_version() -> impl Strategy<Value = Version> {
    (0u16..4, 0u16..4, 0u16..4).prop_map(|(major, minor, patch)| Version::new(major, minor, patch))
}

/// Unconditional grant and revoke entries over the address and id pools
pub fn arb_entry() -> impl Strategy<Value = MultiTargetPermission> {
    (any::<bool>(), arb_address(), arb_who(), arb_permission_id()).prop_map(
        |(grant, target, who, permission_id)| {
            if grant {
                MultiTargetPermission::grant(target, who, permission_id)
            } else {
                MultiTargetPermission::revoke(target, who, permission_id)
            }
        },
    )
}

/// A batch of up to `max_len` entries
pub fn arb_batch(max_len: usize) -> impl Strategy<Value = Vec<MultiTargetPermission>> {
    prop::collection::vec(arb_entry(), 0..=max_len)
}
