use once_cell::sync::Lazy;
use quorum_authorization::ParameterScopeCondition;
use quorum_core::calldata::{self, Selector};
use quorum_core::{
    inverse, Address, MultiTargetPermission, PermissionId, Result, Version, EXECUTE_PERMISSION_ID,
};
use quorum_plugins::{PluginSetup, PreparedInstallation, SetupContext, SetupPayload};
use std::sync::Arc;

/// Withdraw from the treasury vault
pub static WITHDRAW_PERMISSION_ID: Lazy<PermissionId> =
    Lazy::new(|| PermissionId::from_name("WITHDRAW_PERMISSION"));

/// `withdraw(available, amount)`
pub fn withdraw_selector() -> Selector {
    Selector::from_signature("withdraw(uint256,uint256)")
}

/// Encoded `withdraw(available, amount)` call
pub fn withdraw_call(available: u128, amount: u128) -> Vec<u8> {
    calldata::encode_call(
        withdraw_selector(),
        &[
            calldata::word_from_u128(available),
            calldata::word_from_u128(amount),
        ],
    )
}

/// Treasury plugin with a vault helper
///
/// Helpers are `[vault, withdraw-limit condition]`. The plugin may withdraw
/// from the vault only while the available balance exceeds the amount.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreasurySetup;

impl PluginSetup for TreasurySetup {
    fn implementation(&self, _version: &Version) -> Address {
        Address::from_label("treasury-plugin-impl")
    }

    fn prepare_installation(
        &self,
        ctx: &SetupContext<'_>,
        _data: &[u8],
    ) -> Result<PreparedInstallation> {
        let plugin = ctx.deploy_proxy("treasury", self.implementation(&ctx.version()));
        let vault = ctx.deploy("vault");
        let limit = ctx.deploy_condition(
            "withdraw-limit",
            Arc::new(ParameterScopeCondition::argument_greater_than(
                withdraw_selector(),
                0,
                1,
            )),
        );
        Ok(PreparedInstallation {
            plugin,
            helpers: vec![vault, limit],
            permissions: vec![
                MultiTargetPermission::grant(ctx.dao(), plugin, *EXECUTE_PERMISSION_ID),
                MultiTargetPermission::grant_with_condition(
                    vault,
                    plugin,
                    *WITHDRAW_PERMISSION_ID,
                    limit,
                ),
            ],
        })
    }

    fn prepare_uninstallation(
        &self,
        _ctx: &SetupContext<'_>,
        payload: &SetupPayload,
    ) -> Result<Vec<MultiTargetPermission>> {
        Ok(inverse(&payload.installed_permissions))
    }
}
