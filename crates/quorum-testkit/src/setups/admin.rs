use once_cell::sync::Lazy;
use quorum_core::address::ADDRESS_LENGTH;
use quorum_core::{
    inverse, Address, MultiTargetPermission, PermissionId, QuorumError, Result, Version,
    EXECUTE_PERMISSION_ID,
};
use quorum_plugins::{PluginSetup, PreparedInstallation, SetupContext, SetupPayload};

/// Lets the admin run proposals through the admin plugin
pub static EXECUTE_PROPOSAL_PERMISSION_ID: Lazy<PermissionId> =
    Lazy::new(|| PermissionId::from_name("EXECUTE_PROPOSAL_PERMISSION"));

/// Single-admin governance plugin
///
/// Installation data is the 20-byte admin address. The plugin receives
/// `EXECUTE_PERMISSION` on the DAO and the admin receives
/// `EXECUTE_PROPOSAL_PERMISSION` on the plugin.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminSetup;

impl AdminSetup {
    /// Installation data naming `admin`
    pub fn install_data(admin: Address) -> Vec<u8> {
        admin.as_bytes().to_vec()
    }
}

impl PluginSetup for AdminSetup {
    fn implementation(&self, _version: &Version) -> Address {
        Address::from_label("admin-plugin-impl")
    }

    fn prepare_installation(
        &self,
        ctx: &SetupContext<'_>,
        data: &[u8],
    ) -> Result<PreparedInstallation> {
        let admin = <[u8; ADDRESS_LENGTH]>::try_from(data)
            .map(Address)
            .map_err(|_| QuorumError::setup_failed(ctx.setup(), "expected a 20-byte admin address"))?;
        let plugin = ctx.deploy_proxy("admin", self.implementation(&ctx.version()));
        Ok(PreparedInstallation {
            plugin,
            helpers: Vec::new(),
            permissions: vec![
                MultiTargetPermission::grant(ctx.dao(), plugin, *EXECUTE_PERMISSION_ID),
                MultiTargetPermission::grant(plugin, admin, *EXECUTE_PROPOSAL_PERMISSION_ID),
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
