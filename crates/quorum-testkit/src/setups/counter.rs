use once_cell::sync::Lazy;
use quorum_core::{
    inverse, Address, MultiTargetPermission, PermissionId, Result, Version, EXECUTE_PERMISSION_ID,
};
use quorum_plugins::{
    PluginSetup, PreparedInstallation, PreparedUpdate, SetupContext, SetupPayload, UpdateRequest,
};

/// Append to the counter's log helper
pub static WRITE_LOG_PERMISSION_ID: Lazy<PermissionId> =
    Lazy::new(|| PermissionId::from_name("WRITE_LOG_PERMISSION"));

/// Upgradeable counter plugin
///
/// Every `major.minor` line has its own implementation. Builds from `1.1` on
/// deploy a log helper the plugin may write to; updating from `1.0` deploys
/// it and grants the write permission.
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterSetup;

fn has_log(version: &Version) -> bool {
    (version.major, version.minor) >= (1, 1)
}

impl PluginSetup for CounterSetup {
    fn implementation(&self, version: &Version) -> Address {
        Address::from_label(&format!("counter-impl-{}.{}", version.major, version.minor))
    }

    fn prepare_installation(
        &self,
        ctx: &SetupContext<'_>,
        _data: &[u8],
    ) -> Result<PreparedInstallation> {
        let plugin = ctx.deploy_proxy("counter", self.implementation(&ctx.version()));
        let mut prepared = PreparedInstallation {
            plugin,
            helpers: Vec::new(),
            permissions: vec![MultiTargetPermission::grant(
                ctx.dao(),
                plugin,
                *EXECUTE_PERMISSION_ID,
            )],
        };
        if has_log(&ctx.version()) {
            let log = ctx.deploy("log");
            prepared.helpers.push(log);
            prepared
                .permissions
                .push(MultiTargetPermission::grant(log, plugin, *WRITE_LOG_PERMISSION_ID));
        }
        Ok(prepared)
    }

    fn prepare_update(
        &self,
        ctx: &SetupContext<'_>,
        request: &UpdateRequest,
    ) -> Result<PreparedUpdate> {
        let mut helpers = request.payload.current_helpers.clone();
        let mut permissions = Vec::new();
        if !has_log(&request.from) && has_log(&request.to) {
            let log = ctx.deploy("log");
            helpers.push(log);
            permissions.push(MultiTargetPermission::grant(
                log,
                request.payload.plugin,
                *WRITE_LOG_PERMISSION_ID,
            ));
        }
        Ok(PreparedUpdate {
            helpers,
            permissions,
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
