//! Prepare/process lifecycle of the plugin setup processor.

#![allow(clippy::unwrap_used, clippy::expect_used, missing_docs)]

use assert_matches::assert_matches;
use quorum_authorization::{PermissionKey, PermissionRecord};
use quorum_core::{
    Address, Event, MultiTargetPermission, QuorumError, Version, APPLY_INSTALLATION_PERMISSION_ID,
    EXECUTE_PERMISSION_ID, ROOT_PERMISSION_ID, UPGRADE_PLUGIN_PERMISSION_ID,
};
use quorum_dao::Dao;
use quorum_plugins::{
    predict_address, ApplyInstallation, ApplyUninstallation, ApplyUpdate, PluginSetup,
    PluginStatus, PrepareInstallation, PrepareUninstallation, PrepareUpdate,
};
use quorum_testkit::setups::{
    withdraw_call, CounterSetup, EXECUTE_PROPOSAL_PERMISSION_ID, WITHDRAW_PERMISSION_ID,
    WRITE_LOG_PERMISSION_ID,
};
use quorum_testkit::{
    accounts, assert_emitted, assert_granted, assert_not_granted, init_test_tracing, AdminSetup,
    TestFramework,
};

fn ledger(dao: &Dao) -> Vec<(PermissionKey, PermissionRecord)> {
    dao.permissions()
        .records()
        .map(|(key, record)| (*key, *record))
        .collect()
}

fn uninstall(env: &mut TestFramework, dao: &mut Dao, plugin: Address, helpers: Vec<Address>) {
    let (processor, registry) = env.framework.processor_mut();
    let permissions = processor
        .prepare_uninstallation(
            accounts::alice(),
            registry,
            dao.address(),
            PrepareUninstallation {
                plugin,
                current_helpers: helpers,
                data: Vec::new(),
            },
        )
        .unwrap();
    processor
        .process_uninstallation(
            accounts::alice(),
            registry,
            dao,
            ApplyUninstallation {
                plugin,
                permissions,
            },
        )
        .unwrap();
}

#[test]
fn install_then_uninstall_restores_the_ledger() {
    init_test_tracing();
    let mut env = TestFramework::new();
    let mut dao = env.owned_dao(accounts::alice());
    let before = ledger(&dao);
    let treasury = env.treasury;

    let prepared = env
        .install(accounts::alice(), &mut dao, &treasury, Vec::new())
        .unwrap();
    let plugin = prepared.plugin;
    let vault = prepared.helpers[0];

    assert_eq!(prepared.helpers.len(), 2);
    assert_granted!(dao, dao.address(), plugin, *EXECUTE_PERMISSION_ID);
    assert!(dao.is_granted(vault, plugin, *WITHDRAW_PERMISSION_ID, &withdraw_call(100, 10)));
    assert!(!dao.is_granted(vault, plugin, *WITHDRAW_PERMISSION_ID, &withdraw_call(10, 100)));
    assert!(!dao.is_granted(vault, plugin, *WITHDRAW_PERMISSION_ID, &[]));

    let state = env.installation(&dao, plugin).unwrap();
    assert_eq!(state.status, PluginStatus::Installed);
    assert_eq!(state.version, Version::new(1, 0, 0));
    assert_eq!(state.permissions, prepared.permissions);

    uninstall(&mut env, &mut dao, plugin, prepared.helpers.clone());

    assert_eq!(ledger(&dao), before);
    let state = env.installation(&dao, plugin).unwrap();
    assert_eq!(state.status, PluginStatus::Uninstalled);
    assert!(state.permissions.is_empty());
    assert_emitted!(
        env.framework.processor().events(),
        Event::PluginUninstalled { plugin: removed, .. } if *removed == plugin
    );
}

#[test]
fn prepare_is_deterministic_and_leaves_the_ledger_alone() {
    let mut env = TestFramework::new();
    let dao = env.owned_dao(accounts::alice());
    let before = ledger(&dao);
    let admin = env.admin;
    let data = AdminSetup::install_data(accounts::bob());

    let (processor, registry) = env.framework.processor_mut();
    let mut prepare = |caller| {
        processor
            .prepare_installation(caller, registry, dao.address(), admin.prepare(data.clone()))
            .unwrap()
    };
    let first = prepare(accounts::alice());
    let second = prepare(accounts::mallory());

    assert_eq!(first, second);
    assert_eq!(
        first.plugin,
        predict_address(admin.setup, dao.address(), &data, "admin")
    );
    assert_eq!(ledger(&dao), before);
    assert_emitted!(
        env.framework.processor().events(),
        Event::InstallationPrepared { plugin, .. } if *plugin == first.plugin
    );
}

#[test]
fn process_requires_the_prepared_batch() {
    let mut env = TestFramework::new();
    let mut dao = env.owned_dao(accounts::alice());
    let before = ledger(&dao);
    let admin = env.admin;

    let (processor, registry) = env.framework.processor_mut();
    let prepared = processor
        .prepare_installation(
            accounts::alice(),
            registry,
            dao.address(),
            admin.prepare(AdminSetup::install_data(accounts::bob())),
        )
        .unwrap();

    let mut tampered = prepared.permissions.clone();
    tampered.push(MultiTargetPermission::grant(
        dao.address(),
        accounts::mallory(),
        *ROOT_PERMISSION_ID,
    ));
    let params = |permissions| ApplyInstallation {
        repo: admin.repo,
        plugin_setup: admin.setup,
        plugin: prepared.plugin,
        helpers: prepared.helpers.clone(),
        permissions,
    };

    assert_eq!(
        processor.process_installation(accounts::alice(), registry, &mut dao, params(tampered)),
        Err(QuorumError::SetupNotAllowed {
            dao: dao.address(),
            plugin: prepared.plugin,
        })
    );
    assert_eq!(ledger(&dao), before);

    processor
        .process_installation(
            accounts::alice(),
            registry,
            &mut dao,
            params(prepared.permissions.clone()),
        )
        .unwrap();
    assert_granted!(
        dao,
        prepared.plugin,
        accounts::bob(),
        *EXECUTE_PROPOSAL_PERMISSION_ID
    );
    assert_not_granted!(dao, dao.address(), accounts::mallory(), *ROOT_PERMISSION_ID);

    // Processing consumed the prepared setup.
    assert_matches!(
        processor.process_installation(
            accounts::alice(),
            registry,
            &mut dao,
            params(prepared.permissions.clone())
        ),
        Err(QuorumError::SetupNotAllowed { .. })
    );
}

#[test]
fn process_checks_caller_and_processor_permissions() {
    let mut env = TestFramework::new();
    let mut dao = env.owned_dao(accounts::alice());
    let admin = env.admin;
    let processor_address = env.framework.processor().address();

    let (processor, registry) = env.framework.processor_mut();
    let prepared = processor
        .prepare_installation(
            accounts::alice(),
            registry,
            dao.address(),
            admin.prepare(AdminSetup::install_data(accounts::bob())),
        )
        .unwrap();
    let params = ApplyInstallation {
        repo: admin.repo,
        plugin_setup: admin.setup,
        plugin: prepared.plugin,
        helpers: prepared.helpers,
        permissions: prepared.permissions,
    };

    assert_matches!(
        processor.process_installation(accounts::mallory(), registry, &mut dao, params.clone()),
        Err(QuorumError::Unauthorized { who, permission_id, .. })
            if who == accounts::mallory() && permission_id == *APPLY_INSTALLATION_PERMISSION_ID
    );

    dao.revoke(
        accounts::alice(),
        dao.address(),
        processor_address,
        *ROOT_PERMISSION_ID,
    )
    .unwrap();
    assert_matches!(
        processor.process_installation(accounts::alice(), registry, &mut dao, params.clone()),
        Err(QuorumError::Unauthorized { who, permission_id, .. })
            if who == processor_address && permission_id == *ROOT_PERMISSION_ID
    );

    // The DAO itself may always process.
    dao.grant(
        accounts::alice(),
        dao.address(),
        processor_address,
        *ROOT_PERMISSION_ID,
    )
    .unwrap();
    let dao_address = dao.address();
    processor
        .process_installation(dao_address, registry, &mut dao, params)
        .unwrap();
}

#[test]
fn unknown_repo_and_repeated_installation_are_rejected() {
    let mut env = TestFramework::new();
    let mut dao = env.owned_dao(accounts::alice());
    let admin = env.admin;
    let data = AdminSetup::install_data(accounts::bob());

    let (processor, registry) = env.framework.processor_mut();
    let unknown = Address::from_label("unknown-repo");
    assert_eq!(
        processor.prepare_installation(
            accounts::alice(),
            registry,
            dao.address(),
            PrepareInstallation {
                repo: unknown,
                plugin_setup: admin.setup,
                data: data.clone(),
            },
        ),
        Err(QuorumError::PluginRepoNonexistant { repo: unknown })
    );
    assert_matches!(
        processor.prepare_installation(
            accounts::alice(),
            registry,
            dao.address(),
            admin.prepare(vec![1, 2, 3]),
        ),
        Err(QuorumError::SetupFailed { .. })
    );

    let prepared = env
        .install(accounts::alice(), &mut dao, &admin, data.clone())
        .unwrap();
    assert_eq!(
        env.install(accounts::alice(), &mut dao, &admin, data),
        Err(QuorumError::PluginAlreadyInstalled {
            dao: dao.address(),
            plugin: prepared.plugin,
        })
    );
}

#[test]
fn uninstalled_plugin_can_be_reinstalled() {
    let mut env = TestFramework::new();
    let mut dao = env.owned_dao(accounts::alice());
    let admin = env.admin;
    let data = AdminSetup::install_data(accounts::bob());

    let prepared = env
        .install(accounts::alice(), &mut dao, &admin, data.clone())
        .unwrap();
    uninstall(&mut env, &mut dao, prepared.plugin, Vec::new());
    assert_not_granted!(dao, dao.address(), prepared.plugin, *EXECUTE_PERMISSION_ID);

    let again = env
        .install(accounts::alice(), &mut dao, &admin, data)
        .unwrap();
    assert_eq!(again.plugin, prepared.plugin);
    assert_granted!(dao, dao.address(), prepared.plugin, *EXECUTE_PERMISSION_ID);
}

#[test]
fn update_migrates_permissions_and_upgrades_the_proxy() {
    init_test_tracing();
    let mut env = TestFramework::new();
    let mut dao = env.owned_dao(accounts::alice());
    let counter = env.counter;
    let processor_address = env.framework.processor().address();

    let prepared = env
        .install(accounts::alice(), &mut dao, &counter, Vec::new())
        .unwrap();
    let plugin = prepared.plugin;
    assert!(prepared.helpers.is_empty());
    assert_eq!(
        env.framework.proxies().implementation(&plugin),
        Some(CounterSetup.implementation(&Version::new(1, 0, 0)))
    );

    env.publish(&counter, Version::new(1, 1, 0)).unwrap();

    let (processor, registry) = env.framework.processor_mut();
    let update = processor
        .prepare_update(
            accounts::alice(),
            registry,
            dao.address(),
            PrepareUpdate {
                plugin,
                target: Version::new(1, 1, 0),
                current_helpers: Vec::new(),
                data: Vec::new(),
            },
        )
        .unwrap();
    assert_eq!(update.helpers.len(), 1);
    let log = update.helpers[0];
    assert_eq!(
        update.permissions,
        vec![MultiTargetPermission::grant(
            log,
            plugin,
            *WRITE_LOG_PERMISSION_ID
        )]
    );

    let params = ApplyUpdate {
        plugin,
        target: Version::new(1, 1, 0),
        helpers: update.helpers.clone(),
        permissions: update.permissions.clone(),
    };

    // The implementation changes, so the processor needs upgrade authority on the plugin.
    assert_matches!(
        processor.process_update(accounts::alice(), registry, &mut dao, params.clone()),
        Err(QuorumError::Unauthorized { target, who, permission_id, .. })
            if target == plugin
                && who == processor_address
                && permission_id == *UPGRADE_PLUGIN_PERMISSION_ID
    );
    assert_not_granted!(dao, log, plugin, *WRITE_LOG_PERMISSION_ID);

    dao.grant(
        accounts::alice(),
        plugin,
        processor_address,
        *UPGRADE_PLUGIN_PERMISSION_ID,
    )
    .unwrap();
    processor
        .process_update(accounts::alice(), registry, &mut dao, params)
        .unwrap();

    assert_granted!(dao, log, plugin, *WRITE_LOG_PERMISSION_ID);
    assert_eq!(
        processor.proxies().implementation(&plugin),
        Some(CounterSetup.implementation(&Version::new(1, 1, 0)))
    );
    let state = processor.installation(dao.address(), plugin).unwrap();
    assert_eq!(state.version, Version::new(1, 1, 0));
    assert_eq!(state.helpers, vec![log]);
    assert_eq!(state.permissions.len(), 2);
    assert_emitted!(
        processor.events(),
        Event::UpdateProcessed { version, .. } if *version == Version::new(1, 1, 0)
    );

    // Uninstalling after the update removes the migrated grant as well.
    uninstall(&mut env, &mut dao, plugin, vec![log]);
    assert_not_granted!(dao, log, plugin, *WRITE_LOG_PERMISSION_ID);
    assert_not_granted!(dao, dao.address(), plugin, *EXECUTE_PERMISSION_ID);
}

#[test]
fn update_preconditions() {
    let mut env = TestFramework::new();
    let mut dao = env.owned_dao(accounts::alice());
    let counter = env.counter;
    let prepared = env
        .install(accounts::alice(), &mut dao, &counter, Vec::new())
        .unwrap();
    let plugin = prepared.plugin;
    env.publish(&counter, Version::new(1, 0, 1)).unwrap();

    let (processor, registry) = env.framework.processor_mut();
    let request = |target, current_helpers| PrepareUpdate {
        plugin,
        target,
        current_helpers,
        data: Vec::new(),
    };
    let dao_address = dao.address();

    assert_eq!(
        processor.prepare_update(
            accounts::alice(),
            registry,
            dao_address,
            request(Version::new(2, 0, 0), Vec::new())
        ),
        Err(QuorumError::IncompatibleUpdate {
            current: Version::new(1, 0, 0),
            target: Version::new(2, 0, 0),
        })
    );
    assert_matches!(
        processor.prepare_update(
            accounts::alice(),
            registry,
            dao_address,
            request(Version::new(1, 0, 0), Vec::new())
        ),
        Err(QuorumError::IncompatibleUpdate { .. })
    );
    assert_matches!(
        processor.prepare_update(
            accounts::alice(),
            registry,
            dao_address,
            request(Version::new(1, 1, 0), Vec::new())
        ),
        Err(QuorumError::VersionNotFound { .. })
    );
    assert_eq!(
        processor.prepare_update(
            accounts::alice(),
            registry,
            dao_address,
            request(Version::new(1, 0, 1), vec![Address::from_label("stale")])
        ),
        Err(QuorumError::HelpersMismatch { plugin })
    );
    assert_matches!(
        processor.prepare_update(
            accounts::alice(),
            registry,
            Address::from_label("other-dao"),
            request(Version::new(1, 0, 1), Vec::new())
        ),
        Err(QuorumError::PluginNotInstalled { .. })
    );

    // A patch build of the same implementation needs no upgrade authority.
    let update = processor
        .prepare_update(
            accounts::alice(),
            registry,
            dao_address,
            request(Version::new(1, 0, 1), Vec::new()),
        )
        .unwrap();
    assert!(update.permissions.is_empty());
    processor
        .process_update(
            accounts::alice(),
            registry,
            &mut dao,
            ApplyUpdate {
                plugin,
                target: Version::new(1, 0, 1),
                helpers: update.helpers,
                permissions: update.permissions,
            },
        )
        .unwrap();
    assert_eq!(
        processor.installation(dao_address, plugin).unwrap().version,
        Version::new(1, 0, 1)
    );
}

#[test]
fn reinstall_after_a_new_build_repoints_the_proxy() {
    let mut env = TestFramework::new();
    let mut dao = env.owned_dao(accounts::alice());
    let counter = env.counter;
    let processor_address = env.framework.processor().address();

    let first = env
        .install(accounts::alice(), &mut dao, &counter, Vec::new())
        .unwrap();
    let plugin = first.plugin;
    uninstall(&mut env, &mut dao, plugin, Vec::new());
    env.publish(&counter, Version::new(1, 1, 0)).unwrap();

    // The proxy from the first installation still runs the 1.0 build.
    assert_matches!(
        env.install(accounts::alice(), &mut dao, &counter, Vec::new()),
        Err(QuorumError::Unauthorized { target, who, permission_id, .. })
            if target == plugin
                && who == processor_address
                && permission_id == *UPGRADE_PLUGIN_PERMISSION_ID
    );
    assert_not_granted!(dao, dao.address(), plugin, *EXECUTE_PERMISSION_ID);
    assert_eq!(
        env.framework.proxies().implementation(&plugin),
        Some(CounterSetup.implementation(&Version::new(1, 0, 0)))
    );

    dao.grant(
        accounts::alice(),
        plugin,
        processor_address,
        *UPGRADE_PLUGIN_PERMISSION_ID,
    )
    .unwrap();
    let second = env
        .install(accounts::alice(), &mut dao, &counter, Vec::new())
        .unwrap();
    assert_eq!(second.plugin, plugin);

    let state = env.installation(&dao, plugin).unwrap();
    assert_eq!(state.version, Version::new(1, 1, 0));
    assert_eq!(
        env.framework.proxies().implementation(&plugin),
        Some(CounterSetup.implementation(&state.version))
    );
    assert_granted!(dao, second.helpers[0], plugin, *WRITE_LOG_PERMISSION_ID);
}
