//! Cascade atomicity: a failure mid-cascade must roll the whole unit back.

use rusqlite::Connection;
use switchboard_core::{DeactivationPolicy, DefineOptions, ManagerConfig, ModuleManager};

fn define_active(mgr: &mut ModuleManager, key: &str, policy: DeactivationPolicy) {
    mgr.define(
        key,
        key,
        DefineOptions {
            is_active: true,
            on_deactivate: Some(policy),
            ..DefineOptions::default()
        },
    )
    .expect("define");
}

/// Build p ← d1 ← d2 (d1 requires p, d2 requires d1), all active, CASCADE on p.
fn cascade_chain(mgr: &mut ModuleManager) {
    define_active(mgr, "p", DeactivationPolicy::Cascade);
    define_active(mgr, "d1", DeactivationPolicy::Restrict);
    define_active(mgr, "d2", DeactivationPolicy::Restrict);
    mgr.requires("d1", "p").expect("link d1→p");
    mgr.requires("d2", "d1").expect("link d2→d1");
}

#[test]
fn cascade_commits_all_or_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("registry.db");

    let mut mgr = ModuleManager::open(&db_path, ManagerConfig::default()).expect("open");
    cascade_chain(&mut mgr);

    // Inject a failure on the *second* cascade flip (d2 flips first, then
    // d1): by then one module has already flipped inside the transaction.
    let saboteur = Connection::open(&db_path).expect("second connection");
    saboteur
        .execute_batch(
            "CREATE TRIGGER fail_mid_cascade BEFORE UPDATE ON modules \
             WHEN NEW.key = 'd1' AND NEW.is_active = 0 \
             BEGIN SELECT RAISE(ABORT, 'injected mid-cascade failure'); END;",
        )
        .expect("install trigger");

    let err = mgr.deactivate("p").unwrap_err();
    let chain = format!("{err:?}");
    assert!(
        chain.contains("injected"),
        "failure surfaces to the caller: {chain}"
    );

    // No partial cascade is observable: every module is still active.
    for key in ["p", "d1", "d2"] {
        assert!(
            mgr.is_active(key).expect("status"),
            "{key} must remain active after rollback"
        );
    }

    // Remove the fault; the same operation now commits as one unit.
    saboteur
        .execute_batch("DROP TRIGGER fail_mid_cascade;")
        .expect("drop trigger");
    drop(saboteur);

    mgr.deactivate("p").expect("cascade commits");
    for key in ["p", "d1", "d2"] {
        assert!(
            !mgr.is_active(key).expect("status"),
            "{key} inactive after commit"
        );
    }
}

#[test]
fn failed_cascade_does_not_poison_the_cache() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("registry.db");

    let mut mgr = ModuleManager::open(&db_path, ManagerConfig::default()).expect("open");
    cascade_chain(&mut mgr);

    // Prime the status cache.
    assert!(mgr.is_active("d2").expect("status"));

    let saboteur = Connection::open(&db_path).expect("second connection");
    saboteur
        .execute_batch(
            "CREATE TRIGGER fail_any_flip BEFORE UPDATE ON modules \
             WHEN NEW.is_active = 0 \
             BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
        )
        .expect("install trigger");

    assert!(mgr.deactivate("p").is_err());

    // Status reads still agree with the (unchanged) store.
    for key in ["p", "d1", "d2"] {
        assert!(mgr.is_active(key).expect("status"), "{key} still active");
    }
}
