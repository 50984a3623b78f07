//! `sb activate` / `sb deactivate` / `sb toggle` — transition commands.

use std::io::Write;
use std::path::Path;

use clap::Args;
use serde::Serialize;

use crate::output::{OutputMode, fail, render};

#[derive(Args, Debug)]
pub struct ActivateArgs {
    /// Module key.
    pub key: String,
}

#[derive(Args, Debug)]
pub struct DeactivateArgs {
    /// Module key.
    pub key: String,
}

#[derive(Args, Debug)]
pub struct ToggleArgs {
    /// Module key.
    pub key: String,
}

#[derive(Debug, Serialize)]
struct TransitionOutput {
    ok: bool,
    key: String,
    is_active: bool,
}

fn report(output: OutputMode, key: &str, is_active: bool) -> anyhow::Result<()> {
    let result = TransitionOutput {
        ok: true,
        key: key.to_string(),
        is_active,
    };
    render(output, &result, |r, w| {
        writeln!(
            w,
            "✓ {} is now {}",
            r.key,
            if r.is_active { "active" } else { "inactive" }
        )
    })
}

pub fn run_activate(
    args: &ActivateArgs,
    output: OutputMode,
    db: &Path,
    config: Option<&Path>,
) -> anyhow::Result<()> {
    let mut manager = super::open_manager(db, config)?;
    match manager.activate(&args.key) {
        Ok(()) => report(output, &args.key, true),
        Err(e) => Err(fail(output, e)),
    }
}

pub fn run_deactivate(
    args: &DeactivateArgs,
    output: OutputMode,
    db: &Path,
    config: Option<&Path>,
) -> anyhow::Result<()> {
    let mut manager = super::open_manager(db, config)?;
    match manager.deactivate(&args.key) {
        Ok(()) => report(output, &args.key, false),
        Err(e) => Err(fail(output, e)),
    }
}

pub fn run_toggle(
    args: &ToggleArgs,
    output: OutputMode,
    db: &Path,
    config: Option<&Path>,
) -> anyhow::Result<()> {
    let mut manager = super::open_manager(db, config)?;
    match manager.toggle(&args.key) {
        Ok(is_active) => report(output, &args.key, is_active),
        Err(e) => Err(fail(output, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use switchboard_core::{DefineOptions, ManagerConfig, ModuleManager};

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: ToggleArgs,
    }

    #[test]
    fn parses_key() {
        let w = Wrapper::parse_from(["test", "shop"]);
        assert_eq!(w.args.key, "shop");
    }

    #[test]
    fn activate_deactivate_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = dir.path().join("registry.db");
        {
            let mut mgr = ModuleManager::open(&db, ManagerConfig::default()).expect("open");
            mgr.define("shop", "Shop", DefineOptions::default()).expect("define");
        }

        run_activate(
            &ActivateArgs { key: "shop".into() },
            OutputMode::Human,
            &db,
            None,
        )
        .expect("activate");

        let mgr = ModuleManager::open(&db, ManagerConfig::default()).expect("open");
        assert!(mgr.is_active("shop").expect("status"));
        drop(mgr);

        run_deactivate(
            &DeactivateArgs { key: "shop".into() },
            OutputMode::Human,
            &db,
            None,
        )
        .expect("deactivate");

        let mgr = ModuleManager::open(&db, ManagerConfig::default()).expect("open");
        assert!(!mgr.is_active("shop").expect("status"));
    }

    #[test]
    fn blocked_activation_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = dir.path().join("registry.db");
        {
            let mut mgr = ModuleManager::open(&db, ManagerConfig::default()).expect("open");
            mgr.define("checkout", "Checkout", DefineOptions::default()).expect("define");
            mgr.define("cart", "Cart", DefineOptions::default()).expect("define");
            mgr.requires("checkout", "cart").expect("link");
        }

        let result = run_activate(
            &ActivateArgs {
                key: "checkout".into(),
            },
            OutputMode::Human,
            &db,
            None,
        );
        assert!(result.is_err());
    }
}
