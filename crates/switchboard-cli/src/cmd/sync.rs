//! `sb sync` — apply a declarative module manifest.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;

use switchboard_core::sync::{load_manifest, sync};

use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Manifest file to apply.
    #[arg(long, default_value = "modules.toml")]
    pub file: PathBuf,
}

#[derive(Debug, Serialize)]
struct SyncOutput {
    ok: bool,
    defined: Vec<String>,
    skipped: Vec<String>,
    edge_failures: Vec<SyncEdgeFailure>,
}

#[derive(Debug, Serialize)]
struct SyncEdgeFailure {
    module: String,
    target: String,
    kind: String,
    reason: String,
}

pub fn run(args: &SyncArgs, output: OutputMode, db: &Path, config: Option<&Path>) -> anyhow::Result<()> {
    let manifest = load_manifest(&args.file)?;
    let mut manager = super::open_manager(db, config)?;

    let report = sync(&mut manager, &manifest)?;

    let result = SyncOutput {
        ok: true,
        defined: report.defined,
        skipped: report.skipped,
        edge_failures: report
            .edge_failures
            .into_iter()
            .map(|f| SyncEdgeFailure {
                module: f.module,
                target: f.target,
                kind: f.kind.to_string(),
                reason: f.reason,
            })
            .collect(),
    };

    render(output, &result, |r, w| {
        writeln!(w, "✓ synced {} modules", r.defined.len())?;
        for key in &r.skipped {
            writeln!(w, "  skipped {key}: parent never defined")?;
        }
        for failure in &r.edge_failures {
            writeln!(
                w,
                "  skipped edge {} {} {}: {}",
                failure.module, failure.kind, failure.target, failure.reason
            )?;
        }
        Ok(())
    })
}
