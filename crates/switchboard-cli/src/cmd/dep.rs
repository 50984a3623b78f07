//! `sb dep` — author dependency edges between modules.
//!
//! Subcommands:
//! - `sb dep require <module> <dependency>` — REQUIRES edge (cycle-checked)
//! - `sb dep conflict <module> <other>` — symmetric CONFLICTS pair
//! - `sb dep suggest <module> <suggestion>` — advisory SUGGESTS edge

use std::io::Write;
use std::path::Path;

use clap::{Args, Subcommand};
use serde::Serialize;

use crate::output::{OutputMode, fail, render};

#[derive(Args, Debug)]
pub struct DepArgs {
    #[command(subcommand)]
    pub command: DepCommand,
}

#[derive(Subcommand, Debug)]
pub enum DepCommand {
    #[command(
        about = "Record that a module requires another",
        after_help = "EXAMPLES:\n    # checkout needs cart active\n    sb dep require checkout cart"
    )]
    Require(EdgePair),

    #[command(
        about = "Record a symmetric conflict between two modules",
        after_help = "EXAMPLES:\n    # the two UIs can never be active together\n    sb dep conflict new_ui old_ui"
    )]
    Conflict(EdgePair),

    #[command(
        about = "Record an advisory suggestion",
        after_help = "EXAMPLES:\n    # blog works better with seo\n    sb dep suggest blog seo"
    )]
    Suggest(EdgePair),
}

#[derive(Args, Debug)]
pub struct EdgePair {
    /// Source module key.
    pub module: String,
    /// Target module key.
    pub target: String,
}

#[derive(Debug, Serialize)]
struct DepOutput {
    ok: bool,
    module: String,
    target: String,
    kind: String,
}

pub fn run(args: &DepArgs, output: OutputMode, db: &Path, config: Option<&Path>) -> anyhow::Result<()> {
    let mut manager = super::open_manager(db, config)?;

    let (pair, kind, verb) = match &args.command {
        DepCommand::Require(pair) => (pair, "requires", "requires"),
        DepCommand::Conflict(pair) => (pair, "conflicts", "conflicts with"),
        DepCommand::Suggest(pair) => (pair, "suggests", "suggests"),
    };

    let result = match &args.command {
        DepCommand::Require(_) => manager.requires(&pair.module, &pair.target),
        DepCommand::Conflict(_) => manager.conflicts(&pair.module, &pair.target),
        DepCommand::Suggest(_) => manager.suggests(&pair.module, &pair.target),
    };
    if let Err(e) = result {
        return Err(fail(output, e));
    }

    let out = DepOutput {
        ok: true,
        module: pair.module.clone(),
        target: pair.target.clone(),
        kind: kind.to_string(),
    };
    render(output, &out, |r, w| {
        writeln!(w, "✓ {} {verb} {}", r.module, r.target)
    })
}
