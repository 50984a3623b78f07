//! `sb why` — advisory: why can't a module be (de)activated?

use std::io::Write;
use std::path::Path;

use clap::Args;
use serde::Serialize;

use switchboard_core::{ActivationAdvice, DeactivationAdvice};

use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct WhyArgs {
    /// Module key.
    pub key: String,

    /// Explain deactivation instead of activation.
    #[arg(long)]
    pub deactivate: bool,
}

#[derive(Debug, Serialize)]
struct WhyOutput {
    key: String,
    operation: &'static str,
    found: bool,
    permitted: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing_dependencies: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    conflicts: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    system_module: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    active_dependents: Vec<String>,
}

pub fn run(args: &WhyArgs, output: OutputMode, db: &Path, config: Option<&Path>) -> anyhow::Result<()> {
    let manager = super::open_manager(db, config)?;

    let result = if args.deactivate {
        match manager.why_cant_deactivate(&args.key)? {
            DeactivationAdvice::UnknownModule => WhyOutput {
                key: args.key.clone(),
                operation: "deactivate",
                found: false,
                permitted: false,
                missing_dependencies: Vec::new(),
                conflicts: Vec::new(),
                system_module: false,
                active_dependents: Vec::new(),
            },
            DeactivationAdvice::Issues(issues) => WhyOutput {
                key: args.key.clone(),
                operation: "deactivate",
                found: true,
                permitted: issues.is_clear(),
                missing_dependencies: Vec::new(),
                conflicts: Vec::new(),
                system_module: issues.system_module,
                active_dependents: issues.active_dependents,
            },
        }
    } else {
        match manager.why_cant_activate(&args.key)? {
            ActivationAdvice::UnknownModule => WhyOutput {
                key: args.key.clone(),
                operation: "activate",
                found: false,
                permitted: false,
                missing_dependencies: Vec::new(),
                conflicts: Vec::new(),
                system_module: false,
                active_dependents: Vec::new(),
            },
            ActivationAdvice::Issues(issues) => WhyOutput {
                key: args.key.clone(),
                operation: "activate",
                found: true,
                permitted: issues.is_clear(),
                missing_dependencies: issues.missing_dependencies,
                conflicts: issues.conflicts,
                system_module: false,
                active_dependents: Vec::new(),
            },
        }
    };

    render(output, &result, |r, w| {
        if !r.found {
            return writeln!(w, "{}: no such module", r.key);
        }
        if r.permitted {
            return writeln!(w, "{} can be {}d", r.key, r.operation);
        }
        writeln!(w, "{} cannot be {}d:", r.key, r.operation)?;
        if !r.missing_dependencies.is_empty() {
            writeln!(w, "  missing dependencies: {}", r.missing_dependencies.join(", "))?;
        }
        if !r.conflicts.is_empty() {
            writeln!(w, "  active conflicts: {}", r.conflicts.join(", "))?;
        }
        if r.system_module {
            writeln!(w, "  system module: deactivation is never allowed")?;
        }
        if !r.active_dependents.is_empty() {
            writeln!(w, "  active dependents: {}", r.active_dependents.join(", "))?;
        }
        Ok(())
    })
}
