//! `sb list` — list modules with their activation state.

use std::io::Write;
use std::path::Path;

use clap::Args;
use serde::Serialize;

use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only list modules in this group.
    #[arg(long)]
    pub group: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListRow {
    key: String,
    name: String,
    group: String,
    is_active: bool,
    is_system: bool,
    on_deactivate: String,
}

pub fn run(args: &ListArgs, output: OutputMode, db: &Path, config: Option<&Path>) -> anyhow::Result<()> {
    let manager = super::open_manager(db, config)?;

    let modules = match args.group.as_deref() {
        Some(group) => manager.in_group(group)?,
        None => manager.all()?,
    };

    let rows: Vec<ListRow> = modules
        .into_iter()
        .map(|module| ListRow {
            key: module.key,
            name: module.name,
            group: module.group,
            is_active: module.is_active,
            is_system: module.is_system,
            on_deactivate: module.on_deactivate.to_string(),
        })
        .collect();

    render(output, &rows, |rows, w| {
        if rows.is_empty() {
            return writeln!(w, "no modules defined");
        }
        for row in rows {
            let state = if row.is_active { "active" } else { "inactive" };
            let system = if row.is_system { " (system)" } else { "" };
            writeln!(
                w,
                "{:<24} {:<10} [{}] {}{}",
                row.key, row.group, state, row.name, system
            )?;
        }
        Ok(())
    })
}
