//! `sb groups` — list the distinct module groups.

use std::io::Write;
use std::path::Path;

use clap::Args;

use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct GroupsArgs {}

pub fn run(_args: &GroupsArgs, output: OutputMode, db: &Path, config: Option<&Path>) -> anyhow::Result<()> {
    let manager = super::open_manager(db, config)?;
    let groups = manager.groups()?;

    render(output, &groups, |groups, w| {
        if groups.is_empty() {
            return writeln!(w, "no groups defined");
        }
        for group in groups {
            writeln!(w, "{group}")?;
        }
        Ok(())
    })
}
