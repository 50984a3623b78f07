//! `sb show` — full details for one module.

use std::io::Write;
use std::path::Path;

use clap::Args;
use serde::Serialize;

use crate::output::{OutputMode, fail, render};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Module key.
    pub key: String,
}

#[derive(Debug, Serialize)]
struct ShowOutput {
    key: String,
    name: String,
    description: Option<String>,
    group: String,
    icon: Option<String>,
    sort_order: i64,
    is_active: bool,
    is_system: bool,
    on_deactivate: String,
    parent: Option<String>,
    metadata: Option<serde_json::Value>,
    requires: Vec<String>,
    required_by: Vec<String>,
    suggests: Vec<String>,
}

pub fn run(args: &ShowArgs, output: OutputMode, db: &Path, config: Option<&Path>) -> anyhow::Result<()> {
    let manager = super::open_manager(db, config)?;

    let module = match manager.get(&args.key) {
        Ok(module) => module,
        Err(e) => return Err(fail(output, e)),
    };
    let requires = manager.dependencies(&args.key)?;
    let required_by = manager.dependents(&args.key)?;
    let suggests = manager.suggestions(&args.key)?;

    let result = ShowOutput {
        key: module.key,
        name: module.name,
        description: module.description,
        group: module.group,
        icon: module.icon,
        sort_order: module.sort_order,
        is_active: module.is_active,
        is_system: module.is_system,
        on_deactivate: module.on_deactivate.to_string(),
        parent: module.parent,
        metadata: module.metadata,
        requires: requires.into_iter().map(|m| m.key).collect(),
        required_by: required_by.into_iter().map(|m| m.key).collect(),
        suggests: suggests.into_iter().map(|m| m.key).collect(),
    };

    render(output, &result, |r, w| {
        writeln!(w, "{} — {}", r.key, r.name)?;
        if let Some(ref description) = r.description {
            writeln!(w, "  {description}")?;
        }
        writeln!(w, "  group:         {}", r.group)?;
        writeln!(
            w,
            "  state:         {}{}",
            if r.is_active { "active" } else { "inactive" },
            if r.is_system { " (system)" } else { "" }
        )?;
        writeln!(w, "  on_deactivate: {}", r.on_deactivate)?;
        if let Some(ref parent) = r.parent {
            writeln!(w, "  parent:        {parent}")?;
        }
        if !r.requires.is_empty() {
            writeln!(w, "  requires:      {}", r.requires.join(", "))?;
        }
        if !r.required_by.is_empty() {
            writeln!(w, "  required by:   {}", r.required_by.join(", "))?;
        }
        if !r.suggests.is_empty() {
            writeln!(w, "  suggests:      {}", r.suggests.join(", "))?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: ShowArgs,
    }

    #[test]
    fn parses_key() {
        let w = Wrapper::parse_from(["test", "shop"]);
        assert_eq!(w.args.key, "shop");
    }

    #[test]
    fn unknown_module_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = dir.path().join("registry.db");
        let args = ShowArgs { key: "ghost".into() };
        assert!(run(&args, OutputMode::Human, &db, None).is_err());
    }
}
