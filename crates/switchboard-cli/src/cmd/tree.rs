//! `sb tree` — render the module hierarchy.

use std::io::Write;
use std::path::Path;

use clap::Args;

use switchboard_core::graph::tree::TreeNode;

use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Only show trees rooted in this group.
    #[arg(long)]
    pub group: Option<String>,
}

pub fn run(args: &TreeArgs, output: OutputMode, db: &Path, config: Option<&Path>) -> anyhow::Result<()> {
    let manager = super::open_manager(db, config)?;
    let tree = manager.tree(args.group.as_deref())?;

    render(output, &tree, |nodes, w| {
        if nodes.is_empty() {
            return writeln!(w, "no modules defined");
        }
        render_nodes(nodes, w)
    })
}

fn render_nodes(nodes: &[TreeNode], w: &mut dyn Write) -> std::io::Result<()> {
    for node in nodes {
        let indent = "  ".repeat(node.depth);
        let state = if node.is_active { " [active]" } else { "" };
        let system = if node.is_system { " (system)" } else { "" };
        writeln!(w, "{indent}- {} — {}{state}{system}", node.key, node.name)?;
        render_nodes(&node.children, w)?;
    }
    Ok(())
}
