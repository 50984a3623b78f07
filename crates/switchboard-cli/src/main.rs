#![forbid(unsafe_code)]

mod cmd;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use output::OutputMode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "switchboard: dependency-aware feature module registry",
    long_about = None
)]
struct Cli {
    /// Registry database file (falls back to $SWITCHBOARD_DB, then ./switchboard.db).
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Config file (defaults to ./switchboard.toml when present).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-error logging.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Read",
        about = "List modules",
        after_help = "EXAMPLES:\n    # List every module\n    sb list\n\n    # Only one group, as JSON\n    sb list --group commerce --json"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show the module hierarchy",
        after_help = "EXAMPLES:\n    # Full tree\n    sb tree\n\n    # Trees rooted in one group\n    sb tree --group commerce"
    )]
    Tree(cmd::tree::TreeArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show one module in detail",
        after_help = "EXAMPLES:\n    sb show checkout"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Read",
        about = "Explain why a module can or cannot transition",
        after_help = "EXAMPLES:\n    # Why can't it be activated?\n    sb why checkout\n\n    # Why can't it be deactivated?\n    sb why payments --deactivate"
    )]
    Why(cmd::why::WhyArgs),

    #[command(
        next_help_heading = "Read",
        about = "List distinct module groups",
        after_help = "EXAMPLES:\n    sb groups"
    )]
    Groups(cmd::groups::GroupsArgs),

    #[command(
        next_help_heading = "Transitions",
        about = "Activate a module",
        after_help = "EXAMPLES:\n    sb activate checkout"
    )]
    Activate(cmd::toggle::ActivateArgs),

    #[command(
        next_help_heading = "Transitions",
        about = "Deactivate a module (cascading per its policy)",
        after_help = "EXAMPLES:\n    sb deactivate payments"
    )]
    Deactivate(cmd::toggle::DeactivateArgs),

    #[command(
        next_help_heading = "Transitions",
        about = "Toggle a module and print the resulting state",
        after_help = "EXAMPLES:\n    sb toggle beta_search"
    )]
    Toggle(cmd::toggle::ToggleArgs),

    #[command(next_help_heading = "Authoring", about = "Manage dependency edges")]
    Dep(cmd::dep::DepArgs),

    #[command(
        next_help_heading = "Authoring",
        about = "Apply a declarative module manifest",
        after_help = "EXAMPLES:\n    # Apply ./modules.toml\n    sb sync\n\n    # Apply a specific manifest\n    sb sync --file deploy/modules.toml"
    )]
    Sync(cmd::sync::SyncArgs),
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let output = cli.output_mode();
    let db = cmd::resolve_db_path(cli.db.as_deref());
    let config = cli.config.as_deref();

    match &cli.command {
        Commands::List(args) => cmd::list::run(args, output, &db, config),
        Commands::Tree(args) => cmd::tree::run(args, output, &db, config),
        Commands::Show(args) => cmd::show::run(args, output, &db, config),
        Commands::Why(args) => cmd::why::run(args, output, &db, config),
        Commands::Groups(args) => cmd::groups::run(args, output, &db, config),
        Commands::Activate(args) => cmd::toggle::run_activate(args, output, &db, config),
        Commands::Deactivate(args) => cmd::toggle::run_deactivate(args, output, &db, config),
        Commands::Toggle(args) => cmd::toggle::run_toggle(args, output, &db, config),
        Commands::Dep(args) => cmd::dep::run(args, output, &db, config),
        Commands::Sync(args) => cmd::sync::run(args, output, &db, config),
    }
}
