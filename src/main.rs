// tree-sync
// Compare directory trees by content hash and repair them with rsync

// IMPORTS ------------------>>

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

use tree_sync::core::{Config, DEFAULT_CONFIG_PATH};
use tree_sync::logging::{self, LogTarget};
use tree_sync::report::run_headless;
use tree_sync::ui::run_tui;

//--------------------------------------------------------<<
// CLI ------------------>>

/// Compare local and remote directory trees and copy over what differs
#[derive(Parser, Debug)]
#[command(name = "tree-sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file listing the directory pairs
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Print every pair as plain text and exit
    #[arg(long)]
    no_tui: bool,

    /// Repair every pair before printing the report
    #[arg(long, requires = "no_tui")]
    sync: bool,

    /// Append logs to this file (overrides `log_file` from the configuration)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

//--------------------------------------------------------<<

// ┌──────────────────────────────────────────────────────────────────────────────────────────────────────────────────┐
// │                                                 MAIN ENTRY POINT                                                 │
// └──────────────────────────────────────────────────────────────────────────────────────────────────────────────────┘

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging depends on the configured log file, so the config is read first
    let config = Config::load(&cli.config)?;
    let interactive = !cli.no_tui;
    let log_file = cli.log_file.clone().or_else(|| config.log_file.clone());
    logging::init(&LogTarget::select(interactive, log_file))?;

    config.report_problems();
    debug!(config = %cli.config.display(), interactive, sync = cli.sync, "starting");

    if interactive {
        run_tui(config).await
    } else {
        run_headless(config, cli.sync).await
    }
}
