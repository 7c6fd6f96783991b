//! keepsync: keep local checkouts in sync with their remotes.
//!
//! # Usage
//!
//! ```text
//! keepsync run   [CONFIG]          # daemon; final pass on SIGINT/SIGTERM
//! keepsync once  [CONFIG]          # one sequential pass, then exit
//! keepsync check [CONFIG] [--json] # validate configuration
//! ```
//!
//! `CONFIG` defaults to `./config.toml`, then `<config dir>/keepsync/config.toml`.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{check::CheckArgs, once::OnceArgs, run::RunArgs};

#[derive(Parser, Debug)]
#[command(
    name = "keepsync",
    version,
    about = "Pull or push a fixed set of git checkouts on a timer",
    long_about = None,
)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the synchronization daemon in the foreground.
    Run(RunArgs),

    /// Reconcile every repository once, in configuration order.
    Once(OnceArgs),

    /// Validate configuration and show the configured repositories.
    Check(CheckArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    keepsync_daemon::init_tracing(cli.json_logs);
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Once(args) => args.run(),
        Commands::Check(args) => args.run(),
    }
}
