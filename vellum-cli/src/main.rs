//! Vellum — Markdown-to-content-store publishing CLI.
//!
//! # Usage
//!
//! ```text
//! vellum init [<path>] --service <url> --repo <authority>
//! vellum publish [--root <path>] [--dry-run] [--force]
//! vellum status [--root <path>] [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{init::InitArgs, publish::PublishArgs, status::StatusArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "vellum",
    version,
    about = "Publish a Markdown collection to an AT-style content store",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scaffold vellum.yaml and the content directory.
    Init(InitArgs),

    /// Reconcile the local collection against the remote store.
    Publish(PublishArgs),

    /// Show pending changes without contacting the remote store.
    Status(StatusArgs),
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Publish(args) => args.run(),
        Commands::Status(args) => args.run(),
    }
}
