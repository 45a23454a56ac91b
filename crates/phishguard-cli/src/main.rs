//! `phishguard` -- CLI binary for the phishguard page classifier.
//!
//! Provides the following subcommands:
//!
//! - `phishguard scan` -- Classify a URL (and optionally its saved HTML).
//! - `phishguard gate` -- Show whether a navigation would be intercepted.
//! - `phishguard features` -- Print the extracted feature vector.

use clap::{Parser, Subcommand};

mod commands;

/// phishguard page classifier CLI.
#[derive(Parser)]
#[command(name = "phishguard", about = "phishguard page classifier CLI", version)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Classify a page and print its verdict.
    Scan(commands::scan::ScanArgs),

    /// Show the navigation gate decision for a URL.
    Gate(commands::gate::GateArgs),

    /// Print the named feature vector for a URL.
    Features(commands::features::FeaturesArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    match cli.command {
        Commands::Scan(args) => commands::scan::run(args).await?,
        Commands::Gate(args) => commands::gate::run(args).await?,
        Commands::Features(args) => commands::features::run(args).await?,
    }

    Ok(())
}
