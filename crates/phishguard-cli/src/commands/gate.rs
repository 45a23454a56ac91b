//! `phishguard gate` -- show the navigation gate decision.
//!
//! # Example
//!
//! ```text
//! phishguard gate https://mail.google.com/x
//! phishguard gate https://evil.tk --mark
//! ```

use std::path::PathBuf;

use clap::Args;
use phishguard_core::config_loader::load_config;
use phishguard_core::gate::{FrameKind, GateDecision, NavigationGate};

/// Arguments for the `phishguard gate` subcommand.
#[derive(Args)]
pub struct GateArgs {
    /// URL being navigated to.
    pub url: String,

    /// Treat the navigation as happening in a sub-frame.
    #[arg(long)]
    pub sub_frame: bool,

    /// Also print the URL with the verified marker appended.
    #[arg(long)]
    pub mark: bool,

    /// Config file path (overrides auto-discovery).
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Run the gate command.
pub async fn run(args: GateArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref()).await?;
    let gate = NavigationGate::new(&config.gate);

    let frame = if args.sub_frame {
        FrameKind::Sub
    } else {
        FrameKind::Main
    };
    match gate.decide(&args.url, frame) {
        GateDecision::Intercept => println!("intercept"),
        GateDecision::Skip(reason) => println!("skip: {reason:?}"),
    }

    if args.mark {
        println!("{}", gate.mark_verified(&args.url));
    }
    Ok(())
}
