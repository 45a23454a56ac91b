//! `phishguard scan` -- classify a page.
//!
//! Applies the navigation gate first (unless `--force`), then sends the
//! URL and optional saved HTML through the request router and prints the
//! verdict.
//!
//! # Example
//!
//! ```text
//! phishguard scan https://example.com/login --content saved.html
//! phishguard scan http://192.168.1.1/login --page-scan --json
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use phishguard_core::config_loader::load_config;
use phishguard_core::gate::{FrameKind, GateDecision, NavigationGate};
use phishguard_core::pipeline::Predictor;
use phishguard_services::router::{RequestKind, RequestRouter};
use phishguard_types::verdict::Verdict;
use tracing::{debug, info};

use super::read_content;

/// Arguments for the `phishguard scan` subcommand.
#[derive(Args)]
pub struct ScanArgs {
    /// URL to classify.
    pub url: String,

    /// File holding the page's HTML.
    #[arg(long)]
    pub content: Option<PathBuf>,

    /// Config file path (overrides auto-discovery).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Use the page-scan deadline instead of the interactive one.
    #[arg(long)]
    pub page_scan: bool,

    /// Classify even when the gate would let the URL through.
    #[arg(long)]
    pub force: bool,

    /// Print the verdict as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Run the scan command.
pub async fn run(args: ScanArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref()).await?;
    match &args.config {
        Some(path) => debug!(path = %path.display(), "loaded config file"),
        None => debug!("using discovered config"),
    }

    if !args.force {
        let gate = NavigationGate::new(&config.gate);
        if let GateDecision::Skip(reason) = gate.decide(&args.url, FrameKind::Main) {
            debug!(url = %args.url, ?reason, "gate let navigation through");
            println!("skipped: {reason:?} (use --force to classify anyway)");
            return Ok(());
        }
    }

    let content = read_content(args.content.as_deref()).await?;
    let predictor = Arc::new(Predictor::from_config(&config));
    let router = RequestRouter::local(predictor, config.router.clone()).await;

    let verdict = router
        .predict(&args.url, &content, request_kind(args.page_scan))
        .await?;
    info!(
        url = %args.url,
        tier = %verdict.tier,
        percentage = verdict.percentage,
        "scan complete"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    } else {
        print_verdict(&args.url, &verdict);
    }
    Ok(())
}

fn request_kind(page_scan: bool) -> RequestKind {
    if page_scan {
        RequestKind::PageScan
    } else {
        RequestKind::Interactive
    }
}

fn print_verdict(url: &str, verdict: &Verdict) {
    println!("URL:    {url}");
    println!("Score:  {:.4}", verdict.score);
    println!("Risk:   {}%", verdict.percentage);
    println!("Tier:   {}", verdict.tier);
}
