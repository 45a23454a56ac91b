//! `phishguard features` -- print the extracted feature vector.
//!
//! Shows the raw (unscaled) values in model input order.

use std::path::PathBuf;

use clap::Args;
use phishguard_core::features::FeatureExtractor;

use super::read_content;

/// Arguments for the `phishguard features` subcommand.
#[derive(Args)]
pub struct FeaturesArgs {
    /// URL to extract features from.
    pub url: String,

    /// File holding the page's HTML.
    #[arg(long)]
    pub content: Option<PathBuf>,

    /// Print as a JSON object keyed by feature name.
    #[arg(long)]
    pub json: bool,
}

/// Run the features command.
pub async fn run(args: FeaturesArgs) -> anyhow::Result<()> {
    let content = read_content(args.content.as_deref()).await?;
    let vector = FeatureExtractor::new().extract(&args.url, &content);

    if args.json {
        let map: serde_json::Map<String, serde_json::Value> = vector
            .named()
            .map(|(name, value)| (name.to_string(), serde_json::json!(value)))
            .collect();
        println!("{}", serde_json::to_string_pretty(&map)?);
    } else {
        for (i, (name, value)) in vector.named().enumerate() {
            println!("{:>2}  {name:<28} {value}", i + 1);
        }
    }
    Ok(())
}
