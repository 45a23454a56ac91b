//! CLI command implementations for `phishguard`.
//!
//! - [`scan`] -- Full classification through the request router.
//! - [`gate`] -- Navigation gate decision.
//! - [`features`] -- Feature vector dump.

pub mod features;
pub mod gate;
pub mod scan;

use std::path::Path;

use anyhow::Context;

/// Read saved page HTML, or return an empty string when no file is given.
pub async fn read_content(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(p) => tokio::fs::read_to_string(p)
            .await
            .with_context(|| format!("failed to read content from {}", p.display())),
        None => Ok(String::new()),
    }
}
