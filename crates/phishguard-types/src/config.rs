//! Configuration schema types.
//!
//! All structs accept both `snake_case` and `camelCase` field names in
//! JSON via `#[serde(alias)]`. Unknown fields are ignored and every field
//! has a default, so an empty object `{}` is a valid configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GuardConfig {
    /// Locations of the model and scaler artifacts.
    #[serde(default)]
    pub artifacts: ArtifactConfig,

    /// Request deadlines.
    #[serde(default)]
    pub router: RouterConfig,

    /// Navigation interception policy.
    #[serde(default)]
    pub gate: GateConfig,
}

impl GuardConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(|e| crate::GuardError::Config(e.to_string()))
    }
}

// ── Artifacts ────────────────────────────────────────────────────────────

/// Paths of the persisted inference artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Model description file.
    #[serde(default = "default_model_path", alias = "modelPath")]
    pub model_path: PathBuf,

    /// `{mean: [..50], std: [..50]}` file.
    #[serde(default = "default_scaler_path", alias = "scalerPath")]
    pub scaler_path: PathBuf,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/model.json")
}
fn default_scaler_path() -> PathBuf {
    PathBuf::from("models/scaler_params.json")
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            scaler_path: default_scaler_path(),
        }
    }
}

// ── Router ───────────────────────────────────────────────────────────────

/// Deadlines applied by the request router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Deadline for interactive (popup) requests.
    #[serde(default = "default_interactive_timeout_ms", alias = "interactiveTimeoutMs")]
    pub interactive_timeout_ms: u64,

    /// Deadline for full-page scan requests.
    #[serde(default = "default_page_scan_timeout_ms", alias = "pageScanTimeoutMs")]
    pub page_scan_timeout_ms: u64,
}

fn default_interactive_timeout_ms() -> u64 {
    10_000
}
fn default_page_scan_timeout_ms() -> u64 {
    15_000
}

impl RouterConfig {
    /// Deadline for interactive requests as a [`Duration`].
    pub fn interactive_timeout(&self) -> Duration {
        Duration::from_millis(self.interactive_timeout_ms)
    }

    /// Deadline for page-scan requests as a [`Duration`].
    pub fn page_scan_timeout(&self) -> Duration {
        Duration::from_millis(self.page_scan_timeout_ms)
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            interactive_timeout_ms: default_interactive_timeout_ms(),
            page_scan_timeout_ms: default_page_scan_timeout_ms(),
        }
    }
}

// ── Gate ─────────────────────────────────────────────────────────────────

/// Which navigations are exempt from classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Hosts exempt by exact or subdomain match (e.g. `google.com`).
    #[serde(default, alias = "trustedDomains")]
    pub trusted_domains: Vec<String>,

    /// Host suffixes exempt by label-aligned suffix match (e.g. `go.id`).
    #[serde(default, alias = "trustedTlds")]
    pub trusted_tlds: Vec<String>,

    /// Fragment token appended after the user chose to proceed.
    #[serde(default = "default_verified_marker", alias = "verifiedMarker")]
    pub verified_marker: String,
}

fn default_verified_marker() -> String {
    "phishguard-verified".into()
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            trusted_domains: Vec::new(),
            trusted_tlds: Vec::new(),
            verified_marker: default_verified_marker(),
        }
    }
}
