//! Configuration file discovery and loading.
//!
//! The discovery order is:
//! 1. An explicit path passed by the caller.
//! 2. The `PHISHGUARD_CONFIG` environment variable.
//! 3. `./phishguard.json` in the working directory.
//! 4. If none found, the built-in defaults.
//!
//! A path named explicitly (argument or environment) must exist; the
//! working-directory file is optional.

use std::path::{Path, PathBuf};

use phishguard_types::config::GuardConfig;
use phishguard_types::{GuardError, Result};
use tracing::{debug, info};

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "PHISHGUARD_CONFIG";

/// File name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "phishguard.json";

/// Where the configuration was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Named by the caller or the environment; must exist.
    Required(PathBuf),
    /// The working-directory default; may be absent.
    Optional(PathBuf),
}

/// Pick the config file candidate using the fallback chain.
pub fn discover_config_path(
    explicit: Option<&Path>,
    env_value: Option<String>,
    cwd: &Path,
) -> ConfigSource {
    if let Some(path) = explicit {
        return ConfigSource::Required(path.to_path_buf());
    }
    if let Some(value) = env_value.filter(|v| !v.trim().is_empty()) {
        return ConfigSource::Required(PathBuf::from(value));
    }
    ConfigSource::Optional(cwd.join(DEFAULT_CONFIG_FILE))
}

/// Load the configuration using the discovery chain.
pub async fn load_config(explicit: Option<&Path>) -> Result<GuardConfig> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let source = discover_config_path(explicit, std::env::var(CONFIG_ENV_VAR).ok(), &cwd);
    load_from(source).await
}

/// Load the configuration from an already-discovered source.
pub async fn load_from(source: ConfigSource) -> Result<GuardConfig> {
    let (path, required) = match source {
        ConfigSource::Required(p) => (p, true),
        ConfigSource::Optional(p) => (p, false),
    };

    let raw = match tokio::fs::read_to_string(&path).await {
        Ok(raw) => raw,
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(GuardConfig::default());
        }
        Err(e) => {
            return Err(GuardError::Config(format!("{}: {e}", path.display())));
        }
    };

    let config: GuardConfig = serde_json::from_str(&raw)
        .map_err(|e| GuardError::Config(format!("{}: {e}", path.display())))?;
    info!(path = %path.display(), "config loaded");
    Ok(config)
}
