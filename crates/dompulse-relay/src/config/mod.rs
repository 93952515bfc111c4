//! Relay config loader (strict parsing).

pub mod schema;

use std::fs;

use dompulse_core::error::{DomPulseError, Result};

pub use schema::{ProbeSection, RelayConfig, RelaySection, SessionsSection};

/// Env var naming the config file.
pub const CONFIG_ENV: &str = "DOMPULSE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "dompulse.yaml";

pub fn load_from_file(path: &str) -> Result<RelayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| DomPulseError::Internal(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<RelayConfig> {
    let cfg: RelayConfig = serde_yaml::from_str(s)
        .map_err(|e| DomPulseError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Path from `DOMPULSE_CONFIG`, falling back to `dompulse.yaml`.
pub fn config_path() -> String {
    std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}
