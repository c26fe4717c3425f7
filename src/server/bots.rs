//! Bots file persistence
//!
//! `bots.json` holds `{ "bots": [ConnectionConfig, ...] }`. The server reads
//! it once at boot; the control panel can read and rewrite the raw JSON.

use anyhow::{bail, Context, Result};
use minecord_core::ConnectionConfig;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// Where the endpoint list came from
#[derive(Debug, Clone)]
pub enum BotsSource {
    /// Multi mode, from the bots file
    File(Vec<ConnectionConfig>),
    /// Single mode, from the `[single]` section
    Single(ConnectionConfig),
}

impl BotsSource {
    /// Endpoint configs in order
    pub fn into_configs(self) -> Vec<ConnectionConfig> {
        match self {
            Self::File(bots) => bots,
            Self::Single(config) => vec![config],
        }
    }

    /// `"multi"` or `"single"`
    pub fn mode(&self) -> &'static str {
        match self {
            Self::File(_) => "multi",
            Self::Single(_) => "single",
        }
    }
}

#[derive(Deserialize)]
struct BotsFile {
    #[serde(default)]
    bots: Vec<ConnectionConfig>,
}

/// Parse the bots file. `Ok(None)` when it does not exist.
pub fn load_bots(path: &Path) -> Result<Option<Vec<ConnectionConfig>>> {
    if !path.exists() {
        debug!(path = %path.display(), "No bots file");
        return Ok(None);
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file: BotsFile = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    if file.bots.is_empty() {
        bail!("{} must contain {{ \"bots\": [...] }}", path.display());
    }

    info!(path = %path.display(), count = file.bots.len(), "Loaded bots file");
    Ok(Some(file.bots))
}

/// Raw bots file JSON, or `{}` when missing or unreadable
pub fn read_raw(path: &Path) -> Value {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_else(|| Value::Object(Default::default()))
}

/// Write `value` as pretty JSON. Only objects are accepted.
pub fn write_raw(path: &Path, value: &Value) -> Result<()> {
    if !value.is_object() {
        bail!("bots file must be a JSON object");
    }
    let mut body = serde_json::to_string_pretty(value).context("Failed to serialize bots file")?;
    body.push('\n');
    std::fs::write(path, body).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "Bots file saved");
    Ok(())
}
