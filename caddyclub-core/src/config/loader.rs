//! Conversion options and their loader

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the single server the assembler emits
pub const DEFAULT_SERVER_NAME: &str = "clubs";

/// Options controlling how a Caddyfile is assembled into admin JSON
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConvertOptions {
    /// Server name under `apps.http.servers`
    pub server_name: String,

    /// Listen addresses of the emitted server
    pub listen: Vec<String>,

    /// `terminal` flag set on every emitted route (omitted when None)
    pub terminal: Option<bool>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            server_name: DEFAULT_SERVER_NAME.to_string(),
            listen: vec![":443".to_string(), ":80".to_string()],
            terminal: None,
        }
    }
}

impl ConvertOptions {
    /// Load options from a file, picking the format by extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ConvertOptions> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Options(format!("Failed to read options file: {}", e)))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        tracing::debug!("loading conversion options from {}", path.display());

        match ext {
            "json" => Self::from_json(&content),
            "toml" | "" => Self::from_toml(&content),
            _ => Err(Error::Options(format!("Unknown options format: {}", ext))),
        }
    }

    /// Parse JSON options
    pub fn from_json(content: &str) -> Result<ConvertOptions> {
        serde_json::from_str(content)
            .map_err(|e| Error::Options(format!("Invalid JSON: {}", e)))
    }

    /// Parse TOML options
    pub fn from_toml(content: &str) -> Result<ConvertOptions> {
        toml::from_str(content)
            .map_err(|e| Error::Options(format!("Invalid TOML: {}", e)))
    }
}
