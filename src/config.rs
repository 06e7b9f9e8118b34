use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::http::parser::DEFAULT_MAX_HEADER_BYTES;

/// Environment variable naming an optional YAML config file.
pub const CONFIG_ENV: &str = "WIREHTTP_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the listener binds to.
    pub listen_addr: String,
    /// Largest header block accepted before the connection is dropped.
    pub max_header_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
        }
    }
}

impl Config {
    /// Loads the file named by `WIREHTTP_CONFIG` (if any), then applies the
    /// `LISTEN` and `MAX_HEADER_BYTES` environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };

        if let Ok(addr) = std::env::var("LISTEN") {
            cfg.listen_addr = addr;
        }

        if let Ok(limit) = std::env::var("MAX_HEADER_BYTES") {
            cfg.max_header_bytes = limit
                .parse()
                .with_context(|| format!("invalid MAX_HEADER_BYTES: {limit}"))?;
        }

        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(content).context("failed to parse config")
    }
}
