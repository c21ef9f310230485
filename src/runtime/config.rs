//! Engine limits and options

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_CHAIN_DEPTH_ENV: &str = "PROTOLANG_MAX_CHAIN_DEPTH";
pub const MAX_CALL_DEPTH_ENV: &str = "PROTOLANG_MAX_CALL_DEPTH";
pub const REJECT_CYCLES_ENV: &str = "PROTOLANG_REJECT_CYCLES";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid YAML config {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("unsupported config format for {path}, expected .json, .yaml or .yml")]
    UnsupportedFormat { path: PathBuf },
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Parent-link hops a lookup may follow before it fails
    pub max_chain_depth: usize,
    /// Nested function calls allowed before a call fails
    pub max_call_depth: usize,
    /// Refuse parent assignments that would close a cycle
    pub reject_cyclic_parent: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_chain_depth: 1000,
            max_call_depth: 200,
            reject_cyclic_parent: false,
        }
    }
}

impl EngineConfig {
    /// Overlay environment variables on top of `self`
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay variables read through `lookup`. Unparseable values are ignored.
    #[must_use]
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(depth) = lookup(MAX_CHAIN_DEPTH_ENV)
            && let Ok(depth) = depth.trim().parse::<usize>()
        {
            self.max_chain_depth = depth;
        }

        if let Some(depth) = lookup(MAX_CALL_DEPTH_ENV)
            && let Ok(depth) = depth.trim().parse::<usize>()
        {
            self.max_call_depth = depth;
        }

        if let Some(flag) = lookup(REJECT_CYCLES_ENV)
            && let Some(flag) = parse_flag(&flag)
        {
            self.reject_cyclic_parent = flag;
        }

        self
    }

    /// Read a JSON or YAML file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&text).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            }),
            Some("yaml" | "yml") => {
                serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
                    path: path.to_path_buf(),
                    source,
                })
            }
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
