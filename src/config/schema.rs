//! Configuration schema for cachepack
//!
//! Configuration is stored at `~/.config/cachepack/config.toml`

use crate::orchestration::EngineKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Build engine settings
    pub engine: EngineConfig,

    /// Staging area settings
    pub staging: StagingConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Build engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine to drive: "podman" or "docker"
    pub kind: EngineKind,

    /// Engine binary, if not the default on PATH
    pub binary: Option<String>,
}

/// Staging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    /// Directory under which per-build staging trees are created
    /// (default: `<system temp>/cachepack`)
    pub root: Option<PathBuf>,
}

impl StagingConfig {
    /// Resolve the staging root
    pub fn root_dir(&self) -> PathBuf {
        self.root
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("cachepack"))
    }
}
