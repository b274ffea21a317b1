//! Engine factory for creating the configured build engine

use crate::config::Config;
use crate::error::CachepackError;
use crate::orchestration::cli_engine::CliEngine;
use crate::orchestration::engine::BuildEngine;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported container engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Rootless Podman
    #[default]
    Podman,
    /// Docker daemon via the docker CLI
    Docker,
}

impl EngineKind {
    /// Binary looked up on PATH when no override is configured
    pub fn default_binary(&self) -> &'static str {
        match self {
            EngineKind::Podman => "podman",
            EngineKind::Docker => "docker",
        }
    }

    /// Get a human-readable engine name
    pub fn name(&self) -> &'static str {
        match self {
            EngineKind::Podman => "Podman",
            EngineKind::Docker => "Docker",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_binary())
    }
}

impl FromStr for EngineKind {
    type Err = CachepackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "podman" => Ok(EngineKind::Podman),
            "docker" => Ok(EngineKind::Docker),
            other => Err(CachepackError::EngineUnknown(other.to_string())),
        }
    }
}

/// Create the build engine described by `config`, optionally overriding
/// the configured kind (e.g. from `--engine`).
///
/// A binary override in config only applies when the kind is unchanged.
pub fn create_engine(config: &Config, kind: Option<EngineKind>) -> Box<dyn BuildEngine> {
    let configured = config.engine.kind;
    let kind = kind.unwrap_or(configured);

    let mut engine = CliEngine::new(kind);
    if kind == configured {
        if let Some(ref binary) = config.engine.binary {
            engine = engine.with_binary(binary.clone());
        }
    }
    Box::new(engine)
}
