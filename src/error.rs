//! Error types for cachepack
//!
//! All modules use `CachepackResult<T>` as their return type. Variants are
//! grouped by pipeline stage so a failure can be traced to the step that
//! produced it without reading source.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cachepack operations
pub type CachepackResult<T> = Result<T, CachepackError>;

/// All errors that can occur in cachepack
#[derive(Error, Debug)]
pub enum CachepackError {
    // Engine errors
    #[error("Container engine not found: {binary}")]
    EngineNotFound { binary: String },

    #[error("Unknown container engine: {0}. Expected podman or docker.")]
    EngineUnknown(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Staging errors
    #[error("Cache directory not found: {0}")]
    CacheDirNotFound(PathBuf),

    #[error("Invalid image name {image:?}: {reason}")]
    ImageNameInvalid { image: String, reason: String },

    #[error("Staging failed: {context}")]
    Staging {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Extraction errors
    #[error("Failed to extract cache data from {path}: {reason}")]
    Extract { path: PathBuf, reason: String },

    #[error("Failed to compute dummy key for {path}: {reason}")]
    DummyKey { path: PathBuf, reason: String },

    #[error("Failed to walk {path}: {reason}")]
    Walk { path: PathBuf, reason: String },

    // Manifest and summary errors
    #[error("Failed to write manifest {path}: {reason}")]
    ManifestWrite { path: PathBuf, reason: String },

    #[error("Failed to serialize image summary: {0}")]
    SummarySerialize(#[source] serde_json::Error),

    #[error("Invalid image labels on {image}: {reason}")]
    LabelsInvalid { image: String, reason: String },

    // Build errors
    #[error("Failed to prepare build context: {context}")]
    Context {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image build failed for {image}:\n{output}")]
    ImageBuild { image: String, output: String },

    #[error("Image build for {image} was cancelled")]
    BuildCancelled { image: String },

    #[error("Image {image} was built but tagging {target} failed: {reason}")]
    ImageTag {
        image: String,
        target: String,
        reason: String,
    },

    #[error("Image not found: {0}")]
    ImageNotFound(String),

    // Cleanup errors
    #[error("Cleanup failed: {context}")]
    Cleanup {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, stderr: {stderr}")]
    CommandExecution { command: String, stderr: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CachepackError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a staging error with context
    pub fn staging(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Staging {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Whether the image exists even though the invocation failed
    pub fn is_partial_success(&self) -> bool {
        matches!(self, Self::ImageTag { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::EngineNotFound { .. } => {
                Some("Install podman (https://podman.io) or pass --engine docker")
            }
            Self::EngineUnknown(_) => Some("Set engine.kind to \"podman\" or \"docker\""),
            Self::ImageTag { .. } => Some("The image exists; add the tag manually with `<engine> tag`"),
            Self::ImageNameInvalid { .. } => {
                Some("Use [registry/]name[:tag] without whitespace or control characters")
            }
            Self::CacheDirNotFound(_) => Some("Point --dir at a Triton cache (e.g. ~/.triton/cache)"),
            _ => None,
        }
    }
}
