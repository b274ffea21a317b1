//! Cache descriptor discovery and parsing
//!
//! Each compiled kernel in a Triton cache lives in its own hash directory
//! next to a JSON descriptor recording how it was compiled. This module
//! finds those descriptors, parses them, and derives the dummy key: a
//! content-addressed identity over the semantic fields only.

use crate::cache::group::is_group_file;
use crate::error::{CachepackError, CachepackResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Architecture as recorded by the compiler backend.
///
/// CUDA records a compute capability number (`89`), HIP a target name
/// (`"gfx90a"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArchCode {
    Capability(u64),
    Name(String),
}

impl fmt::Display for ArchCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capability(n) => write!(f, "{}", n),
            Self::Name(s) => write!(f, "{}", s),
        }
    }
}

/// Compilation target section of a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheTarget {
    pub backend: String,
    pub arch: ArchCode,
    pub warp_size: u32,
}

/// Structured fields of one cache descriptor
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CacheFields {
    /// Content hash assigned by the source cache
    pub hash: String,
    pub target: CacheTarget,
    /// Kernel function name
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub num_warps: u32,
    #[serde(default)]
    pub num_stages: u32,
    #[serde(default = "default_num_ctas")]
    pub num_ctas: u32,
    #[serde(default)]
    pub ptx_version: Option<u32>,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub enable_fp_fusion: Option<bool>,
}

fn default_num_ctas() -> u32 {
    1
}

/// Fields hashed into the dummy key.
///
/// `hash` is deliberately absent: the source cache mixes host paths and
/// toolchain fingerprints into it.
#[derive(Serialize)]
struct DummyKeyInput<'a> {
    backend: &'a str,
    arch: String,
    warp_size: u32,
    name: Option<&'a str>,
    num_warps: u32,
    num_stages: u32,
    num_ctas: u32,
    ptx_version: Option<u32>,
    debug: bool,
    enable_fp_fusion: Option<bool>,
}

/// Parser for one cache format.
///
/// `parse` returns `Ok(None)` for descriptor files that carry no cache entry.
pub trait CacheParser: Send + Sync {
    /// Find every descriptor under `root` in a stable order
    fn locate(&self, root: &Path) -> CachepackResult<Vec<PathBuf>>;

    /// Parse one descriptor
    fn parse(&self, path: &Path) -> CachepackResult<Option<CacheFields>>;

    /// Deterministic identity ignoring non-semantic fields
    fn identity_key(&self, fields: &CacheFields) -> CachepackResult<String>;

    /// Normalize a backend architecture code to a label
    fn normalize_arch(&self, arch: &ArchCode) -> String;
}

/// Parser for Triton's on-disk JSON cache layout
#[derive(Debug, Clone, Copy, Default)]
pub struct TritonCacheParser;

impl TritonCacheParser {
    pub fn new() -> Self {
        Self
    }
}

impl CacheParser for TritonCacheParser {
    fn locate(&self, root: &Path) -> CachepackResult<Vec<PathBuf>> {
        let mut found = Vec::new();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| CachepackError::Walk {
                path: e.path().unwrap_or(root).to_path_buf(),
                reason: e.to_string(),
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            if name.ends_with(".json") && !is_group_file(&name) {
                found.push(entry.into_path());
            }
        }

        debug!("Located {} descriptors under {}", found.len(), root.display());
        Ok(found)
    }

    fn parse(&self, path: &Path) -> CachepackResult<Option<CacheFields>> {
        let content = fs::read(path).map_err(|e| CachepackError::Extract {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let value: serde_json::Value =
            serde_json::from_slice(&content).map_err(|e| CachepackError::Extract {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let is_entry = value
            .as_object()
            .is_some_and(|obj| obj.contains_key("hash") && obj.contains_key("target"));
        if !is_entry {
            return Ok(None);
        }

        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| CachepackError::Extract {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    fn identity_key(&self, fields: &CacheFields) -> CachepackResult<String> {
        if fields.target.warp_size == 0 {
            return Err(CachepackError::Internal(
                "warp_size must be at least 1".to_string(),
            ));
        }

        let input = DummyKeyInput {
            backend: &fields.target.backend,
            arch: self.normalize_arch(&fields.target.arch),
            warp_size: fields.target.warp_size,
            name: fields.name.as_deref(),
            num_warps: fields.num_warps,
            num_stages: fields.num_stages,
            num_ctas: fields.num_ctas,
            ptx_version: fields.ptx_version,
            debug: fields.debug,
            enable_fp_fusion: fields.enable_fp_fusion,
        };

        let bytes = serde_json::to_vec(&input)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(hex::encode(hasher.finalize()))
    }

    fn normalize_arch(&self, arch: &ArchCode) -> String {
        match arch {
            ArchCode::Capability(n) => n.to_string(),
            ArchCode::Name(s) => s.trim().to_ascii_lowercase(),
        }
    }
}
