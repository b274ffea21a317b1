//! Cache manifest
//!
//! The manifest lists every cache entry packed into an image, in collection
//! order. It is written to `io.triton.manifest/manifest.json` inside the
//! build context and copied verbatim into the image, so its field names are
//! a stable schema for tools reading the image.

use crate::error::{CachepackError, CachepackResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Metadata for one compiled kernel in the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntryMetadata {
    /// Content hash from the source cache
    pub hash: String,
    /// Compiler backend (`cuda`, `hip`, ...)
    pub backend: String,
    /// Normalized architecture label
    pub arch: String,
    pub warp_size: u32,
    pub ptx_version: Option<u32>,
    pub num_stages: u32,
    pub num_warps: u32,
    pub debug: bool,
    /// Identity over semantic fields, stable across hosts
    pub dummy_key: String,
}

/// Write the manifest to `path`, creating parent directories.
///
/// The document is written to a sibling `.tmp` file and renamed into place,
/// so `path` never holds a truncated manifest.
pub fn write_manifest(path: &Path, entries: &[CacheEntryMetadata]) -> CachepackResult<()> {
    let fail = |reason: String| CachepackError::ManifestWrite {
        path: path.to_path_buf(),
        reason,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| fail(format!("creating directory: {}", e)))?;
    }

    let mut content =
        serde_json::to_vec_pretty(entries).map_err(|e| fail(format!("encoding: {}", e)))?;
    content.push(b'\n');

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &content).map_err(|e| fail(format!("writing: {}", e)))?;
    fs::rename(&tmp, path).map_err(|e| fail(format!("renaming: {}", e)))?;

    debug!("Wrote manifest with {} entries to {}", entries.len(), path.display());
    Ok(())
}

/// Read a manifest written by [`write_manifest`]
pub fn read_manifest(path: &Path) -> CachepackResult<Vec<CacheEntryMetadata>> {
    let content = fs::read(path)
        .map_err(|e| CachepackError::io(format!("reading manifest {}", path.display()), e))?;
    Ok(serde_json::from_slice(&content)?)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub(crate) fn entry(backend: &str, arch: &str, key: &str) -> CacheEntryMetadata {
        CacheEntryMetadata {
            hash: format!("hash-{}", key),
            backend: backend.to_string(),
            arch: arch.to_string(),
            warp_size: 32,
            ptx_version: Some(83),
            num_stages: 3,
            num_warps: 4,
            debug: false,
            dummy_key: key.to_string(),
        }
    }

    #[test]
    fn write_creates_parent_and_preserves_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("io.triton.manifest/manifest.json");
        let entries = vec![entry("cuda", "89", "b"), entry("hip", "gfx90a", "a")];

        write_manifest(&path, &entries).unwrap();

        assert_eq!(read_manifest(&path).unwrap(), entries);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn manifest_field_names_are_stable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.json");
        write_manifest(&path, &[entry("cuda", "89", "k")]).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let object = value[0].as_object().unwrap();
        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort();

        assert_eq!(
            keys,
            vec![
                "arch",
                "backend",
                "debug",
                "dummy_key",
                "hash",
                "num_stages",
                "num_warps",
                "ptx_version",
                "warp_size"
            ]
        );
    }

    #[test]
    fn empty_manifest_is_empty_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.json");
        write_manifest(&path, &[]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "[]");
    }

    #[test]
    fn write_into_file_parent_fails_with_path() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let err = write_manifest(&blocker.join("manifest.json"), &[]).unwrap_err();
        assert!(matches!(err, CachepackError::ManifestWrite { .. }));
        assert!(err.to_string().contains("blocker"));
    }
}
