//! Cache entry collection
//!
//! Turns every descriptor under a cache root into a [`CacheEntryMetadata`].

use crate::cache::CacheParser;
use crate::error::{CachepackError, CachepackResult};
use crate::image::manifest::CacheEntryMetadata;
use crate::image::FileIssue;
use std::path::Path;
use tracing::debug;

/// Entries found under a cache root, in walk order
#[derive(Debug, Default)]
pub struct Collection {
    pub entries: Vec<CacheEntryMetadata>,
    /// Descriptors that carried no cache entry
    pub issues: Vec<FileIssue>,
}

/// Collect metadata for every descriptor under `root`.
///
/// A descriptor that parses to no data is skipped. It is assumed that a real
/// entry never parses that way; nothing verifies it. Any other parse failure,
/// or a dummy key failure, aborts the whole collection.
pub fn collect_entries(parser: &dyn CacheParser, root: &Path) -> CachepackResult<Collection> {
    let mut collection = Collection::default();

    for path in parser.locate(root)? {
        let fields = match parser.parse(&path) {
            Ok(Some(fields)) => fields,
            Ok(None) => {
                debug!("No cache entry in {}, skipping", path.display());
                collection.issues.push(FileIssue::Ignorable { path });
                continue;
            }
            Err(e @ CachepackError::Extract { .. }) => return Err(e),
            Err(e) => {
                return Err(CachepackError::Extract {
                    path,
                    reason: e.to_string(),
                })
            }
        };

        let dummy_key = parser
            .identity_key(&fields)
            .map_err(|e| CachepackError::DummyKey {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        collection.entries.push(CacheEntryMetadata {
            hash: fields.hash,
            backend: fields.target.backend,
            arch: parser.normalize_arch(&fields.target.arch),
            warp_size: fields.target.warp_size,
            ptx_version: fields.ptx_version,
            num_stages: fields.num_stages,
            num_warps: fields.num_warps,
            debug: fields.debug,
            dummy_key,
        });
    }

    debug!(
        "Collected {} entries ({} descriptors without data)",
        collection.entries.len(),
        collection.issues.len()
    );
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::descriptor::tests::descriptor;
    use crate::cache::TritonCacheParser;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write_entry(root: &Path, hash: &str, backend: &str, arch: serde_json::Value) {
        let dir = root.join(hash);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("kernel.json"),
            descriptor(hash, backend, arch).to_string(),
        )
        .unwrap();
    }

    #[test]
    fn collects_entries_in_walk_order() {
        let dir = TempDir::new().unwrap();
        write_entry(dir.path(), "bbb", "hip", json!("gfx90a"));
        write_entry(dir.path(), "aaa", "cuda", json!(89));

        let collection = collect_entries(&TritonCacheParser, dir.path()).unwrap();

        let hashes: Vec<&str> = collection.entries.iter().map(|e| e.hash.as_str()).collect();
        assert_eq!(hashes, vec!["aaa", "bbb"]);
        assert_eq!(collection.entries[0].arch, "89");
        assert_eq!(collection.entries[1].arch, "gfx90a");
    }

    #[test]
    fn entry_count_matches_descriptors_with_data() {
        let dir = TempDir::new().unwrap();
        write_entry(dir.path(), "aaa", "cuda", json!(89));
        write_entry(dir.path(), "bbb", "cuda", json!(90));
        fs::write(dir.path().join("aaa/extra.json"), r#"{"note": "no entry"}"#).unwrap();
        fs::write(dir.path().join("aaa/__grp__kernel.json"), "{}").unwrap();

        let collection = collect_entries(&TritonCacheParser, dir.path()).unwrap();

        assert_eq!(collection.entries.len(), 2);
        assert_eq!(collection.issues.len(), 1);
        assert!(matches!(collection.issues[0], FileIssue::Ignorable { .. }));
    }

    #[test]
    fn malformed_descriptor_aborts_with_path() {
        let dir = TempDir::new().unwrap();
        write_entry(dir.path(), "aaa", "cuda", json!(89));
        fs::write(dir.path().join("aaa/broken.json"), "{").unwrap();

        let err = collect_entries(&TritonCacheParser, dir.path()).unwrap_err();
        assert!(matches!(err, CachepackError::Extract { .. }));
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn dummy_key_failure_is_file_qualified() {
        let dir = TempDir::new().unwrap();
        let mut value = descriptor("aaa", "cuda", json!(89));
        value["target"]["warp_size"] = json!(0);
        fs::write(dir.path().join("zero.json"), value.to_string()).unwrap();

        let err = collect_entries(&TritonCacheParser, dir.path()).unwrap_err();
        assert!(matches!(err, CachepackError::DummyKey { .. }));
        assert!(err.to_string().contains("zero.json"));
    }

    #[test]
    fn empty_directory_yields_no_entries() {
        let dir = TempDir::new().unwrap();
        let collection = collect_entries(&TritonCacheParser, dir.path()).unwrap();
        assert!(collection.entries.is_empty());
        assert!(collection.issues.is_empty());
    }
}
