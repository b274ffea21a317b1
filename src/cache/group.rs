//! Group descriptor redaction
//!
//! Triton writes a `__grp__<kernel>.json` file beside each entry that maps
//! artifact names to absolute paths on the machine that compiled them.
//! Those paths differ between hosts, so they are rewritten to bare file
//! names before the cache is baked into an image.

use serde_json::Value;
use std::fs;
use std::path::Path;

/// File name prefix of group descriptors
pub const GROUP_PREFIX: &str = "__grp__";

/// File name suffix of group descriptors
pub const GROUP_SUFFIX: &str = ".json";

/// Whether a file name follows the group descriptor convention
pub fn is_group_file(name: &str) -> bool {
    name.starts_with(GROUP_PREFIX) && name.ends_with(GROUP_SUFFIX)
}

/// Rewrites non-deterministic fields of a group file in place.
///
/// Errors are plain strings: a failed redaction is never fatal, so it only
/// needs to be readable in a warning.
pub trait GroupRedactor: Send + Sync {
    fn redact(&self, path: &Path) -> Result<(), String>;
}

/// Redactor for Triton's `child_paths` group format
#[derive(Debug, Clone, Copy, Default)]
pub struct TritonGroupRedactor;

impl TritonGroupRedactor {
    pub fn new() -> Self {
        Self
    }
}

impl GroupRedactor for TritonGroupRedactor {
    fn redact(&self, path: &Path) -> Result<(), String> {
        let content = fs::read(path).map_err(|e| format!("reading: {}", e))?;
        let mut value: Value =
            serde_json::from_slice(&content).map_err(|e| format!("parsing: {}", e))?;

        let children = value
            .get_mut("child_paths")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| "missing child_paths object".to_string())?;

        for child in children.values_mut() {
            if let Some(full) = child.as_str() {
                let name = Path::new(full)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| full.to_string());
                *child = Value::String(name);
            }
        }

        let redacted = serde_json::to_vec(&value).map_err(|e| format!("encoding: {}", e))?;
        replace_file(path, &redacted)
    }
}

/// Replace `path` through a sibling temp file.
///
/// The temp file is removed when either step fails, so it can never be
/// packed into the build context.
fn replace_file(path: &Path, content: &[u8]) -> Result<(), String> {
    let tmp = path.with_extension("json.tmp");
    let result = fs::write(&tmp, content)
        .map_err(|e| format!("writing: {}", e))
        .and_then(|()| fs::rename(&tmp, path).map_err(|e| format!("replacing: {}", e)));

    if result.is_err() && tmp.is_file() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn group_file_naming() {
        assert!(is_group_file("__grp__add_kernel.json"));
        assert!(!is_group_file("add_kernel.json"));
        assert!(!is_group_file("__grp__add_kernel.cubin"));
    }

    #[test]
    fn redact_strips_host_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("__grp__add_kernel.json");
        fs::write(
            &path,
            r#"{"child_paths": {"add_kernel.cubin": "/home/alice/.triton/cache/abc/add_kernel.cubin"}}"#,
        )
        .unwrap();

        TritonGroupRedactor.redact(&path).unwrap();

        let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["child_paths"]["add_kernel.cubin"], "add_kernel.cubin");
        assert!(!dir.path().join("__grp__add_kernel.json.tmp").exists());
    }

    #[test]
    fn redact_is_stable_across_hosts() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("__grp__a.json");
        let b = dir.path().join("__grp__b.json");
        fs::write(&a, r#"{"child_paths": {"k.ptx": "/home/alice/cache/x/k.ptx"}}"#).unwrap();
        fs::write(&b, r#"{"child_paths": {"k.ptx": "/root/.triton/y/k.ptx"}}"#).unwrap();

        TritonGroupRedactor.redact(&a).unwrap();
        TritonGroupRedactor.redact(&b).unwrap();

        assert_eq!(fs::read(&a).unwrap(), fs::read(&b).unwrap());
    }

    #[test]
    fn redact_rejects_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("__grp__bad.json");
        fs::write(&path, "not json").unwrap();

        let err = TritonGroupRedactor.redact(&path).unwrap_err();
        assert!(err.starts_with("parsing"));
    }

    #[test]
    fn failed_replace_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        // A non-empty directory cannot be replaced by a file
        let path = dir.path().join("__grp__add_kernel.json");
        fs::create_dir_all(path.join("child")).unwrap();

        let err = replace_file(&path, b"{}").unwrap_err();

        assert!(err.starts_with("replacing"));
        assert!(!dir.path().join("__grp__add_kernel.json.tmp").exists());
        assert!(path.is_dir());
    }
}
