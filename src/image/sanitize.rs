//! Group file sanitization
//!
//! Redacts host-specific fields in group files so two hosts packaging the
//! same cache produce the same image content.

use crate::cache::{is_group_file, GroupRedactor};
use crate::error::{CachepackError, CachepackResult};
use crate::image::FileIssue;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Outcome of a sanitization pass
#[derive(Debug, Default)]
pub struct SanitizeReport {
    /// Group files rewritten successfully
    pub sanitized: usize,
    /// Group files left as-is after a redaction failure
    pub issues: Vec<FileIssue>,
}

/// Redact every group file under `root`.
///
/// A file that cannot be redacted is logged and left in place; only a
/// failure to walk the tree is an error.
pub fn sanitize_group_files(
    redactor: &dyn GroupRedactor,
    root: &Path,
) -> CachepackResult<SanitizeReport> {
    let mut report = SanitizeReport::default();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| CachepackError::Walk {
            path: e.path().unwrap_or(root).to_path_buf(),
            reason: e.to_string(),
        })?;

        if !entry.file_type().is_file() || !is_group_file(&entry.file_name().to_string_lossy()) {
            continue;
        }

        match redactor.redact(entry.path()) {
            Ok(()) => {
                debug!("Sanitized {}", entry.path().display());
                report.sanitized += 1;
            }
            Err(reason) => {
                warn!("Could not sanitize {}: {}", entry.path().display(), reason);
                report.issues.push(FileIssue::Degraded {
                    path: entry.into_path(),
                    reason,
                });
            }
        }
    }

    Ok(report)
}
