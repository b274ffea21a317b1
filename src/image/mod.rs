//! Cache image assembly
//!
//! Collects cache entries into a manifest and summary, stages a build
//! context, and drives the build engine to produce a labeled image.
//!
//! Per-file problems fall into three policies:
//! - ignorable: skipped silently ([`FileIssue::Ignorable`])
//! - degraded: logged, build continues ([`FileIssue::Degraded`])
//! - fatal: returned as a [`crate::error::CachepackError`]

pub mod build;
pub mod collect;
pub mod dockerfile;
pub mod manifest;
pub mod sanitize;
pub mod staging;
pub mod summary;

pub use build::{latest_reference, BuildOutcome, BuildStage, ImageBuilder};
pub use collect::{collect_entries, Collection};
pub use manifest::{read_manifest, write_manifest, CacheEntryMetadata};
pub use sanitize::{sanitize_group_files, SanitizeReport};
pub use staging::{StagingArea, TempCleanup, TempSweeper};
pub use summary::{labels, BreakdownEntry, ImageSummary};

use std::path::PathBuf;

/// A non-fatal problem with one file in the cache tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileIssue {
    /// Descriptor without a cache entry; skipped
    Ignorable { path: PathBuf },
    /// File could not be normalized; packed unchanged
    Degraded { path: PathBuf, reason: String },
}
