//! Image summary and labels
//!
//! The summary is a bounded reduction of the manifest that fits in an image
//! label, so registries and `image inspect` can answer "what is in this
//! cache image" without pulling layers.

use crate::error::{CachepackError, CachepackResult};
use crate::image::manifest::CacheEntryMetadata;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Image label keys
pub mod labels {
    /// JSON-encoded [`super::ImageSummary`]
    pub const SUMMARY: &str = "cache.triton.image/summary";
    /// Number of manifest entries
    pub const ENTRY_COUNT: &str = "cache.triton.image/entry-count";
    /// Total bytes of the packed cache tree
    pub const CACHE_SIZE_BYTES: &str = "cache.triton.image/cache-size-bytes";
}

/// Entry count for one (backend, arch) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub backend: String,
    pub arch: String,
    pub count: u64,
}

/// Aggregate view of a cache image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSummary {
    pub total_count: u64,
    pub total_bytes: u64,
    /// Sorted by backend, then arch
    pub breakdown: Vec<BreakdownEntry>,
}

impl ImageSummary {
    /// Reduce manifest entries into a summary. `total_bytes` comes from the
    /// caller, which measured the staged tree.
    pub fn build(entries: &[CacheEntryMetadata], total_bytes: u64) -> Self {
        let mut buckets: BTreeMap<(&str, &str), u64> = BTreeMap::new();
        for entry in entries {
            *buckets
                .entry((entry.backend.as_str(), entry.arch.as_str()))
                .or_default() += 1;
        }

        let breakdown = buckets
            .into_iter()
            .map(|((backend, arch), count)| BreakdownEntry {
                backend: backend.to_string(),
                arch: arch.to_string(),
                count,
            })
            .collect();

        Self {
            total_count: entries.len() as u64,
            total_bytes,
            breakdown,
        }
    }

    /// Compact JSON for the summary label
    pub fn to_label(&self) -> CachepackResult<String> {
        serde_json::to_string(self).map_err(CachepackError::SummarySerialize)
    }

    /// Full label set for an image carrying this summary
    pub fn image_labels(&self) -> CachepackResult<BTreeMap<String, String>> {
        let mut set = BTreeMap::new();
        set.insert(labels::SUMMARY.to_string(), self.to_label()?);
        set.insert(labels::ENTRY_COUNT.to_string(), self.total_count.to_string());
        set.insert(
            labels::CACHE_SIZE_BYTES.to_string(),
            self.total_bytes.to_string(),
        );
        Ok(set)
    }

    /// Decode and cross-check the labels of a built image
    pub fn from_labels(image: &str, set: &HashMap<String, String>) -> CachepackResult<Self> {
        let invalid = |reason: String| CachepackError::LabelsInvalid {
            image: image.to_string(),
            reason,
        };
        let get = |key: &str| {
            set.get(key)
                .ok_or_else(|| invalid(format!("missing label {}", key)))
        };

        let summary: Self = serde_json::from_str(get(labels::SUMMARY)?)
            .map_err(|e| invalid(format!("{}: {}", labels::SUMMARY, e)))?;
        let count: u64 = get(labels::ENTRY_COUNT)?
            .parse()
            .map_err(|e| invalid(format!("{}: {}", labels::ENTRY_COUNT, e)))?;
        let bytes: u64 = get(labels::CACHE_SIZE_BYTES)?
            .parse()
            .map_err(|e| invalid(format!("{}: {}", labels::CACHE_SIZE_BYTES, e)))?;

        if count != summary.total_count || bytes != summary.total_bytes {
            return Err(invalid("summary disagrees with count/size labels".to_string()));
        }
        if summary.breakdown.iter().map(|b| b.count).sum::<u64>() != summary.total_count {
            return Err(invalid("breakdown does not sum to totalCount".to_string()));
        }

        Ok(summary)
    }
}
