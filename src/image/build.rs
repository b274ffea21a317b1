//! Cache image build pipeline
//!
//! Runs the stages in order against a private staging area:
//!
//! | Stage | Work |
//! |-------|------|
//! | Staging | create staging tree, copy the cache in |
//! | Collecting | parse descriptors, measure the tree |
//! | Sanitizing | redact group files (per-file failures tolerated) |
//! | ManifestWriting | write `io.triton.manifest/manifest.json` |
//! | ContextPreparing | write Dockerfile, pack the context archive |
//! | Building | summarize, label, run the engine |
//! | Tagging | add `:latest` to untagged names |
//! | Cleanup | remove staging, sweep leaked temp paths |
//!
//! The first failing stage ends the run; cleanup always follows.

use crate::cache::{CacheParser, GroupRedactor, TritonCacheParser, TritonGroupRedactor};
use crate::error::{CachepackError, CachepackResult};
use crate::fsutil;
use crate::image::collect::collect_entries;
use crate::image::dockerfile::{generate_dockerfile, CACHE_DIR, DOCKERFILE, MANIFEST_DIR};
use crate::image::manifest::{write_manifest, CacheEntryMetadata};
use crate::image::sanitize::sanitize_group_files;
use crate::image::staging::{StagingArea, TempCleanup, TempSweeper};
use crate::image::summary::ImageSummary;
use crate::orchestration::{BuildEngine, BuildRequest};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Pipeline stage, used in logs to locate failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    Staging,
    Collecting,
    Sanitizing,
    ManifestWriting,
    ContextPreparing,
    Building,
    Tagging,
    Cleanup,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Staging => "staging",
            Self::Collecting => "collecting",
            Self::Sanitizing => "sanitizing",
            Self::ManifestWriting => "manifest writing",
            Self::ContextPreparing => "context preparing",
            Self::Building => "building",
            Self::Tagging => "tagging",
            Self::Cleanup => "cleanup",
        };
        write!(f, "{}", name)
    }
}

/// Result of a successful build
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// Every reference that now points at the image
    pub references: Vec<String>,
    pub summary: ImageSummary,
    /// Group files left unsanitized
    pub sanitize_warnings: usize,
}

/// The implicit `:latest` reference for an untagged image name.
///
/// Returns `None` when the name already carries a tag or digest. A colon
/// before the last `/` is a registry port, not a tag.
pub fn latest_reference(image: &str) -> Option<String> {
    let last_segment = image.rsplit('/').next().unwrap_or(image);
    if last_segment.contains(':') || image.contains('@') {
        None
    } else {
        Some(format!("{}:latest", image))
    }
}

/// Reject names that cannot be passed to the engine as a single argument
fn validate_image_name(image: &str) -> CachepackResult<()> {
    let reason = if image.is_empty() {
        "name is empty"
    } else if image.chars().any(|c| c.is_whitespace() || c.is_control()) {
        "name contains whitespace or control characters"
    } else {
        return Ok(());
    };

    Err(CachepackError::ImageNameInvalid {
        image: image.to_string(),
        reason: reason.to_string(),
    })
}

fn ensure_not_cancelled(cancel: &CancellationToken, image: &str) -> CachepackResult<()> {
    if cancel.is_cancelled() {
        Err(CachepackError::BuildCancelled {
            image: image.to_string(),
        })
    } else {
        Ok(())
    }
}

/// Build context handed to the engine
struct PreparedContext {
    entries: Vec<CacheEntryMetadata>,
    total_bytes: u64,
    sanitize_warnings: usize,
}

/// Filesystem half of the pipeline, from Staging through ContextPreparing.
///
/// Owns its paths so it can run on the blocking pool.
struct ContextJob {
    source: PathBuf,
    root: PathBuf,
    cache_dir: PathBuf,
    manifest_path: PathBuf,
    dockerfile_path: PathBuf,
    archive_path: PathBuf,
    image: String,
}

impl ContextJob {
    fn new(staging: &StagingArea, source: &Path, image: &str) -> Self {
        Self {
            source: source.to_path_buf(),
            root: staging.root().to_path_buf(),
            cache_dir: staging.cache_dir(),
            manifest_path: staging.manifest_path(),
            dockerfile_path: staging.dockerfile_path(),
            archive_path: staging.archive_path().to_path_buf(),
            image: image.to_string(),
        }
    }

    /// Run the stages in order. On failure `stage` names the failing one.
    fn run(
        &self,
        parser: &dyn CacheParser,
        redactor: &dyn GroupRedactor,
        cancel: &CancellationToken,
        stage: &mut BuildStage,
    ) -> CachepackResult<PreparedContext> {
        fsutil::copy_dir(&self.source, &self.cache_dir).map_err(|e| {
            CachepackError::staging(
                format!("copying {} into build context", self.source.display()),
                e,
            )
        })?;
        ensure_not_cancelled(cancel, &self.image)?;

        *stage = BuildStage::Collecting;
        let collection = collect_entries(parser, &self.cache_dir)?;
        let total_bytes = fsutil::dir_size(&self.cache_dir)
            .map_err(|e| CachepackError::staging("computing total cache size", e))?;
        info!(
            "Collected {} cache entries ({} bytes)",
            collection.entries.len(),
            total_bytes
        );
        ensure_not_cancelled(cancel, &self.image)?;

        *stage = BuildStage::Sanitizing;
        let report = sanitize_group_files(redactor, &self.cache_dir)?;
        debug!(
            "Sanitized {} group files, {} left as-is",
            report.sanitized,
            report.issues.len()
        );
        ensure_not_cancelled(cancel, &self.image)?;

        *stage = BuildStage::ManifestWriting;
        write_manifest(&self.manifest_path, &collection.entries)?;

        *stage = BuildStage::ContextPreparing;
        let dockerfile = generate_dockerfile(&self.image, CACHE_DIR, MANIFEST_DIR);
        std::fs::write(&self.dockerfile_path, dockerfile).map_err(|e| {
            CachepackError::Context {
                context: format!("writing {}", self.dockerfile_path.display()),
                source: e,
            }
        })?;
        fsutil::tar_dir(&self.root, &self.archive_path).map_err(|e| CachepackError::Context {
            context: format!("packing {}", self.archive_path.display()),
            source: e,
        })?;

        Ok(PreparedContext {
            entries: collection.entries,
            total_bytes,
            sanitize_warnings: report.issues.len(),
        })
    }
}

/// Builds labeled cache images
pub struct ImageBuilder {
    engine: Box<dyn BuildEngine>,
    parser: Arc<dyn CacheParser>,
    redactor: Arc<dyn GroupRedactor>,
    temp_cleanup: Box<dyn TempCleanup>,
    staging_root: PathBuf,
}

impl ImageBuilder {
    /// Create a builder for Triton caches staging under `staging_root`
    pub fn new(engine: Box<dyn BuildEngine>, staging_root: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            parser: Arc::new(TritonCacheParser::new()),
            redactor: Arc::new(TritonGroupRedactor::new()),
            temp_cleanup: Box::new(TempSweeper),
            staging_root: staging_root.into(),
        }
    }

    pub fn with_parser(mut self, parser: Box<dyn CacheParser>) -> Self {
        self.parser = Arc::from(parser);
        self
    }

    pub fn with_redactor(mut self, redactor: Box<dyn GroupRedactor>) -> Self {
        self.redactor = Arc::from(redactor);
        self
    }

    pub fn with_temp_cleanup(mut self, cleanup: Box<dyn TempCleanup>) -> Self {
        self.temp_cleanup = cleanup;
        self
    }

    /// Package `cache_dir` into `image`.
    ///
    /// The image name, the cache directory and the engine are checked before
    /// anything is staged. Build output is passed line by line to
    /// `on_output` as the engine produces it. The staging area is removed on
    /// every path; a cleanup failure is returned only when nothing failed
    /// before it.
    pub async fn build(
        &self,
        cache_dir: &Path,
        image: &str,
        cancel: &CancellationToken,
        on_output: &(dyn Fn(String) + Send + Sync),
    ) -> CachepackResult<BuildOutcome> {
        validate_image_name(image)?;
        if !cache_dir.is_dir() {
            return Err(CachepackError::CacheDirNotFound(cache_dir.to_path_buf()));
        }
        self.engine.ensure_ready().await?;

        tokio::fs::create_dir_all(&self.staging_root)
            .await
            .map_err(|e| {
                CachepackError::staging(format!("creating {}", self.staging_root.display()), e)
            })?;
        let staging = StagingArea::create(&self.staging_root)?;
        info!(
            "Staging {} in {} (build {})",
            cache_dir.display(),
            staging.root().display(),
            staging.id()
        );

        let mut stage = BuildStage::Staging;
        let result = self
            .run(&staging, cache_dir, image, cancel, on_output, &mut stage)
            .await;

        if let Err(ref e) = result {
            warn!("Build of {} failed during {}: {}", image, stage, e);
        }

        let cleanup = self.cleanup(staging);

        match (result, cleanup) {
            (Ok(outcome), Ok(())) => Ok(outcome),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(cleanup_err)) => {
                warn!("Cleanup after failed build also failed: {}", cleanup_err);
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        staging: &StagingArea,
        cache_dir: &Path,
        image: &str,
        cancel: &CancellationToken,
        on_output: &(dyn Fn(String) + Send + Sync),
        stage: &mut BuildStage,
    ) -> CachepackResult<BuildOutcome> {
        let job = ContextJob::new(staging, cache_dir, image);
        let parser = Arc::clone(&self.parser);
        let redactor = Arc::clone(&self.redactor);
        let job_cancel = cancel.clone();

        let (reached, prepared) = tokio::task::spawn_blocking(move || {
            let mut stage = BuildStage::Staging;
            let prepared = job.run(parser.as_ref(), redactor.as_ref(), &job_cancel, &mut stage);
            (stage, prepared)
        })
        .await
        .map_err(|e| CachepackError::Internal(format!("build context task failed: {}", e)))?;
        *stage = reached;
        let prepared = prepared?;

        *stage = BuildStage::Building;
        let summary = ImageSummary::build(&prepared.entries, prepared.total_bytes);
        let request = BuildRequest {
            context_dir: staging.root().to_path_buf(),
            context_archive: staging.archive_path().to_path_buf(),
            dockerfile: DOCKERFILE.to_string(),
            tags: vec![image.to_string()],
            labels: summary.image_labels()?,
            no_cache: true,
        };
        ensure_not_cancelled(cancel, image)?;

        info!("Building {} with {}", image, self.engine.engine_name());
        self.engine
            .build(&request, cancel, on_output)
            .await
            .map_err(|e| match e {
                CachepackError::ImageBuild { .. } | CachepackError::BuildCancelled { .. } => e,
                other => CachepackError::ImageBuild {
                    image: image.to_string(),
                    output: other.to_string(),
                },
            })?;

        *stage = BuildStage::Tagging;
        let mut references = vec![image.to_string()];
        if let Some(latest) = latest_reference(image) {
            self.engine
                .tag(image, &latest)
                .await
                .map_err(|e| CachepackError::ImageTag {
                    image: image.to_string(),
                    target: latest.clone(),
                    reason: e.to_string(),
                })?;
            references.push(latest);
        }

        *stage = BuildStage::Cleanup;
        Ok(BuildOutcome {
            references,
            summary,
            sanitize_warnings: prepared.sanitize_warnings,
        })
    }

    /// Remove the staging area, then sweep process-wide temp state.
    /// Both run; the first failure wins.
    fn cleanup(&self, staging: StagingArea) -> CachepackResult<()> {
        let removed = staging.close();
        let swept = self
            .temp_cleanup
            .cleanup()
            .map_err(|e| CachepackError::Cleanup {
                context: "sweeping temporary directories".to_string(),
                source: e,
            });
        removed.and(swept)
    }
}
