//! Build engine abstraction
//!
//! Provides a trait for the image operations the packaging pipeline needs,
//! so the pipeline can run against podman, docker, or a test double.

use crate::error::CachepackResult;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Everything the engine needs to build one image
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Build context directory
    pub context_dir: PathBuf,
    /// The same context packed as a tar archive
    pub context_archive: PathBuf,
    /// Dockerfile name relative to the context root
    pub dockerfile: String,
    /// Tags applied by the build itself
    pub tags: Vec<String>,
    /// Image labels
    pub labels: BTreeMap<String, String>,
    /// Disable layer caching
    pub no_cache: bool,
}

/// Abstract image build engine
#[async_trait]
pub trait BuildEngine: Send + Sync {
    /// Ensure the engine is installed and responding
    async fn ensure_ready(&self) -> CachepackResult<()>;

    /// Build an image, streaming each output line to `on_output`.
    ///
    /// Returns once the engine has finished; cancelling `cancel` aborts the
    /// engine and returns `BuildCancelled`.
    async fn build(
        &self,
        request: &BuildRequest,
        cancel: &CancellationToken,
        on_output: &(dyn Fn(String) + Send + Sync),
    ) -> CachepackResult<()>;

    /// Add `target` as another reference to `source`
    async fn tag(&self, source: &str, target: &str) -> CachepackResult<()>;

    /// Labels of a local image
    async fn image_labels(&self, image: &str) -> CachepackResult<HashMap<String, String>>;

    /// Get the human-readable engine name for display
    fn engine_name(&self) -> &'static str;
}
