//! Invocation-scoped staging areas
//!
//! Every build gets its own `build-<uuid>` directory under the staging
//! root plus a sibling `build-<uuid>.tar` context archive. Both are removed
//! by [`StagingArea::close`], or on drop if `close` is never reached.
//!
//! Paths whose removal fails are remembered process-wide and retried by
//! [`TempSweeper`].

use crate::error::{CachepackError, CachepackResult};
use crate::image::dockerfile::{CACHE_DIR, DOCKERFILE, MANIFEST_DIR, MANIFEST_FILE};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use tracing::{debug, warn};
use uuid::Uuid;

fn leaked_paths() -> &'static Mutex<BTreeSet<PathBuf>> {
    static LEAKED: OnceLock<Mutex<BTreeSet<PathBuf>>> = OnceLock::new();
    LEAKED.get_or_init(Default::default)
}

fn remember_leaked(path: &Path) {
    leaked_paths()
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .insert(path.to_path_buf());
}

/// Remove a file or directory tree; a missing path is not an error
fn remove_path(path: &Path) -> io::Result<()> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Process-wide temporary cleanup run after every build
pub trait TempCleanup: Send + Sync {
    fn cleanup(&self) -> io::Result<()>;
}

/// Retries removal of staging paths that earlier cleanups could not delete
#[derive(Debug, Clone, Copy, Default)]
pub struct TempSweeper;

impl TempCleanup for TempSweeper {
    fn cleanup(&self) -> io::Result<()> {
        let mut leaked = leaked_paths().lock().unwrap_or_else(|e| e.into_inner());
        let mut first_error = None;

        leaked.retain(|path| match remove_path(path) {
            Ok(()) => {
                debug!("Swept leaked staging path {}", path.display());
                false
            }
            Err(e) => {
                first_error.get_or_insert(io::Error::new(
                    e.kind(),
                    format!("removing {}: {}", path.display(), e),
                ));
                true
            }
        });

        first_error.map_or(Ok(()), Err)
    }
}

/// Staging directory tree for one build
#[derive(Debug)]
pub struct StagingArea {
    id: Uuid,
    root: PathBuf,
    archive: PathBuf,
    closed: bool,
}

impl StagingArea {
    /// Create a fresh staging directory under `base`
    pub fn create(base: &Path) -> CachepackResult<Self> {
        let id = Uuid::new_v4();
        let root = base.join(format!("build-{}", id));
        let archive = base.join(format!("build-{}.tar", id));

        fs::create_dir_all(&root).map_err(|e| {
            CachepackError::staging(format!("creating {}", root.display()), e)
        })?;

        debug!("Created staging area {}", root.display());
        Ok(Self {
            id,
            root,
            archive,
            closed: false,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Build context root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Staged copy of the cache
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join(CACHE_DIR)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_DIR).join(MANIFEST_FILE)
    }

    pub fn dockerfile_path(&self) -> PathBuf {
        self.root.join(DOCKERFILE)
    }

    /// Context archive, kept outside the tree it packs
    pub fn archive_path(&self) -> &Path {
        &self.archive
    }

    /// Remove the staging tree and archive.
    ///
    /// Both removals are attempted; the first failure is returned and the
    /// path is left for [`TempSweeper`].
    pub fn close(mut self) -> CachepackResult<()> {
        self.closed = true;
        let mut first_error = None;

        for path in [&self.root, &self.archive] {
            if let Err(e) = remove_path(path) {
                remember_leaked(path);
                first_error.get_or_insert(CachepackError::Cleanup {
                    context: format!("removing {}", path.display()),
                    source: e,
                });
            }
        }

        debug!("Closed staging area {}", self.id);
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        for path in [&self.root, &self.archive] {
            if let Err(e) = remove_path(path) {
                warn!("Failed to remove staging path {}: {}", path.display(), e);
                remember_leaked(path);
            }
        }
    }
}
