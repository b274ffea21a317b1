//! Filesystem helpers for staging a build context
//!
//! All walks sort by file name so the copy, the size sum and the archive
//! see the tree in the same order on every run.

use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Copy the contents of `src` into `dst`, creating `dst` if needed.
///
/// Symlinks are skipped; a Triton cache never contains them and following
/// them could pull host files into the image.
pub fn copy_dir(src: &Path, dst: &Path) -> io::Result<u64> {
    fs::create_dir_all(dst)?;
    let mut copied = 0;

    for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dst.join(relative);

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        } else {
            warn!("Skipping non-regular file {}", entry.path().display());
        }
    }

    debug!("Copied {} files from {} to {}", copied, src.display(), dst.display());
    Ok(copied)
}

/// Total size in bytes of all regular files under `root`
pub fn dir_size(root: &Path) -> io::Result<u64> {
    let mut total = 0;
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(io::Error::other)?;
        if entry.file_type().is_file() {
            total += entry.metadata().map_err(io::Error::other)?.len();
        }
    }
    Ok(total)
}

/// Write `root` as an uncompressed tar archive to `archive`.
///
/// Headers use deterministic mode (fixed mtime and ownership) so identical
/// trees produce identical archives.
pub fn tar_dir(root: &Path, archive: &Path) -> io::Result<()> {
    let file = fs::File::create(archive)?;
    let mut builder = tar::Builder::new(file);
    builder.mode(tar::HeaderMode::Deterministic);
    builder.follow_symlinks(false);

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(io::Error::other)?;

        let file_type = entry.file_type();
        if file_type.is_dir() {
            builder.append_dir(relative, entry.path())?;
        } else if file_type.is_file() {
            builder.append_path_with_name(entry.path(), relative)?;
        }
    }

    builder.into_inner()?.sync_all()
}
