//! Whole-tree directory synchronization
//!
//! A tree is copied into a staging directory next to the destination and
//! then renamed into place, so readers only ever see the previous tree or
//! the complete new one. Symlinks are recreated verbatim, never followed,
//! and permission bits travel with files and directories.

use crate::error::{DepstashError, DepstashResult};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Name prefix of staging directories created next to a destination
pub const STAGING_PREFIX: &str = ".depstash-staging-";

/// Counts of what a sync copied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub files: u64,
    pub dirs: u64,
    pub symlinks: u64,
    pub bytes: u64,
}

/// Result of a single sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Source copied; destination replaced
    Copied(SyncStats),
    /// Source does not exist; destination left untouched
    SourceMissing,
}

/// Replace `dst` with a copy of the tree at `src`.
///
/// A missing `src` is not an error. Runs on tokio's blocking pool.
pub async fn sync_directory(src: &Path, dst: &Path) -> DepstashResult<SyncOutcome> {
    let src = src.to_path_buf();
    let dst = dst.to_path_buf();

    tokio::task::spawn_blocking(move || sync_blocking(&src, &dst))
        .await
        .map_err(|e| DepstashError::io("waiting for directory copy", io::Error::other(e)))?
}

fn sync_blocking(src: &Path, dst: &Path) -> DepstashResult<SyncOutcome> {
    match fs::symlink_metadata(src) {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Nothing to copy at {}", src.display());
            return Ok(SyncOutcome::SourceMissing);
        }
        Err(e) => return Err(DepstashError::io(format!("reading {}", src.display()), e)),
    }

    let parent = dst
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(parent)
        .map_err(|e| DepstashError::io(format!("creating {}", parent.display()), e))?;
    sweep_staging(parent)
        .map_err(|e| DepstashError::io(format!("cleaning {}", parent.display()), e))?;

    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(parent)
        .map_err(|e| DepstashError::io(format!("creating staging dir in {}", parent.display()), e))?;

    let staged = staging.path().join("tree");
    let (stats, root_permissions) = copy_tree(src, &staged).map_err(|e| {
        DepstashError::io(
            format!("copying {} to {}", src.display(), dst.display()),
            e,
        )
    })?;

    // Moving a directory to a new parent rewrites its `..` entry, which
    // needs write access on the directory itself
    let retired = staging.path().join("retired");
    let previous = match fs::symlink_metadata(dst) {
        Ok(_) => {
            let locked = unlock_dir(dst)
                .map_err(|e| DepstashError::io(format!("unlocking {}", dst.display()), e))?;
            if let Err(e) = fs::rename(dst, &retired) {
                relock_dir(dst, locked);
                return Err(DepstashError::io(format!("moving aside {}", dst.display()), e));
            }
            Some(locked)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(DepstashError::io(format!("reading {}", dst.display()), e)),
    };

    if let Err(e) = fs::rename(&staged, dst) {
        if let Some(locked) = previous {
            match fs::rename(&retired, dst) {
                Ok(()) => relock_dir(dst, locked),
                Err(rollback) => {
                    // The old tree only survives if the staging dir does
                    warn!(
                        "Could not move {} back to {}: {}; leaving it in place",
                        retired.display(),
                        dst.display(),
                        rollback
                    );
                    let _ = staging.keep();
                }
            }
        }
        return Err(DepstashError::io(
            format!("placing {} into {}", staged.display(), dst.display()),
            e,
        ));
    }

    if let Some(permissions) = root_permissions {
        fs::set_permissions(dst, permissions)
            .map_err(|e| DepstashError::io(format!("setting mode of {}", dst.display()), e))?;
    }

    if previous.is_some() {
        if let Err(e) = remove_tree(&retired) {
            debug!("Failed to remove replaced tree {}: {}", retired.display(), e);
        }
    }
    drop(staging);

    debug!(
        "Copied {} -> {} ({} files, {} dirs, {} symlinks)",
        src.display(),
        dst.display(),
        stats.files,
        stats.dirs,
        stats.symlinks
    );
    Ok(SyncOutcome::Copied(stats))
}

/// Copy `src` (directory, file, or symlink) to the not-yet-existing `dst`.
///
/// Every directory but the root gets its mode here. The root's mode is
/// returned so the caller can apply it once the tree is in its final place.
fn copy_tree(src: &Path, dst: &Path) -> io::Result<(SyncStats, Option<fs::Permissions>)> {
    let mut stats = SyncStats::default();
    let mut root_permissions = None;
    // Directory modes are applied last so read-only dirs can still be filled
    let mut dir_permissions: Vec<(PathBuf, fs::Permissions)> = Vec::new();

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let is_root = rel.as_os_str().is_empty();
        let target = if is_root {
            dst.to_path_buf()
        } else {
            dst.join(rel)
        };

        let file_type = entry.file_type();
        if file_type.is_symlink() {
            let link = fs::read_link(entry.path())?;
            create_symlink(&link, &target)?;
            stats.symlinks += 1;
        } else if file_type.is_dir() {
            fs::create_dir(&target)?;
            let permissions = entry.metadata()?.permissions();
            if is_root {
                root_permissions = Some(permissions);
            } else {
                dir_permissions.push((target, permissions));
            }
            stats.dirs += 1;
        } else if file_type.is_file() {
            stats.bytes += fs::copy(entry.path(), &target)?;
            stats.files += 1;
        } else {
            debug!("Skipping special file {}", entry.path().display());
        }
    }

    for (dir, permissions) in dir_permissions.into_iter().rev() {
        fs::set_permissions(&dir, permissions)?;
    }

    Ok((stats, root_permissions))
}

/// Give the owner write access to directory `path`, returning the mode to
/// put back if it had to change
#[cfg(unix)]
fn unlock_dir(path: &Path) -> io::Result<Option<fs::Permissions>> {
    use std::os::unix::fs::PermissionsExt;

    let meta = fs::symlink_metadata(path)?;
    let original = meta.permissions();
    if !meta.is_dir() || original.mode() & 0o200 != 0 {
        return Ok(None);
    }

    fs::set_permissions(path, fs::Permissions::from_mode(original.mode() | 0o200))?;
    Ok(Some(original))
}

#[cfg(not(unix))]
fn unlock_dir(_path: &Path) -> io::Result<Option<fs::Permissions>> {
    Ok(None)
}

fn relock_dir(path: &Path, locked: Option<fs::Permissions>) {
    if let Some(permissions) = locked {
        if let Err(e) = fs::set_permissions(path, permissions) {
            debug!("Failed to restore mode of {}: {}", path.display(), e);
        }
    }
}

/// Create a symlink at `at` pointing to `points_to`
#[cfg(unix)]
fn create_symlink(points_to: &Path, at: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(points_to, at)
}

#[cfg(not(unix))]
fn create_symlink(points_to: &Path, at: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!(
            "cannot recreate symlink {} -> {}",
            at.display(),
            points_to.display()
        ),
    ))
}

/// Remove a file, symlink, or directory tree; missing paths are fine.
///
/// Read-only directories inside the tree are made writable first so cached
/// packages with restrictive modes can still be discarded.
pub fn remove_tree(path: &Path) -> io::Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    if !meta.is_dir() {
        return fs::remove_file(path);
    }

    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            make_dirs_writable(path)?;
            fs::remove_dir_all(path)
        }
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn make_dirs_writable(root: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            let mut permissions = entry.metadata()?.permissions();
            permissions.set_mode(permissions.mode() | 0o700);
            fs::set_permissions(entry.path(), permissions)?;
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn make_dirs_writable(root: &Path) -> io::Result<()> {
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry?;
        let mut permissions = entry.metadata()?.permissions();
        if permissions.readonly() {
            #[allow(clippy::permissions_set_readonly_false)]
            permissions.set_readonly(false);
            fs::set_permissions(entry.path(), permissions)?;
        }
    }
    Ok(())
}

/// Remove staging directories left directly inside `dir` by an
/// interrupted sync. Staging dirs only ever sit next to a destination, so
/// stored trees are not walked.
pub fn sweep_staging(dir: &Path) -> io::Result<usize> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut swept = 0;
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with(STAGING_PREFIX) {
            debug!("Removing stale staging dir {}", entry.path().display());
            remove_tree(&entry.path())?;
            swept += 1;
        }
    }
    Ok(swept)
}
