//! Durable cache root storage
//!
//! Layout of a cache root:
//!
//! ```text
//! <root>/depstash.json      manifest (directories + toolchain signature)
//! <root>/dirs/<relative>    one stored tree per configured directory
//! ```

use crate::cache::signature::BinarySignature;
use crate::cache::sync::{remove_tree, sweep_staging};
use crate::error::{DepstashError, DepstashResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Manifest file name inside the cache root
pub const MANIFEST_FILE: &str = "depstash.json";

/// Subdirectory holding stored trees
pub const DIRS_DIR: &str = "dirs";

/// Manifest schema version written by this build
pub const MANIFEST_VERSION: u32 = 1;

const MANIFEST_TMP_PREFIX: &str = ".depstash-manifest-";

/// Persisted record of what was cached and under which toolchain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheManifest {
    /// Schema version for forward compatibility
    pub version: u32,

    /// Configured directories at the time of the save, in order
    pub directories: Vec<String>,

    /// Toolchain signature the cache was built under
    pub signature: BinarySignature,

    /// When the save completed
    pub saved_at: DateTime<Utc>,
}

impl CacheManifest {
    /// Create a manifest stamped with the current time
    pub fn new(directories: Vec<String>, signature: BinarySignature) -> Self {
        Self {
            version: MANIFEST_VERSION,
            directories,
            signature,
            saved_at: Utc::now(),
        }
    }
}

/// Cache root storage
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Open a cache root, sweeping debris from an interrupted run.
    ///
    /// The root does not need to exist yet; it is created on first save.
    pub async fn open(root: impl Into<PathBuf>) -> DepstashResult<Self> {
        let store = Self { root: root.into() };

        let root = store.root.clone();
        let swept = blocking(move || sweep_debris(&root))
            .await
            .map_err(|e| DepstashError::io(format!("cleaning {}", store.root.display()), e))?;
        if swept > 0 {
            info!("Removed {} leftover staging entries from an interrupted run", swept);
        }

        Ok(store)
    }

    /// The cache root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the stored tree for a relative directory
    pub fn path_for(&self, rel: &str) -> PathBuf {
        self.root.join(DIRS_DIR).join(rel)
    }

    /// Whether a tree is stored for `rel`
    pub fn has_directory(&self, rel: &str) -> bool {
        fs::symlink_metadata(self.path_for(rel)).is_ok()
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Load the manifest.
    ///
    /// `None` means there is no reusable cache: either nothing was ever saved
    /// or the manifest is unreadable and the cache must be rebuilt.
    pub async fn load_manifest(&self) -> DepstashResult<Option<CacheManifest>> {
        let path = self.manifest_path();

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No cache manifest at {}", path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(DepstashError::io(
                    format!("reading cache manifest {}", path.display()),
                    e,
                ))
            }
        };

        match serde_json::from_str::<CacheManifest>(&content) {
            Ok(manifest) if manifest.version > MANIFEST_VERSION => {
                warn!(
                    "Cache manifest version {} is newer than supported ({}), ignoring cache",
                    manifest.version, MANIFEST_VERSION
                );
                Ok(None)
            }
            Ok(manifest) => Ok(Some(manifest)),
            Err(e) => {
                warn!("Ignoring unreadable cache manifest {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    /// Write the manifest atomically (temp file + fsync + rename)
    pub async fn store_manifest(&self, manifest: &CacheManifest) -> DepstashResult<()> {
        let content = serde_json::to_vec_pretty(manifest)?;
        let root = self.root.clone();
        let path = self.manifest_path();

        blocking(move || write_atomic(&root, &path, &content))
            .await
            .map_err(|e| {
                DepstashError::io(
                    format!("writing cache manifest {}", self.manifest_path().display()),
                    e,
                )
            })?;

        debug!(
            "Stored manifest with {} directories",
            manifest.directories.len()
        );
        Ok(())
    }

    /// Remove every stored tree that is not listed in `keep`.
    ///
    /// Returns the relative paths that were removed.
    pub async fn prune(&self, keep: &[String]) -> DepstashResult<Vec<String>> {
        let dirs_root = self.root.join(DIRS_DIR);
        let keep = keep.to_vec();

        let removed = blocking(move || {
            let mut removed = Vec::new();
            prune_level(&dirs_root, "", &keep, &mut removed)?;
            Ok(removed)
        })
        .await
        .map_err(|e| DepstashError::io(format!("pruning {}", self.root.display()), e))?;

        for rel in &removed {
            info!("Pruned {} (no longer configured)", rel);
        }
        Ok(removed)
    }

    /// Discard the stored tree for `rel`; returns whether anything was removed
    pub async fn remove_directory(&self, rel: &str) -> DepstashResult<bool> {
        let path = self.path_for(rel);
        if fs::symlink_metadata(&path).is_err() {
            return Ok(false);
        }

        let target = path.clone();
        blocking(move || remove_tree(&target))
            .await
            .map_err(|e| DepstashError::io(format!("removing {}", path.display()), e))?;
        Ok(true)
    }

    /// Discard everything under the cache root, manifest included
    pub async fn clear(&self) -> DepstashResult<()> {
        let root = self.root.clone();
        blocking(move || {
            let entries = match fs::read_dir(&root) {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(e),
            };
            for entry in entries {
                remove_tree(&entry?.path())?;
            }
            Ok(())
        })
        .await
        .map_err(|e| DepstashError::io(format!("clearing {}", self.root.display()), e))?;

        debug!("Cleared cache root {}", self.root.display());
        Ok(())
    }
}

async fn blocking<T, F>(f: F) -> io::Result<T>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(io::Error::other)?
}

fn write_atomic(root: &Path, path: &Path, content: &[u8]) -> io::Result<()> {
    fs::create_dir_all(root)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(MANIFEST_TMP_PREFIX)
        .tempfile_in(root)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    #[cfg(unix)]
    {
        if let Ok(dir) = fs::File::open(root) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}

fn sweep_debris(root: &Path) -> io::Result<usize> {
    let mut swept = sweep_staging(&root.join(DIRS_DIR))?;

    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(swept),
        Err(e) => return Err(e),
    };
    for entry in entries {
        let entry = entry?;
        if entry
            .file_name()
            .to_string_lossy()
            .starts_with(MANIFEST_TMP_PREFIX)
        {
            remove_tree(&entry.path())?;
            swept += 1;
        }
    }

    Ok(swept)
}

/// Walk one level of stored trees, descending only into ancestors of kept paths
fn prune_level(
    dir: &Path,
    prefix: &str,
    keep: &[String],
    removed: &mut Vec<String>,
) -> io::Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let rel = if prefix.is_empty() {
            name
        } else {
            format!("{}/{}", prefix, name)
        };

        if keep.contains(&rel) {
            continue;
        }

        let ancestor = format!("{}/", rel);
        if keep.iter().any(|k| k.starts_with(&ancestor)) && entry.file_type()?.is_dir() {
            prune_level(&entry.path(), &rel, keep, removed)?;
            continue;
        }

        remove_tree(&entry.path())?;
        removed.push(rel);
    }

    Ok(())
}
