//! Cache restore/save engine
//!
//! Per build the engine moves through `Uninitialized → Checked → Restored →
//! Saved`. The manifest is read once on restore and written once, last, on
//! save: a save that fails part-way leaves the previous manifest in charge.

use crate::cache::descriptor::{resolve_directories, DirectorySource};
use crate::cache::signature::{compute_signature, BinarySignature};
use crate::cache::store::{CacheManifest, CacheStore};
use crate::cache::sync::{sync_directory, SyncOutcome};
use crate::config::schema::{Config, SignatureConfig};
use crate::error::{DepstashError, DepstashResult};
use crate::process::CommandRunner;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Engine lifecycle within one build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Checked,
    Restored,
    Saved,
}

impl Phase {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Checked => "checked",
            Self::Restored => "restored",
            Self::Saved => "saved",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What restore decided about the stored cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// No manifest: first build, or the cache was cleared
    NoCache,
    /// Toolchain changed since the save; the whole cache was discarded
    Invalidated { previous: BinarySignature },
    /// Signatures match; configured directories were copied back
    Reused,
}

/// Summary of a restore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub outcome: RestoreOutcome,
    /// Directories copied into the build directory
    pub restored: Vec<String>,
    /// Configured directories with nothing stored
    pub missing: Vec<String>,
}

/// Summary of a save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    /// Directories copied into the cache
    pub saved: Vec<String>,
    /// Configured directories absent from the build directory
    pub absent: Vec<String>,
    /// Stored directories removed because they are no longer configured
    pub pruned: Vec<String>,
    /// The manifest that was written
    pub manifest: CacheManifest,
}

/// Restores and saves configured directories between a cache root and a
/// build directory
pub struct CacheEngine {
    runner: Arc<dyn CommandRunner>,
    store: CacheStore,
    build_dir: PathBuf,
    directories: Vec<String>,
    signature_config: SignatureConfig,
    signature: Option<BinarySignature>,
    phase: Phase,
}

impl CacheEngine {
    /// Create an engine for one build.
    ///
    /// `directories` must already be normalized relative paths, as produced
    /// by [`crate::cache::resolve_directories`].
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        store: CacheStore,
        build_dir: impl Into<PathBuf>,
        directories: Vec<String>,
        signature_config: SignatureConfig,
    ) -> Self {
        Self {
            runner,
            store,
            build_dir: build_dir.into(),
            directories,
            signature_config,
            signature: None,
            phase: Phase::Uninitialized,
        }
    }

    /// Resolve the configured directories for `build_dir` and open the
    /// cache root, returning the engine and where its directory list came from
    pub async fn open(
        runner: Arc<dyn CommandRunner>,
        config: &Config,
        build_dir: &Path,
        cache_dir: &Path,
    ) -> DepstashResult<(Self, DirectorySource)> {
        let descriptor = build_dir.join(&config.cache.descriptor);
        let resolution = resolve_directories(&descriptor, &config.cache.default_directories).await?;
        let store = CacheStore::open(cache_dir).await?;

        let engine = Self::new(
            runner,
            store,
            build_dir,
            resolution.directories,
            config.signature.clone(),
        );
        Ok((engine, resolution.source))
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn directories(&self) -> &[String] {
        &self.directories
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Signature computed by [`check`](Self::check), if any
    pub fn signature(&self) -> Option<&BinarySignature> {
        self.signature.as_ref()
    }

    /// Probe the toolchain once per build
    pub async fn check(&mut self) -> DepstashResult<BinarySignature> {
        if let Some(ref signature) = self.signature {
            return Ok(signature.clone());
        }

        let signature = compute_signature(self.runner.as_ref(), &self.signature_config).await?;
        debug!("Toolchain signature: {}", signature);

        self.signature = Some(signature.clone());
        if self.phase == Phase::Uninitialized {
            self.phase = Phase::Checked;
        }
        Ok(signature)
    }

    /// Copy cached directories into the build directory.
    ///
    /// A toolchain change discards the whole cache root before anything is
    /// copied. Missing stored directories are skipped, never errors.
    pub async fn restore(&mut self) -> DepstashResult<RestoreReport> {
        self.ensure_not_saved("restore")?;
        let signature = self.check().await?;

        let mut report = RestoreReport {
            outcome: RestoreOutcome::NoCache,
            restored: Vec::new(),
            missing: Vec::new(),
        };

        match self.store.load_manifest().await? {
            None => {
                info!("No cache to restore");
                report.missing = self.directories.clone();
            }
            Some(manifest) if manifest.signature != signature => {
                info!("Skipping cache restore (new runtime signature)");
                debug!("Cached signature: {}", manifest.signature);
                self.store.clear().await?;
                report.outcome = RestoreOutcome::Invalidated {
                    previous: manifest.signature,
                };
                report.missing = self.directories.clone();
            }
            Some(_) => {
                report.outcome = RestoreOutcome::Reused;
                for dir in &self.directories {
                    let src = self.store.path_for(dir);
                    let dst = self.build_dir.join(dir);
                    match sync_directory(&src, &dst).await? {
                        SyncOutcome::Copied(_) => {
                            info!("- {}", dir);
                            report.restored.push(dir.clone());
                        }
                        SyncOutcome::SourceMissing => {
                            info!("- {} (no cache for {})", dir, dir);
                            report.missing.push(dir.clone());
                        }
                    }
                }
            }
        }

        self.phase = Phase::Restored;
        Ok(report)
    }

    /// Copy configured directories from the build directory into the cache,
    /// prune what is no longer configured, then record the manifest.
    ///
    /// Stored copies of absent or unconfigured directories are only removed
    /// once every copy has succeeded.
    pub async fn save(&mut self) -> DepstashResult<SaveReport> {
        self.ensure_not_saved("save")?;
        let signature = self.check().await?;

        let mut saved = Vec::new();
        let mut absent = Vec::new();

        for dir in &self.directories {
            let src = self.build_dir.join(dir);
            let dst = self.store.path_for(dir);
            match sync_directory(&src, &dst).await? {
                SyncOutcome::Copied(stats) => {
                    info!("- {} ({} files)", dir, stats.files);
                    saved.push(dir.clone());
                }
                SyncOutcome::SourceMissing => {
                    info!("- {} (nothing to cache)", dir);
                    absent.push(dir.clone());
                }
            }
        }

        // Nothing is deleted until every copy has succeeded
        for dir in &absent {
            if self.store.remove_directory(dir).await? {
                debug!("Dropped stale cached copy of {}", dir);
            }
        }
        let pruned = self.store.prune(&self.directories).await?;

        let manifest = CacheManifest::new(self.directories.clone(), signature);
        self.store.store_manifest(&manifest).await?;

        self.phase = Phase::Saved;
        Ok(SaveReport {
            saved,
            absent,
            pruned,
            manifest,
        })
    }

    fn ensure_not_saved(&self, operation: &'static str) -> DepstashResult<()> {
        if self.phase == Phase::Saved {
            return Err(DepstashError::InvalidState {
                operation,
                phase: self.phase.as_str(),
            });
        }
        Ok(())
    }
}
