//! Cache directory resolution from the project descriptor
//!
//! `package.json` may declare its own cache directories under
//! `cacheDirectories` or the older `cache_directories` key. The first
//! non-empty one wins; otherwise the configured defaults apply.

use crate::error::{DepstashError, DepstashResult};
use serde::Deserialize;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Descriptor keys in priority order
pub const DESCRIPTOR_KEYS: [&str; 2] = ["cacheDirectories", "cache_directories"];

#[derive(Debug, Default, Deserialize)]
struct DescriptorKeys {
    #[serde(rename = "cacheDirectories", default)]
    cache_directories: Option<Vec<String>>,
    #[serde(rename = "cache_directories", default)]
    legacy_cache_directories: Option<Vec<String>>,
}

/// Where the configured directory list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectorySource {
    /// Declared in the project descriptor under `key`
    Descriptor { key: &'static str },
    /// Built-in or tool-config defaults
    Defaults,
}

impl fmt::Display for DirectorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Descriptor { key } => write!(f, "{} (package.json)", key),
            Self::Defaults => write!(f, "defaults"),
        }
    }
}

/// Ordered, deduplicated set of directories to cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub directories: Vec<String>,
    pub source: DirectorySource,
}

/// Resolve the directories to cache for a project.
///
/// A missing descriptor is not an error: the defaults are returned and an
/// advisory is logged. A descriptor that exists but cannot be parsed, or that
/// lists invalid paths, fails with `ConfigParse`.
pub async fn resolve_directories(
    descriptor_path: &Path,
    defaults: &[String],
) -> DepstashResult<Resolution> {
    let content = match tokio::fs::read_to_string(descriptor_path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("No {} found", file_label(descriptor_path));
            return defaults_resolution(defaults);
        }
        Err(e) => {
            return Err(DepstashError::io(
                format!("reading {}", descriptor_path.display()),
                e,
            ))
        }
    };

    let resolution = parse_descriptor(&content, descriptor_path, defaults)?;
    debug!(
        "Resolved {} cache directories from {}",
        resolution.directories.len(),
        resolution.source
    );
    Ok(resolution)
}

/// Parse descriptor content; `path` is only used for error messages
pub fn parse_descriptor(
    content: &str,
    path: &Path,
    defaults: &[String],
) -> DepstashResult<Resolution> {
    let keys: DescriptorKeys =
        serde_json::from_str(content).map_err(|e| DepstashError::ConfigParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let candidates = [keys.cache_directories, keys.legacy_cache_directories];
    for (key, dirs) in DESCRIPTOR_KEYS.into_iter().zip(candidates) {
        let Some(dirs) = dirs.filter(|d| !d.is_empty()) else {
            continue;
        };

        let directories = normalize_all(&dirs).map_err(|reason| DepstashError::ConfigParse {
            path: path.to_path_buf(),
            reason: format!("{}: {}", key, reason),
        })?;

        return Ok(Resolution {
            directories,
            source: DirectorySource::Descriptor { key },
        });
    }

    defaults_resolution(defaults)
}

fn defaults_resolution(defaults: &[String]) -> DepstashResult<Resolution> {
    let directories = normalize_all(defaults).map_err(|reason| DepstashError::ConfigParse {
        path: PathBuf::from("[cache] default_directories"),
        reason,
    })?;

    Ok(Resolution {
        directories,
        source: DirectorySource::Defaults,
    })
}

/// Normalize every entry and drop duplicates, keeping first occurrences
fn normalize_all(raw: &[String]) -> Result<Vec<String>, String> {
    let mut directories: Vec<String> = Vec::with_capacity(raw.len());
    for entry in raw {
        let normalized = normalize_relative(entry)?;
        if !directories.contains(&normalized) {
            directories.push(normalized);
        }
    }
    Ok(directories)
}

/// Normalize a configured directory to a clean `/`-separated relative path.
///
/// Rejects empty, absolute, and parent-escaping paths so that a stored tree
/// can never land outside the cache or build root.
pub fn normalize_relative(raw: &str) -> Result<String, String> {
    let mut parts: Vec<String> = Vec::new();

    for component in Path::new(raw.trim()).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(format!("'{}' must not contain '..'", raw));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(format!("'{}' must be a relative path", raw));
            }
        }
    }

    if parts.is_empty() {
        return Err(format!("'{}' does not name a directory", raw));
    }

    Ok(parts.join("/"))
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
