//! Dependency install step run between restore and save
//!
//! The package tool is picked once per build from the lockfiles present in
//! the build directory and threaded through the install.

mod npm;
mod yarn;

use crate::error::{DepstashError, DepstashResult};
use crate::process::CommandRunner;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Lockfile that selects yarn over npm
pub const YARN_LOCKFILE: &str = "yarn.lock";

/// Package manager used for the install step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageTool {
    Npm,
    Yarn,
}

impl PackageTool {
    /// `Yarn` when the build directory carries a `yarn.lock`
    pub fn detect(build_dir: &Path) -> Self {
        if build_dir.join(YARN_LOCKFILE).is_file() {
            Self::Yarn
        } else {
            Self::Npm
        }
    }

    pub fn binary(&self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Yarn => "yarn",
        }
    }
}

impl fmt::Display for PackageTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.binary())
    }
}

/// What the install step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Nothing to install
    Skipped { reason: String },
    /// Vendored modules were rebuilt, then topped up
    Rebuilt,
    /// A fresh install from the named source
    Installed { source: String },
}

/// Whether `node_modules` was shipped with the application.
///
/// Must be called before restore, otherwise restored modules look vendored.
pub fn has_vendored_modules(build_dir: &Path) -> bool {
    build_dir.join("node_modules").is_dir()
}

/// True when `node_modules` exists but holds no packages
pub fn vendored_modules_empty(build_dir: &Path) -> DepstashResult<bool> {
    let dir = build_dir.join("node_modules");
    let entries = std::fs::read_dir(&dir)
        .map_err(|e| DepstashError::io(format!("reading {}", dir.display()), e))?;

    for entry in entries {
        let entry = entry
            .map_err(|e| DepstashError::io(format!("reading {}", dir.display()), e))?;
        if entry.path().is_dir() {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Runs the package tool against a build directory
pub struct Installer {
    runner: Arc<dyn CommandRunner>,
    build_dir: PathBuf,
    node_home: Option<String>,
}

impl Installer {
    /// `node_home` is forwarded as `--nodedir` / `npm_config_nodedir` when set
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        build_dir: impl Into<PathBuf>,
        node_home: Option<String>,
    ) -> Self {
        Self {
            runner,
            build_dir: build_dir.into(),
            node_home: node_home.filter(|home| !home.is_empty()),
        }
    }

    /// Install dependencies with `tool`. `vendored` must reflect the build
    /// directory as it was before restore.
    pub async fn install(&self, tool: PackageTool, vendored: bool) -> DepstashResult<InstallOutcome> {
        match tool {
            PackageTool::Npm => self.npm_install(vendored).await,
            PackageTool::Yarn => self.yarn_install().await,
        }
    }

    fn build_path(&self, rel: &str) -> String {
        self.build_dir.join(rel).to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn detects_yarn_from_lockfile() {
        let dir = TempDir::new().unwrap();
        assert_eq!(PackageTool::detect(dir.path()), PackageTool::Npm);

        fs::write(dir.path().join("yarn.lock"), "# yarn lockfile v1\n").unwrap();
        assert_eq!(PackageTool::detect(dir.path()), PackageTool::Yarn);
    }

    #[test]
    fn vendored_detection() {
        let dir = TempDir::new().unwrap();
        assert!(!has_vendored_modules(dir.path()));

        fs::create_dir(dir.path().join("node_modules")).unwrap();
        assert!(has_vendored_modules(dir.path()));
        assert!(vendored_modules_empty(dir.path()).unwrap());

        fs::write(dir.path().join("node_modules/.yarn-integrity"), "{}").unwrap();
        assert!(vendored_modules_empty(dir.path()).unwrap());

        fs::create_dir(dir.path().join("node_modules/express")).unwrap();
        assert!(!vendored_modules_empty(dir.path()).unwrap());
    }

    #[test]
    fn empty_node_home_is_ignored() {
        let runner = Arc::new(crate::process::fake::ScriptedRunner::new());
        let installer = Installer::new(runner, "/tmp/app", Some(String::new()));
        assert!(installer.node_home.is_none());
    }
}
