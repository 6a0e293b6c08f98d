use super::{InstallOutcome, Installer};
use crate::error::DepstashResult;
use crate::process::CommandSpec;
use tracing::info;

const DESCRIPTOR: &str = "package.json";
const SHRINKWRAP: &str = "npm-shrinkwrap.json";

impl Installer {
    pub(super) async fn npm_install(&self, vendored: bool) -> DepstashResult<InstallOutcome> {
        if !self.build_dir.join(DESCRIPTOR).is_file() {
            info!("Skipping (no package.json)");
            return Ok(InstallOutcome::Skipped {
                reason: "no package.json".to_string(),
            });
        }

        let source = if self.build_dir.join(SHRINKWRAP).is_file() {
            "package.json + shrinkwrap"
        } else {
            "package.json"
        };

        if vendored {
            info!("Prebuild detected (node_modules already exists)");
            self.npm_rebuild().await?;

            info!("Installing any new modules ({})", source);
            let spec = self
                .npm(["install", "--unsafe-perm", "--userconfig"])
                .args([self.build_path(".npmrc")]);
            self.runner.run(&spec).await?;
            return Ok(InstallOutcome::Rebuilt);
        }

        info!("Installing node modules ({})", source);
        let spec = self
            .npm(["install", "--unsafe-perm", "--userconfig"])
            .args([self.build_path(".npmrc"), "--cache".to_string(), self.build_path(".npm")]);
        self.runner.run(&spec).await?;

        Ok(InstallOutcome::Installed {
            source: source.to_string(),
        })
    }

    async fn npm_rebuild(&self) -> DepstashResult<()> {
        info!("Rebuilding any native modules");
        let mut spec = self.npm(["rebuild"]);
        if let Some(ref home) = self.node_home {
            spec = spec.args([format!("--nodedir={}", home)]);
        }
        self.runner.run(&spec).await
    }

    fn npm<const N: usize>(&self, args: [&str; N]) -> CommandSpec {
        CommandSpec::new("npm")
            .args(args)
            .current_dir(&self.build_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::process::fake::ScriptedRunner;
    use std::fs;
    use tempfile::TempDir;

    fn setup(files: &[&str]) -> (TempDir, Arc<ScriptedRunner>, Installer) {
        let dir = TempDir::new().unwrap();
        for file in files {
            fs::write(dir.path().join(file), "{}").unwrap();
        }
        let runner = Arc::new(ScriptedRunner::new());
        let installer = Installer::new(
            runner.clone(),
            dir.path(),
            Some("/tmp/node".to_string()),
        );
        (dir, runner, installer)
    }

    #[tokio::test]
    async fn skips_without_package_json() {
        let (_dir, runner, installer) = setup(&[]);

        let outcome = installer.install(PackageTool::Npm, false).await.unwrap();

        assert!(matches!(outcome, InstallOutcome::Skipped { .. }));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn fresh_install_uses_build_local_cache() {
        let (dir, runner, installer) = setup(&["package.json"]);
        let b = dir.path().display().to_string();

        let outcome = installer.install(PackageTool::Npm, false).await.unwrap();

        assert_eq!(
            outcome,
            InstallOutcome::Installed {
                source: "package.json".to_string()
            }
        );
        assert_eq!(
            runner.command_lines(),
            vec![format!(
                "npm install --unsafe-perm --userconfig {b}/.npmrc --cache {b}/.npm"
            )]
        );
        assert_eq!(runner.calls()[0].dir.as_deref(), Some(dir.path()));
    }

    #[tokio::test]
    async fn shrinkwrap_changes_source_label() {
        let (_dir, _runner, installer) = setup(&["package.json", "npm-shrinkwrap.json"]);

        let outcome = installer.install(PackageTool::Npm, false).await.unwrap();

        assert_eq!(
            outcome,
            InstallOutcome::Installed {
                source: "package.json + shrinkwrap".to_string()
            }
        );
    }

    #[tokio::test]
    async fn vendored_modules_are_rebuilt_first() {
        let (dir, runner, installer) = setup(&["package.json"]);
        let b = dir.path().display().to_string();

        let outcome = installer.install(PackageTool::Npm, true).await.unwrap();

        assert_eq!(outcome, InstallOutcome::Rebuilt);
        assert_eq!(
            runner.command_lines(),
            vec![
                "npm rebuild --nodedir=/tmp/node".to_string(),
                format!("npm install --unsafe-perm --userconfig {b}/.npmrc"),
            ]
        );
    }

    #[tokio::test]
    async fn install_failure_propagates() {
        let (_dir, runner, installer) = setup(&["package.json"]);
        runner.exit("npm", 1);

        let err = installer.install(PackageTool::Npm, false).await.unwrap_err();
        assert!(err.is_nonzero_exit());
    }
}
