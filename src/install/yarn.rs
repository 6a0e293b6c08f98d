use super::{InstallOutcome, Installer, YARN_LOCKFILE};
use crate::error::DepstashResult;
use crate::process::CommandSpec;
use tracing::{info, warn};

/// Offline mirror directory checked into the application
pub const OFFLINE_MIRROR: &str = "npm-packages-offline-cache";

impl Installer {
    pub(super) async fn yarn_install(&self) -> DepstashResult<InstallOutcome> {
        info!("Installing node modules ({})", YARN_LOCKFILE);

        let mut install = self.yarn(["install", "--pure-lockfile", "--ignore-engines", "--cache-folder"]);
        install = install.args([self.build_path(".cache/yarn")]);

        let mirror = self.build_dir.join(OFFLINE_MIRROR);
        if mirror.is_dir() {
            info!("Found yarn mirror directory {}", mirror.display());
            info!("Running yarn in offline mode");

            let config = self
                .yarn(["config", "set", "yarn-offline-mirror"])
                .args([mirror.to_string_lossy().into_owned()]);
            self.runner.output(&config).await?;

            install = install.args(["--offline"]);
        } else {
            info!("Running yarn in online mode");
            info!("To run yarn in offline mode, see: https://yarnpkg.com/blog/2016/11/24/offline-mirror");
        }

        if let Some(ref home) = self.node_home {
            install = install.env("npm_config_nodedir", home);
        }
        self.runner.run(&install).await?;

        self.yarn_check().await?;

        Ok(InstallOutcome::Installed {
            source: YARN_LOCKFILE.to_string(),
        })
    }

    /// A stale lockfile only warns; failing to run yarn at all is an error
    async fn yarn_check(&self) -> DepstashResult<()> {
        match self.runner.output(&self.yarn(["check"])).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_nonzero_exit() => {
                warn!("yarn.lock is outdated");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn yarn<const N: usize>(&self, args: [&str; N]) -> CommandSpec {
        CommandSpec::new("yarn")
            .args(args)
            .current_dir(&self.build_dir)
    }
}
