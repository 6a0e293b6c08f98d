//! Command runner abstraction and the tokio-backed implementation

use crate::error::{DepstashError, DepstashResult};
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// A single external program invocation
///
/// Environment overrides apply to this invocation only; the runner never
/// touches the process-wide environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// Working directory (inherits the current one when `None`)
    pub dir: Option<PathBuf>,
    /// Program name or path
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Extra environment variables for the child
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    /// Create a spec for `program` with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Append arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Add an environment override
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(ref dir) = self.dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured output of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Abstract command execution interface
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion capturing stdout/stderr.
    ///
    /// Fails with `CommandFailed` when the program cannot be spawned and with
    /// `CommandExecution` when it exits non-zero.
    async fn output(&self, spec: &CommandSpec) -> DepstashResult<CommandOutput>;

    /// Run to completion with stdout/stderr inherited from this process
    async fn run(&self, spec: &CommandSpec) -> DepstashResult<()>;
}

/// Runs commands on the host with `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn output(&self, spec: &CommandSpec) -> DepstashResult<CommandOutput> {
        debug!("Running: {}", spec);

        let output = spec
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| DepstashError::command_failed(spec.to_string(), e))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return Err(DepstashError::command_exec(
                spec.to_string(),
                output.status.code(),
                stderr.trim(),
            ));
        }

        Ok(CommandOutput { stdout, stderr })
    }

    async fn run(&self, spec: &CommandSpec) -> DepstashResult<()> {
        debug!("Running: {}", spec);

        let status = spec
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| DepstashError::command_failed(spec.to_string(), e))?;

        if status.success() {
            Ok(())
        } else {
            Err(DepstashError::command_exec(
                spec.to_string(),
                status.code(),
                String::new(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_display() {
        let spec = CommandSpec::new("npm").args(["install", "--unsafe-perm"]);
        assert_eq!(spec.to_string(), "npm install --unsafe-perm");
    }

    #[test]
    fn spec_builder_collects_env() {
        let spec = CommandSpec::new("yarn")
            .current_dir("/tmp/app")
            .env("npm_config_nodedir", "/opt/node");

        assert_eq!(spec.dir, Some(PathBuf::from("/tmp/app")));
        assert_eq!(
            spec.env,
            vec![("npm_config_nodedir".to_string(), "/opt/node".to_string())]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn output_captures_stdout() {
        let spec = CommandSpec::new("sh").args(["-c", "echo v1.2.3"]);
        let out = SystemRunner.output(&spec).await.unwrap();
        assert_eq!(out.stdout.trim(), "v1.2.3");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn output_passes_env_override() {
        let spec = CommandSpec::new("sh")
            .args(["-c", "printf %s \"$DEPSTASH_TEST_VALUE\""])
            .env("DEPSTASH_TEST_VALUE", "scoped");
        let out = SystemRunner.output(&spec).await.unwrap();
        assert_eq!(out.stdout, "scoped");
        assert!(std::env::var("DEPSTASH_TEST_VALUE").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_execution_error() {
        let spec = CommandSpec::new("sh").args(["-c", "echo boom >&2; exit 3"]);
        let err = SystemRunner.output(&spec).await.unwrap_err();
        match err {
            DepstashError::CommandExecution { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let spec = CommandSpec::new("depstash-definitely-not-a-binary");
        let err = SystemRunner.output(&spec).await.unwrap_err();
        assert!(matches!(err, DepstashError::CommandFailed { .. }));
    }
}
