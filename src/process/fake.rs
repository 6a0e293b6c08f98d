//! Scripted command runner for tests

use super::{CommandOutput, CommandRunner, CommandSpec};
use crate::error::{DepstashError, DepstashResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum Response {
    Stdout(String),
    Exit(i32),
    Missing,
}

/// Answers commands from a table keyed by full command line, then by program.
/// Unscripted commands succeed with empty output.
#[derive(Debug, Default)]
pub(crate) struct ScriptedRunner {
    responses: Mutex<HashMap<String, Response>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Node toolchain that reports fixed versions
    pub(crate) fn with_versions(node: &str, npm: &str, yarn: &str) -> Self {
        let runner = Self::new();
        runner.set_version("node", node);
        runner.set_version("npm", npm);
        runner.set_version("yarn", yarn);
        runner
    }

    pub(crate) fn set_version(&self, program: &str, version: &str) {
        self.stdout(&format!("{} --version", program), &format!("{}\n", version));
    }

    pub(crate) fn stdout(&self, key: &str, stdout: &str) {
        self.respond(key, Response::Stdout(stdout.to_string()));
    }

    pub(crate) fn exit(&self, key: &str, code: i32) {
        self.respond(key, Response::Exit(code));
    }

    pub(crate) fn missing(&self, key: &str) {
        self.respond(key, Response::Missing);
    }

    pub(crate) fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(|c| c.to_string()).collect()
    }

    fn respond(&self, key: &str, response: Response) {
        self.responses
            .lock()
            .unwrap()
            .insert(key.to_string(), response);
    }

    fn answer(&self, spec: &CommandSpec) -> DepstashResult<CommandOutput> {
        self.calls.lock().unwrap().push(spec.clone());

        let line = spec.to_string();
        let responses = self.responses.lock().unwrap();
        let response = responses
            .get(&line)
            .or_else(|| responses.get(&spec.program))
            .cloned();

        match response {
            None => Ok(CommandOutput::default()),
            Some(Response::Stdout(stdout)) => Ok(CommandOutput {
                stdout,
                stderr: String::new(),
            }),
            Some(Response::Exit(code)) => Err(DepstashError::command_exec(line, Some(code), "")),
            Some(Response::Missing) => Err(DepstashError::command_failed(
                line,
                std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
            )),
        }
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn output(&self, spec: &CommandSpec) -> DepstashResult<CommandOutput> {
        self.answer(spec)
    }

    async fn run(&self, spec: &CommandSpec) -> DepstashResult<()> {
        self.answer(spec).map(|_| ())
    }
}
