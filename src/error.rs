//! Error types for depstash
//!
//! All modules use `DepstashResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for depstash operations
pub type DepstashResult<T> = Result<T, DepstashError>;

/// All errors that can occur in depstash
#[derive(Error, Debug)]
pub enum DepstashError {
    // Toolchain errors
    #[error("Unable to determine {binary} version: {reason}")]
    Probe { binary: String, reason: String },

    // Configuration errors
    #[error("Failed parsing {path}: {reason}")]
    ConfigParse { path: PathBuf, reason: String },

    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Cache errors
    #[error("Cache engine cannot {operation} after {phase}")]
    InvalidState {
        operation: &'static str,
        phase: &'static str,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, exit code: {code:?}, stderr: {stderr}")]
    CommandExecution {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("{0}")]
    User(String),
}

impl DepstashError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(
        command: impl Into<String>,
        code: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandExecution {
            command: command.into(),
            code,
            stderr: stderr.into(),
        }
    }

    /// Create a toolchain probe error
    pub fn probe(binary: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Probe {
            binary: binary.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failing command ran to completion with a non-zero status
    pub fn is_nonzero_exit(&self) -> bool {
        matches!(self, Self::CommandExecution { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Probe { .. } => {
                Some("Make sure the toolchain is on PATH, or adjust [signature] binaries in the config")
            }
            Self::ConfigParse { .. } => {
                Some("cacheDirectories must be an array of relative paths, e.g. [\"node_modules\"]")
            }
            Self::ConfigInvalid { .. } => Some("Run: depstash config init --force"),
            _ => None,
        }
    }
}
