//! Toolchain version signature
//!
//! The cache is only reusable under the exact toolchain that produced it:
//! native modules compiled against one Node version are not assumed to load
//! under another. Each configured binary is asked for its version and the
//! answers are joined into one comparable string.

use crate::config::schema::SignatureConfig;
use crate::error::{DepstashError, DepstashResult};
use crate::process::{CommandRunner, CommandSpec};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

const SEPARATOR: &str = "; ";

/// Fingerprint of the installed toolchain versions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BinarySignature(String);

impl BinarySignature {
    /// Wrap an already-computed signature string
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BinarySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Probe every configured binary and build the signature.
///
/// Any binary that cannot be run, exits non-zero, or prints nothing is a
/// `Probe` error. An unknown toolchain is never treated as a match.
pub async fn compute_signature(
    runner: &dyn CommandRunner,
    config: &SignatureConfig,
) -> DepstashResult<BinarySignature> {
    let mut parts = Vec::with_capacity(config.binaries.len());

    for binary in &config.binaries {
        let version = probe_version(runner, binary, &config.version_arg).await?;
        debug!("{} version: {}", binary, version);
        parts.push(format!("{}={}", binary, version));
    }

    Ok(BinarySignature(parts.join(SEPARATOR)))
}

async fn probe_version(
    runner: &dyn CommandRunner,
    binary: &str,
    version_arg: &str,
) -> DepstashResult<String> {
    let spec = CommandSpec::new(binary).args([version_arg]);
    let output = runner
        .output(&spec)
        .await
        .map_err(|e| DepstashError::probe(binary, e.to_string()))?;

    let version = output.stdout.trim();
    if version.is_empty() {
        return Err(DepstashError::probe(binary, "empty version output"));
    }

    Ok(version.to_string())
}
