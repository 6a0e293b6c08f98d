//! Configuration schema for depstash
//!
//! Configuration is stored at `~/.config/depstash/config.toml`

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache directory selection
    pub cache: CacheConfig,

    /// Toolchain signature probing
    pub signature: SignatureConfig,

    /// Package manager install step
    pub install: InstallConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Which directories get cached when the project does not say
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directories cached when the descriptor declares none
    pub default_directories: Vec<String>,

    /// Project descriptor file name, relative to the build directory
    pub descriptor: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_directories: vec![
                ".npm".to_string(),
                ".cache/yarn".to_string(),
                "bower_components".to_string(),
            ],
            descriptor: "package.json".to_string(),
        }
    }
}

/// Binaries whose versions gate cache reuse
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureConfig {
    /// Probed in order; any change invalidates the whole cache
    pub binaries: Vec<String>,

    /// Argument that makes each binary print its version
    pub version_arg: String,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            binaries: vec!["node".to_string(), "npm".to_string(), "yarn".to_string()],
            version_arg: "--version".to_string(),
        }
    }
}

/// Install step settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Environment variable holding the Node installation root
    pub node_home_env: String,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            node_home_env: "NODE_HOME".to_string(),
        }
    }
}
