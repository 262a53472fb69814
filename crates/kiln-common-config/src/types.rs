//! Configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KilnConfig {
    /// External image builder configuration.
    pub builder: BuilderConfig,
    /// Image registry lookup configuration.
    pub registry: RegistryConfig,
}

/// External builder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Builder executable, resolved through `PATH` when relative.
    pub binary: String,
    /// Builder type stamped into every plan.
    #[serde(rename = "type")]
    pub builder_type: String,
    /// Directory scratch directories are created in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            binary: "packer".to_string(),
            builder_type: "amazon-ebs".to_string(),
            work_dir: None,
        }
    }
}

impl BuilderConfig {
    /// Scratch root, falling back to the OS temp dir.
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Image registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Cloud CLI executable.
    pub binary: String,
    /// Named credentials profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    /// Region override; takes precedence over the environment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            binary: "aws".to_string(),
            profile: None,
            region: None,
        }
    }
}
