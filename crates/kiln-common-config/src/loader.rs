//! Configuration file loading and parsing.

use crate::types::KilnConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Location of the config file relative to the templates directory.
pub const CONFIG_FILE: &str = ".kiln/config.yaml";

/// Config loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read config: {source}")]
    ReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("invalid YAML at line {}: {message}", line.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    ParseError { line: Option<usize>, message: String },

    #[error("validation error: {message}")]
    ValidationError { message: String },

    #[error("environment variable not found: {var}")]
    EnvVarNotFound { var: String },
}

/// Configuration loader.
pub struct ConfigLoader {
    config_path: PathBuf,
    required: bool,
}

impl ConfigLoader {
    /// Create a loader for `.kiln/config.yaml` under the given directory.
    ///
    /// A missing file yields the defaults.
    pub fn new(templates_dir: impl AsRef<Path>) -> Self {
        Self {
            config_path: templates_dir.as_ref().join(CONFIG_FILE),
            required: false,
        }
    }

    /// Create a loader for an explicit file, which must exist.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            required: true,
        }
    }

    /// Path this loader reads.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Load configuration.
    pub fn load(&self) -> Result<KilnConfig, ConfigError> {
        if !self.config_path.exists() {
            if self.required {
                return Err(ConfigError::NotFound {
                    path: self.config_path.clone(),
                });
            }
            return Ok(KilnConfig::default());
        }

        let contents = std::fs::read_to_string(&self.config_path)?;
        let expanded = self.expand_env_vars(&contents)?;

        // An empty file deserializes to unit, not a mapping.
        if expanded.trim().is_empty() {
            return Ok(KilnConfig::default());
        }

        let config: KilnConfig = serde_yaml::from_str(&expanded)
            .map_err(|e| ConfigError::ParseError {
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;

        self.validate(&config)?;
        Ok(config)
    }

    /// Expand environment variables in the form `${VAR}` or `${VAR:-default}`.
    fn expand_env_vars(&self, content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();
        let re = regex::Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}").unwrap();

        for cap in re.captures_iter(content) {
            let full_match = cap.get(0).unwrap().as_str();
            let var_name = &cap[1];
            let default = cap.get(2).map(|m| m.as_str());

            let value = match std::env::var(var_name) {
                Ok(v) => v,
                Err(_) => match default {
                    Some(d) => d.to_string(),
                    None => {
                        return Err(ConfigError::EnvVarNotFound {
                            var: var_name.to_string(),
                        })
                    }
                },
            };

            result = result.replace(full_match, &value);
        }

        Ok(result)
    }

    /// Validate configuration values.
    fn validate(&self, config: &KilnConfig) -> Result<(), ConfigError> {
        if config.builder.binary.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "builder.binary must not be empty".to_string(),
            });
        }

        if config.builder.builder_type.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "builder.type must not be empty".to_string(),
            });
        }

        if config.registry.binary.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "registry.binary must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_default())
    }
}
