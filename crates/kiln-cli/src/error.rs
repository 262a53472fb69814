//! CLI error handling and formatting.

use std::fmt::Write as _;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use kiln_builder::ExecutorError;
use kiln_common_config::{ConfigError, EnvError};
use kiln_registry::RegistryError;
use kiln_template::TemplateError;
use thiserror::Error;

/// Application exit codes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Success = 0,
    GeneralError = 1,
    ConfigError = 2,
    IoError = 3,
    RegistryError = 4,
    ValidationError = 5,
    NotFound = 6,
    BuildFailed = 8,
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit as u8)
    }
}

/// CLI error type with rich context
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        hint: Option<String>,
    },

    #[error("{message}")]
    Io {
        message: String,
        #[source]
        source: io::Error,
        path: Option<PathBuf>,
    },

    #[error("{message}")]
    Registry {
        message: String,
        #[source]
        source: RegistryError,
    },

    #[error("{message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("{message}")]
    NotFound {
        message: String,
        resource_type: String,
        resource_name: String,
        suggestions: Vec<String>,
    },

    /// One entry per failed template, each naming where its logs are.
    #[error("{message}")]
    Build {
        message: String,
        failures: Vec<String>,
    },

    #[error("{message}")]
    User {
        message: String,
        hint: Option<String>,
    },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Get the error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "E001",
            Self::Io { .. } => "E002",
            Self::Registry { .. } => "E003",
            Self::Validation { .. } => "E004",
            Self::NotFound { .. } => "E005",
            Self::Build { .. } => "E007",
            Self::User { .. } => "E010",
            Self::Other(_) => "E999",
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> Exit {
        match self {
            Self::Config { .. } => Exit::ConfigError,
            Self::Io { .. } => Exit::IoError,
            Self::Registry { .. } => Exit::RegistryError,
            Self::Validation { .. } => Exit::ValidationError,
            Self::NotFound { .. } => Exit::NotFound,
            Self::Build { .. } => Exit::BuildFailed,
            Self::User { .. } | Self::Other(_) => Exit::GeneralError,
        }
    }

    /// Get hint for this error if available
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Config { hint, .. } | Self::User { hint, .. } => hint.as_deref(),
            Self::NotFound { suggestions, .. } if !suggestions.is_empty() => {
                Some("Available templates are listed below")
            }
            Self::Registry {
                source: RegistryError::Spawn { .. },
                ..
            } => Some("Install the aws CLI or set registry.binary in .kiln/config.yaml"),
            _ => None,
        }
    }

    /// Get suggestions for this error
    pub fn suggestions(&self) -> &[String] {
        match self {
            Self::NotFound { suggestions, .. } => suggestions,
            _ => &[],
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
            hint: None,
        }
    }

    /// Create a config error with hint
    pub fn config_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
            hint: Some(hint.into()),
        }
    }

    /// A based template whose parent has no image yet.
    pub fn missing_source(template: &str, base: &str) -> Self {
        Self::config_with_hint(
            format!("no image found for '{base}', the base of '{template}'"),
            format!("build {base} first, or pass --source-ami"),
        )
    }

    /// Create an IO error with path
    pub fn io_with_path(message: impl Into<String>, source: io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            message: message.into(),
            source,
            path: Some(path.into()),
        }
    }

    /// Create a not found error with suggestions
    pub fn not_found_with_suggestions(
        resource_type: impl Into<String>,
        resource_name: impl Into<String>,
        suggestions: Vec<String>,
    ) -> Self {
        let resource_type = resource_type.into();
        let resource_name = resource_name.into();
        Self::NotFound {
            message: format!("{resource_type} not found: {resource_name}"),
            resource_type,
            resource_name,
            suggestions,
        }
    }

    /// Create a user error with hint
    pub fn user_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    /// Render for the terminal: message, details, then hint.
    pub fn report(&self) -> String {
        let mut out = format!("error[{}]: {self}\n", self.code());

        match self {
            Self::Build { failures, .. } => {
                for failure in failures {
                    let _ = writeln!(out, "  - {failure}");
                }
            }
            Self::Io { path: Some(path), .. } => {
                let _ = writeln!(out, "  path: {}", path.display());
            }
            Self::Validation { field: Some(field), .. } => {
                let _ = writeln!(out, "  setting: {field}");
            }
            _ => {}
        }
        for suggestion in self.suggestions() {
            let _ = writeln!(out, "  - {suggestion}");
        }
        if let Some(hint) = self.hint() {
            let _ = writeln!(out, "hint: {hint}");
        }
        out
    }
}

// Conversion implementations
impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: err,
            path: None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config {
            message: format!("Configuration error: {err}"),
            source: Some(Box::new(err)),
            hint: Some("Check .kiln/config.yaml in the templates directory".to_string()),
        }
    }
}

impl From<EnvError> for CliError {
    fn from(err: EnvError) -> Self {
        Self::Config {
            message: format!("Environment error: {err}"),
            source: Some(Box::new(err)),
            hint: Some("Check the .env files in the current directory".to_string()),
        }
    }
}

impl From<kiln_common_core::Error> for CliError {
    fn from(err: kiln_common_core::Error) -> Self {
        match err {
            kiln_common_core::Error::Io(source) => source.into(),
            kiln_common_core::Error::Config(message) => Self::config(message),
            other => Self::Other(other.into()),
        }
    }
}

impl From<TemplateError> for CliError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::NotFound { name, available } => {
                Self::not_found_with_suggestions("template", name, available)
            }
            TemplateError::DirectoryNotFound { path } => Self::user_with_hint(
                format!("templates directory not found: {}", path.display()),
                "Pass the directory holding your templates with --templates-dir",
            ),
            TemplateError::Io { path, source } => {
                Self::io_with_path(format!("failed to read {}: {source}", path.display()), source, path)
            }
            TemplateError::InvalidSetting { setting, reason } => Self::Validation {
                message: format!("invalid setting '{setting}': {reason}"),
                field: Some(setting),
            },
            TemplateError::Core(err) => err.into(),
        }
    }
}

impl From<RegistryError> for CliError {
    fn from(err: RegistryError) -> Self {
        Self::Registry {
            message: format!("Image lookup failed: {err}"),
            source: err,
        }
    }
}

impl From<ExecutorError> for CliError {
    fn from(err: ExecutorError) -> Self {
        let failures: Vec<String> = err
            .failures()
            .into_iter()
            .map(|failure| match failure.scratch() {
                Some(scratch) if !failure.to_string().contains(&*scratch.to_string_lossy()) => {
                    format!("{failure} (scratch: {})", scratch.display())
                }
                _ => failure.to_string(),
            })
            .collect();

        let message = match &err {
            ExecutorError::Subtree { template, completed, .. } => format!(
                "{} template(s) failed below {template}; {} succeeded",
                failures.len(),
                completed.nodes().len()
            ),
            _ => "build failed".to_string(),
        };

        Self::Build { message, failures }
    }
}
