//! Template error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading templates or compiling plans.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("templates directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("template not found: {name}")]
    NotFound { name: String, available: Vec<String> },

    #[error("invalid setting '{setting}': {reason}")]
    InvalidSetting { setting: String, reason: String },

    #[error(transparent)]
    Core(#[from] kiln_common_core::Error),
}

impl TemplateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;
