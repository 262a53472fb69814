//! Executor error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::executor::BuildOutcome;

/// Errors from running the external builder.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("failed to prepare {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write plan: {0}")]
    Plan(#[from] kiln_common_core::Error),

    #[error("{template}: failed to start {}: {source}", binary.display())]
    Spawn {
        template: String,
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{template}: builder exited with {status}; logs in {}", scratch.display())]
    NonZeroExit {
        template: String,
        status: String,
        scratch: PathBuf,
    },

    #[error("{template}: builder succeeded but printed no image id; see {}", log.display())]
    MissingImageId { template: String, log: PathBuf },

    #[error("{template}: task aborted: {message}")]
    Aborted { template: String, message: String },

    #[error("{} failure(s) below {template}", failures.len())]
    Subtree {
        template: String,
        completed: BuildOutcome,
        failures: Vec<ExecutorError>,
    },
}

impl ExecutorError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Failures of individual templates, with subtree aggregates flattened.
    pub fn failures(&self) -> Vec<&ExecutorError> {
        match self {
            Self::Subtree { failures, .. } => failures.iter().flat_map(|f| f.failures()).collect(),
            other => vec![other],
        }
    }

    /// Scratch directory to inspect, when the failure has one.
    pub fn scratch(&self) -> Option<PathBuf> {
        match self {
            Self::NonZeroExit { scratch, .. } => Some(scratch.clone()),
            Self::MissingImageId { log, .. } => log.parent().map(PathBuf::from),
            _ => None,
        }
    }
}

/// Result alias for executor operations.
pub type Result<T> = std::result::Result<T, ExecutorError>;
