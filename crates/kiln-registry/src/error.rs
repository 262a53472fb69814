//! Registry error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from identity and image lookups.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to run {}: {source}", binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("unexpected response from `{command}`: {source}")]
    Response {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not determine the account id: {reason}")]
    IdentityUnavailable { reason: String },
}

/// Result alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
