//! Environment variable handling.

use std::env;
use std::path::Path;
use thiserror::Error;

/// Environment variable errors.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("failed to load .env file: {0}")]
    DotenvError(#[from] dotenvy::Error),
}

/// Environment variable names.
pub mod vars {
    // Cloud region, in lookup order
    pub const AWS_DEFAULT_REGION: &str = "AWS_DEFAULT_REGION";
    pub const AWS_REGION: &str = "AWS_REGION";
}

/// Variables consulted, first match wins, when a plan has no region.
pub const REGION_CANDIDATES: [&str; 2] = [vars::AWS_DEFAULT_REGION, vars::AWS_REGION];

/// Environment configuration.
pub struct Environment {
    _guard: (), // Prevent construction outside module
}

impl Environment {
    /// Initialize environment from `.env` files in the current directory.
    pub fn init() -> Result<Self, EnvError> {
        let cwd = env::current_dir().unwrap_or_default();
        Self::init_in(&cwd)
    }

    /// Initialize environment from `.env` files in `dir`.
    ///
    /// Variables already set in the process environment are never overridden.
    pub fn init_in(dir: &Path) -> Result<Self, EnvError> {
        for name in [".env", ".env.local"] {
            let path = dir.join(name);
            if path.is_file() {
                dotenvy::from_path(&path)?;
            }
        }

        Ok(Self { _guard: () })
    }

    /// Region from the process environment.
    pub fn region() -> Option<String> {
        region_from(|var| env::var(var).ok())
    }
}

/// Resolve a region through [`REGION_CANDIDATES`] using `lookup`.
///
/// Empty values are skipped.
pub fn region_from<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    REGION_CANDIDATES
        .iter()
        .filter_map(|var| lookup(var))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}
