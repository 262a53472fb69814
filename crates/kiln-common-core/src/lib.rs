//! kiln common core types and utilities.

pub mod error;
pub mod stamp;

pub use error::{Error, Result};
pub use stamp::BuildStamp;

/// Placeholder used wherever a source image id is only known at build time.
pub const COMPUTED: &str = "<computed>";
