//! kiln CLI library
//!
//! Argument definitions, commands and error reporting for the `kiln` binary.

pub mod args;
pub mod cli;
pub mod commands;
pub mod error;

pub use error::{CliError, Exit};
