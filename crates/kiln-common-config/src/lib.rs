//! Configuration types for kiln.
//!
//! This crate provides the configuration types used by kiln for
//! `.kiln/config.yaml` files, plus the environment lookups the
//! plan compiler depends on.

pub mod types;
pub mod loader;
pub mod env;

#[cfg(test)]
mod integration_test;

pub use types::*;
pub use loader::*;
pub use env::*;
