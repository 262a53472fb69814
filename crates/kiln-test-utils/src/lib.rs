//! Test utilities for kiln crates.

mod builder;
mod tree;

pub use builder::{fake_cloud_cli, FakeBuilder, InstalledBuilder, Invocation};
pub use tree::TemplateTree;

/// Assert that a Result is Ok and return the value.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}
