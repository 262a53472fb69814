//! Source image lookup.
//!
//! A template with a base is built on top of the most recent image of its
//! parent. This crate finds that image through the cloud provider's API.

pub mod cloud;
pub mod error;
pub mod registry;

pub use cloud::{AwsCli, CloudApi, ImageRecord};
pub use error::{RegistryError, Result};
pub use registry::{account_from_arn, ImageRegistry};
