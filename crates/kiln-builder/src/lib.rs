//! Build execution for kiln.
//!
//! For each template the executor prepares a scratch directory with the
//! template's static inputs, the provisioning scripts and the compiled plan,
//! then runs `<builder> <command> plan.json` there. Builds of a template's
//! children start once the template's own image exists.

pub mod error;
pub mod executor;
pub mod output;
pub mod scratch;

pub use error::{ExecutorError, Result};
pub use executor::{BuildExecutor, BuildOutcome, BuilderCommand, ExecutorConfig, NodeOutcome};
pub use output::extract_image_id;
pub use scratch::Scratch;
