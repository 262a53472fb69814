//! Image templates for kiln.
//!
//! A templates directory holds one subdirectory per template. Templates
//! either carry their own builder configuration (`ami`) or name a `base`
//! template they inherit from, which makes the loaded set a forest.
//! [`TemplateLoader`] builds that forest and [`PlanCompiler`] turns any node
//! of it into a [`PlanDocument`] for the external builder.

pub mod definition;
pub mod error;
pub mod loader;
pub mod plan;
pub mod scripts;
pub mod template;
pub mod value;

pub use definition::TemplateDefinition;
pub use error::{Result, TemplateError};
pub use loader::{LoadReport, LoadWarning, TemplateLoader};
pub use plan::{Plan, PlanCompiler, PlanContext, PlanDocument, Provisioner};
pub use template::{Template, TemplateForest, TemplateId};
pub use value::{merge_deep, parse_setting_pair, Settings, Value};
