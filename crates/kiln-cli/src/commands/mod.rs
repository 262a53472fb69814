//! Command implementations.

mod build;
mod list;
mod plan;
mod validate;

pub use build::BuildCommand;
pub use list::ListCommand;
pub use plan::PlanCommand;
pub use validate::ValidateCommand;

use async_trait::async_trait;
use kiln_registry::{AwsCli, ImageRegistry};
use kiln_template::{TemplateForest, TemplateId, TemplateLoader};
use std::sync::Arc;
use tracing::{debug, info};

use crate::args::TemplateArgs;
use crate::cli::CommandContext;
use crate::error::CliError;

/// A subcommand that can be run
#[async_trait]
pub trait Execute {
    async fn execute(&self, ctx: &CommandContext) -> Result<(), CliError>;
}

/// The loaded forest and the template a command targets.
pub(crate) struct Target {
    pub forest: TemplateForest,
    pub id: TemplateId,
}

impl Target {
    /// Load the templates directory with the settings overlay and look up
    /// the named template.
    pub fn load(args: &TemplateArgs) -> Result<Self, CliError> {
        let report = TemplateLoader::new(&args.dir.templates_dir)
            .with_settings(args.overlay())
            .load()?;
        if !report.warnings.is_empty() {
            debug!(count = report.warnings.len(), "Templates skipped while loading");
        }

        let id = report.forest.require(&args.template)?;
        Ok(Self {
            forest: report.forest,
            id,
        })
    }

    pub fn name(&self) -> &str {
        self.forest.get(self.id).name()
    }
}

/// Source image for the target: the explicit one when given, otherwise
/// the newest image of its base. Templates without a base need none.
pub(crate) async fn resolve_source(
    ctx: &CommandContext,
    target: &Target,
    explicit: Option<&str>,
) -> Result<Option<String>, CliError> {
    if let Some(source) = explicit {
        return Ok(Some(source.to_string()));
    }
    let Some(parent) = target.forest.get(target.id).parent() else {
        return Ok(None);
    };

    let registry = ImageRegistry::new(Arc::new(AwsCli::from_config(&ctx.config.registry)));
    match registry.resolve_source(&target.forest, target.id).await? {
        Some(image) => {
            info!(template = %target.name(), image = %image, "Resolved source image");
            Ok(Some(image))
        }
        None => Err(CliError::missing_source(
            target.name(),
            target.forest.get(parent).name(),
        )),
    }
}
