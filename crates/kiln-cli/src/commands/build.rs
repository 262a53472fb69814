//! Build command implementation.

use async_trait::async_trait;
use clap::Parser;
use kiln_builder::{BuildExecutor, BuilderCommand, ExecutorConfig, ExecutorError, NodeOutcome};
use tracing::info;

use crate::args::TemplateArgs;
use crate::cli::CommandContext;
use crate::commands::{resolve_source, Execute, Target};
use crate::error::CliError;

/// Build the image for a template
#[derive(Debug, Parser)]
pub struct BuildCommand {
    #[command(flatten)]
    pub target: TemplateArgs,
}

#[async_trait]
impl Execute for BuildCommand {
    async fn execute(&self, ctx: &CommandContext) -> Result<(), CliError> {
        run_builder(ctx, &self.target, BuilderCommand::Build, |node| {
            if let Some(image) = &node.image_id {
                println!("{}: {image}", node.template);
            }
        })
        .await
    }
}

/// Resolve the source image and drive the builder over the target.
///
/// `report` sees every template that succeeded, including those of a
/// partially failed recursive run.
pub(crate) async fn run_builder(
    ctx: &CommandContext,
    args: &TemplateArgs,
    command: BuilderCommand,
    report: fn(&NodeOutcome),
) -> Result<(), CliError> {
    let target = Target::load(args)?;
    let source = resolve_source(ctx, &target, args.source_ami.as_deref()).await?;
    let id = target.id;

    let executor = BuildExecutor::new(
        target.forest,
        ctx.plan_context.clone(),
        ExecutorConfig::from_config(&ctx.config.builder),
    );
    match executor.run(id, command, source, args.recursive).await {
        Ok(outcome) => {
            outcome.nodes().iter().for_each(report);
            info!(templates = outcome.nodes().len(), "{command} finished");
            Ok(())
        }
        Err(e) => {
            if let ExecutorError::Subtree { completed, .. } = &e {
                completed.nodes().iter().for_each(report);
            }
            Err(e.into())
        }
    }
}
