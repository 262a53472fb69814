//! Validate command implementation.

use async_trait::async_trait;
use clap::Parser;
use kiln_builder::BuilderCommand;

use crate::args::TemplateArgs;
use crate::cli::CommandContext;
use crate::commands::build::run_builder;
use crate::commands::Execute;
use crate::error::CliError;

/// Check a template's plan with the builder without building anything
#[derive(Debug, Parser)]
pub struct ValidateCommand {
    #[command(flatten)]
    pub target: TemplateArgs,
}

#[async_trait]
impl Execute for ValidateCommand {
    async fn execute(&self, ctx: &CommandContext) -> Result<(), CliError> {
        run_builder(ctx, &self.target, BuilderCommand::Validate, |node| {
            println!("{}: ok", node.template);
        })
        .await
    }
}
