//! Plan command implementation.

use async_trait::async_trait;
use clap::Parser;
use kiln_template::PlanCompiler;

use crate::args::TemplateArgs;
use crate::cli::CommandContext;
use crate::commands::{resolve_source, Execute, Target};
use crate::error::CliError;

/// Print the build plan for a template
#[derive(Debug, Parser)]
pub struct PlanCommand {
    #[command(flatten)]
    pub target: TemplateArgs,
}

#[async_trait]
impl Execute for PlanCommand {
    async fn execute(&self, ctx: &CommandContext) -> Result<(), CliError> {
        let target = Target::load(&self.target)?;
        let source = resolve_source(ctx, &target, self.target.source_ami.as_deref()).await?;

        let plan = PlanCompiler::new(&target.forest, &ctx.plan_context).plan(
            target.id,
            source.as_deref(),
            self.target.recursive,
        );
        println!("{}", plan.to_json_pretty()?);
        Ok(())
    }
}
