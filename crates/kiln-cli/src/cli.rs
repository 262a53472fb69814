//! CLI argument definitions using clap derive macros.

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand, ValueHint};
use kiln_common_config::{ConfigLoader, Environment, KilnConfig};
use kiln_common_core::BuildStamp;
use kiln_template::PlanContext;
use tracing::debug;

use crate::commands::{BuildCommand, Execute, ListCommand, PlanCommand, ValidateCommand};
use crate::error::CliError;

/// kiln - machine images from a tree of templates
///
/// Renders image templates into builder plans and runs the builder over a
/// template and, optionally, everything derived from it.
#[derive(Debug, Parser)]
#[command(
    name = "kiln",
    author,
    version,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Increase verbosity level (-v, -vv, -vvv)
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase verbosity level"
    )]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(
        short,
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Suppress non-error output"
    )]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "KILN_CONFIG",
        value_hint = ValueHint::FilePath,
        help = "Path to configuration file"
    )]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the builder plan for a template
    Plan(PlanCommand),

    /// Build a template's image
    Build(BuildCommand),

    /// Validate a template's plan with the builder
    Validate(ValidateCommand),

    /// Show the templates in a directory
    #[command(visible_alias = "ls")]
    List(ListCommand),
}

impl Command {
    /// Directory the command reads templates from.
    pub fn templates_dir(&self) -> &Path {
        match self {
            Self::Plan(cmd) => &cmd.target.dir.templates_dir,
            Self::Build(cmd) => &cmd.target.dir.templates_dir,
            Self::Validate(cmd) => &cmd.target.dir.templates_dir,
            Self::List(cmd) => &cmd.dir.templates_dir,
        }
    }
}

impl Cli {
    /// Load configuration from the explicit file or the templates directory
    pub fn load_config(&self) -> Result<KilnConfig, CliError> {
        let loader = match &self.config {
            Some(path) => ConfigLoader::from_file(path),
            None => ConfigLoader::new(self.command.templates_dir()),
        };
        debug!(path = %loader.path().display(), "Loading configuration");
        Ok(loader.load()?)
    }

    /// Execute the selected command
    pub async fn execute(self) -> Result<(), CliError> {
        Environment::init()?;
        let config = self.load_config()?;
        let ctx = CommandContext::new(config, Environment::region());

        match &self.command {
            Command::Plan(cmd) => cmd.execute(&ctx).await,
            Command::Build(cmd) => cmd.execute(&ctx).await,
            Command::Validate(cmd) => cmd.execute(&ctx).await,
            Command::List(cmd) => cmd.execute(&ctx).await,
        }
    }
}

/// Context passed to all commands
#[derive(Debug)]
pub struct CommandContext {
    pub config: KilnConfig,
    /// Stamp, region and builder type shared by every plan of this run.
    pub plan_context: PlanContext,
}

impl CommandContext {
    /// The configured region wins over `env_region`.
    pub fn new(config: KilnConfig, env_region: Option<String>) -> Self {
        let region = config.registry.region.clone().or(env_region);
        let plan_context = PlanContext::new(BuildStamp::now())
            .with_region(region)
            .with_builder_type(config.builder.builder_type.clone());

        Self { config, plan_context }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use kiln_template::Value;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_build_arguments() {
        let cli = Cli::try_parse_from([
            "kiln",
            "-vv",
            "build",
            "app",
            "-d",
            "/srv/templates",
            "--recursive",
            "--source-ami",
            "ami-123",
            "instance_type=t3.micro",
            "encrypt=true",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Command::Build(cmd) = &cli.command else {
            panic!("Expected build, got {:?}", cli.command);
        };
        assert_eq!(cmd.target.template, "app");
        assert_eq!(cmd.target.dir.templates_dir, PathBuf::from("/srv/templates"));
        assert!(cmd.target.recursive);
        assert_eq!(cmd.target.source_ami.as_deref(), Some("ami-123"));

        let overlay = cmd.target.overlay();
        assert_eq!(overlay["instance_type"], Value::String("t3.micro".into()));
        assert_eq!(overlay["encrypt"], Value::Bool(true));
        assert_eq!(cli.command.templates_dir(), Path::new("/srv/templates"));
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["kiln", "plan", "base-os"]).unwrap();
        let Command::Plan(cmd) = &cli.command else {
            panic!("Expected plan");
        };
        assert_eq!(cmd.target.dir.templates_dir, PathBuf::from("."));
        assert!(!cmd.target.recursive);
        assert!(cmd.target.source_ami.is_none());
        assert!(cmd.target.settings.is_empty());
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Cli::try_parse_from(["kiln"]).is_err());
        assert!(Cli::try_parse_from(["kiln", "deploy", "app"]).is_err());
        assert!(Cli::try_parse_from(["kiln", "build"]).is_err());
        assert!(Cli::try_parse_from(["kiln", "build", "app", "not-a-setting"]).is_err());
        assert!(Cli::try_parse_from(["kiln", "-q", "-v", "list"]).is_err());
    }

    #[test]
    fn test_context_region_precedence() {
        let mut config = KilnConfig::default();
        let ctx = CommandContext::new(config.clone(), Some("us-east-1".into()));
        assert_eq!(ctx.plan_context.region.as_deref(), Some("us-east-1"));
        assert_eq!(ctx.plan_context.builder_type, "amazon-ebs");

        config.registry.region = Some("eu-central-1".into());
        config.builder.builder_type = "amazon-instance".into();
        let ctx = CommandContext::new(config, Some("us-east-1".into()));
        assert_eq!(ctx.plan_context.region.as_deref(), Some("eu-central-1"));
        assert_eq!(ctx.plan_context.builder_type, "amazon-instance");
    }
}
