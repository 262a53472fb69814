//! Argument parsing utilities and common argument types.

mod parsers;

pub use parsers::*;

use std::path::PathBuf;

use clap::{Args, ValueHint};
use kiln_template::{Settings, Value};

/// Where templates live
#[derive(Debug, Clone, Args)]
pub struct DirArgs {
    /// Directory holding one subdirectory per template
    #[arg(
        short = 'd',
        long,
        default_value = ".",
        value_hint = ValueHint::DirPath,
        help = "Templates directory"
    )]
    pub templates_dir: PathBuf,
}

/// Arguments shared by plan, build and validate
#[derive(Debug, Clone, Args)]
pub struct TemplateArgs {
    /// Template to operate on
    #[arg(value_parser = parse_template_name)]
    pub template: String,

    #[command(flatten)]
    pub dir: DirArgs,

    /// Also run every template based on this one
    #[arg(short, long, help = "Descend into derived templates")]
    pub recursive: bool,

    /// Source image for the selected template, skipping the registry lookup
    #[arg(long, value_name = "ID", help = "Source image id")]
    pub source_ami: Option<String>,

    /// Builder settings overlaid onto the template's own configuration
    #[arg(value_name = "KEY=VALUE", value_parser = parse_setting)]
    pub settings: Vec<(String, Value)>,
}

impl TemplateArgs {
    /// Settings overlay, later duplicates winning.
    pub fn overlay(&self) -> Settings {
        self.settings.iter().cloned().collect()
    }
}
