//! List command implementation.

use std::fmt::Write as _;

use async_trait::async_trait;
use clap::Parser;
use kiln_template::{TemplateForest, TemplateId, TemplateLoader};

use crate::args::DirArgs;
use crate::cli::CommandContext;
use crate::commands::Execute;
use crate::error::CliError;

/// Show the loaded templates as a tree
#[derive(Debug, Parser)]
pub struct ListCommand {
    #[command(flatten)]
    pub dir: DirArgs,
}

#[async_trait]
impl Execute for ListCommand {
    async fn execute(&self, _ctx: &CommandContext) -> Result<(), CliError> {
        let report = TemplateLoader::new(&self.dir.templates_dir).load()?;
        print!("{}", render_forest(&report.forest));
        Ok(())
    }
}

/// One line per template, children indented below their parent.
pub fn render_forest(forest: &TemplateForest) -> String {
    let mut out = String::new();
    for top in forest.tops() {
        render_node(forest, top, 0, &mut out);
    }
    out
}

fn render_node(forest: &TemplateForest, id: TemplateId, depth: usize, out: &mut String) {
    let template = forest.get(id);
    let _ = write!(out, "{:indent$}{}", "", template.name(), indent = depth * 2);
    if template.is_orphan() {
        let base = template.base().unwrap_or_default();
        let _ = write!(out, " (orphan: base '{base}' unresolved)");
    }
    out.push('\n');

    for &child in template.children() {
        render_node(forest, child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_template::{Settings, Template};

    #[test]
    fn test_render_forest() {
        let (forest, _) = TemplateForest::link(vec![
            Template::new("web", "/t/web").with_base("app"),
            Template::new("base-os", "/t/base-os").with_ami(Settings::new()),
            Template::new("app", "/t/app").with_base("base-os"),
            Template::new("db", "/t/db").with_base("base-os"),
            Template::new("stray", "/t/stray").with_base("gone"),
        ]);

        assert_eq!(
            render_forest(&forest),
            "base-os\n  app\n    web\n  db\nstray (orphan: base 'gone' unresolved)\n"
        );
    }

    #[test]
    fn test_render_empty_forest() {
        assert_eq!(render_forest(&TemplateForest::default()), "");
    }
}
