//! Template directory scanning.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::definition::TemplateDefinition;
use crate::error::{Result, TemplateError};
use crate::template::{Template, TemplateForest};
use crate::value::Settings;

/// A template skipped or left unresolvable while loading.
///
/// Warnings never abort a load.
#[derive(Debug, Error)]
pub enum LoadWarning {
    #[error("{name}: no template definition in {}", dir.display())]
    MissingDefinition { name: String, dir: PathBuf },

    #[error("{name}: malformed definition {}: {message}", path.display())]
    Malformed {
        name: String,
        path: PathBuf,
        message: String,
    },

    #[error("{name}: declares both ami and base")]
    AmbiguousParent { name: String },

    #[error("{name}: declares neither ami nor base")]
    MissingParent { name: String },

    #[error("{name}: base '{base}' does not match any template")]
    UnknownBase { name: String, base: String },

    #[error("{name}: base '{base}' would create a cycle")]
    CyclicBase { name: String, base: String },
}

impl LoadWarning {
    /// Name of the template the warning is about.
    pub fn template(&self) -> &str {
        match self {
            Self::MissingDefinition { name, .. }
            | Self::Malformed { name, .. }
            | Self::AmbiguousParent { name }
            | Self::MissingParent { name }
            | Self::UnknownBase { name, .. }
            | Self::CyclicBase { name, .. } => name,
        }
    }

    /// Whether the template was dropped entirely, rather than kept as an
    /// orphan.
    pub fn is_skip(&self) -> bool {
        !matches!(self, Self::UnknownBase { .. } | Self::CyclicBase { .. })
    }
}

/// Result of loading a templates directory.
#[derive(Debug)]
pub struct LoadReport {
    pub forest: TemplateForest,
    pub warnings: Vec<LoadWarning>,
}

/// Loads every template below one directory.
pub struct TemplateLoader {
    dir: PathBuf,
    settings: Settings,
}

impl TemplateLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            settings: Settings::new(),
        }
    }

    /// Settings overlaid onto every loaded template's builder configuration.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Scan the directory and link the forest.
    ///
    /// Only an unreadable templates directory is an error; problems with
    /// individual templates become warnings, which are also logged.
    pub fn load(&self) -> Result<LoadReport> {
        let mut warnings = Vec::new();
        let mut templates = Vec::new();

        for (name, dir) in self.candidates()? {
            match Self::load_candidate(&name, &dir) {
                Ok(mut template) => {
                    template.overlay_settings(&self.settings);
                    debug!(template = %name, dir = %dir.display(), "Loaded template");
                    templates.push(template);
                }
                Err(warning) => warnings.push(warning),
            }
        }

        let (forest, link_warnings) = TemplateForest::link(templates);
        warnings.extend(link_warnings);

        for warning in &warnings {
            warn!(template = %warning.template(), "{warning}");
        }

        Ok(LoadReport { forest, warnings })
    }

    /// Visible subdirectories, sorted by name.
    fn candidates(&self) -> Result<Vec<(String, PathBuf)>> {
        if !self.dir.is_dir() {
            return Err(TemplateError::DirectoryNotFound {
                path: self.dir.clone(),
            });
        }

        let entries = fs::read_dir(&self.dir).map_err(|e| TemplateError::io(&self.dir, e))?;

        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TemplateError::io(&self.dir, e))?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !path.is_dir() {
                continue;
            }
            candidates.push((name, path));
        }

        candidates.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(candidates)
    }

    fn load_candidate(name: &str, dir: &Path) -> std::result::Result<Template, LoadWarning> {
        let path = TemplateDefinition::locate(dir).ok_or_else(|| LoadWarning::MissingDefinition {
            name: name.to_string(),
            dir: dir.to_path_buf(),
        })?;

        let malformed = |message: String| LoadWarning::Malformed {
            name: name.to_string(),
            path: path.clone(),
            message,
        };

        let contents = fs::read_to_string(&path).map_err(|e| malformed(e.to_string()))?;
        let definition = TemplateDefinition::parse(&contents).map_err(|e| malformed(e.to_string()))?;

        Template::from_definition(name, dir, definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use kiln_test_utils::TemplateTree;

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = TemplateLoader::new(dir.path().join("nope")).load();
        assert!(matches!(result, Err(TemplateError::DirectoryNotFound { .. })));
    }

    #[test]
    fn test_loads_and_links() {
        let tree = TemplateTree::new()
            .template("base-os", "ami:\n  region: us-west-2\n")
            .template("app", "base: base-os\nscripts: [app.sh]\n")
            .template("worker", "base: base-os\n");

        let report = TemplateLoader::new(tree.path()).load().unwrap();
        assert!(report.warnings.is_empty());

        let forest = &report.forest;
        assert_eq!(forest.len(), 3);
        let base = forest.find("base-os").unwrap();
        let children: Vec<&str> = forest
            .get(base)
            .children()
            .iter()
            .map(|id| forest.get(*id).name())
            .collect();
        assert_eq!(children, ["app", "worker"]);
        assert_eq!(forest.get(forest.find("app").unwrap()).scripts(), ["app.sh"]);
    }

    #[test]
    fn test_skips_hidden_and_plain_files() {
        let tree = TemplateTree::new()
            .template("base-os", "ami: {}\n")
            .template(".cache", "ami: {}\n")
            .file("README.md", "templates live here\n");

        let report = TemplateLoader::new(tree.path()).load().unwrap();
        assert_eq!(report.forest.len(), 1);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_bad_templates_warn_and_skip() {
        let tree = TemplateTree::new()
            .template("good", "ami: {region: us-east-1}\n")
            .template("both", "ami: {}\nbase: good\n")
            .template("neither", "scripts: [x.sh]\n")
            .template("broken", "ami: [unclosed\n")
            .dir("empty");

        let report = TemplateLoader::new(tree.path()).load().unwrap();

        assert_eq!(report.forest.resolvable_names(), ["good"]);
        let mut skipped: Vec<&str> = report.warnings.iter().map(|w| w.template()).collect();
        skipped.sort();
        assert_eq!(skipped, ["both", "broken", "empty", "neither"]);
        assert!(report.warnings.iter().all(LoadWarning::is_skip));
        assert!(report.forest.lookup("both").is_none());
    }

    #[test]
    fn test_unknown_base_kept_as_orphan() {
        let tree = TemplateTree::new()
            .template("base-os", "ami: {}\n")
            .template("stray", "base: gone\n");

        let report = TemplateLoader::new(tree.path()).load().unwrap();

        assert!(matches!(
            &report.warnings[..],
            [LoadWarning::UnknownBase { name, base }] if name == "stray" && base == "gone"
        ));
        let forest = &report.forest;
        assert!(forest.find("stray").is_none());
        assert!(forest.get(forest.find("base-os").unwrap()).children().is_empty());
    }

    #[test]
    fn test_settings_overlay_applies_to_based_templates() {
        let tree = TemplateTree::new()
            .template("base-os", "ami: {region: us-west-2, instance_type: t3.small}\n")
            .template("app", "base: base-os\n");

        let settings = Settings::from([("instance_type".to_string(), Value::from("t3.micro"))]);
        let report = TemplateLoader::new(tree.path())
            .with_settings(settings)
            .load()
            .unwrap();

        assert!(report.warnings.is_empty());
        let forest = &report.forest;
        let app = forest.get(forest.find("app").unwrap());
        assert_eq!(app.ami().unwrap()["instance_type"], Value::from("t3.micro"));
        let base = forest.get(forest.find("base-os").unwrap());
        assert_eq!(base.ami().unwrap()["instance_type"], Value::from("t3.micro"));
        assert_eq!(base.ami().unwrap()["region"], Value::from("us-west-2"));
    }
}
