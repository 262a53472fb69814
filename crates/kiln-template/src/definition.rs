//! On-disk template definition files.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::value::Settings;

/// Definition file names, in lookup order.
pub const DEFINITION_FILES: [&str; 2] = ["template.yaml", "template.yml"];

/// Parsed contents of a template definition file.
///
/// Unknown keys are ignored. Null values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TemplateDefinition {
    /// Builder configuration, only for root templates.
    #[serde(default)]
    pub ami: Option<Settings>,
    /// Name of the parent template.
    #[serde(default)]
    pub base: Option<String>,
    /// Provisioning scripts under the template's `scripts/` directory.
    #[serde(default)]
    pub scripts: Option<Vec<String>>,
    /// Build variable defaults.
    #[serde(default)]
    pub variables: Option<Settings>,
    /// Shell provisioner `execute_command` override.
    #[serde(default)]
    pub execute: Option<String>,
}

impl TemplateDefinition {
    /// Parse definition YAML.
    pub fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes to unit, not a mapping.
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
    }

    /// Locate the definition file inside a template directory.
    pub fn locate(dir: &Path) -> Option<PathBuf> {
        DEFINITION_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }
}
