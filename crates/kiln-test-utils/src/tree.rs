//! On-disk template directories.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

/// A templates directory built up in a temp dir.
///
/// ```ignore
/// let tree = TemplateTree::new()
///     .template("base-os", "ami: {region: us-west-2}\n")
///     .template("app", "base: base-os\nscripts: [app.sh]\n")
///     .script("app", "app.sh", "echo app\n");
/// ```
pub struct TemplateTree {
    dir: TempDir,
}

impl TemplateTree {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create templates dir"),
        }
    }

    /// Root of the templates directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Add a template with the given `template.yaml` contents.
    pub fn template(self, name: &str, definition: &str) -> Self {
        self.file(&format!("{name}/template.yaml"), definition)
    }

    /// Add a provisioning script to a template's `scripts/` directory.
    pub fn script(self, template: &str, name: &str, contents: &str) -> Self {
        self.file(&format!("{template}/scripts/{name}"), contents)
    }

    /// Add a file to a template's `root/` tree.
    pub fn root_file(self, template: &str, relative: &str, contents: &str) -> Self {
        self.file(&format!("{template}/root/{relative}"), contents)
    }

    /// Write any file below the templates directory.
    pub fn file(self, relative: &str, contents: &str) -> Self {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create fixture directory");
        }
        fs::write(&path, contents).expect("Failed to write fixture file");
        self
    }

    /// Create an empty directory below the templates directory.
    pub fn dir(self, relative: &str) -> Self {
        fs::create_dir_all(self.dir.path().join(relative)).expect("Failed to create fixture directory");
        self
    }
}

impl Default for TemplateTree {
    fn default() -> Self {
        Self::new()
    }
}
