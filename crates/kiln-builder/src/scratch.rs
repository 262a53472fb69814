//! Per-template scratch directories.
//!
//! Each run gets its own directory holding everything the builder reads and
//! the logs it writes. Directories are never removed so failed runs can be
//! inspected afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use kiln_template::scripts::{self, ROOT_DIR, SCRIPTS_DIR};
use kiln_template::PlanDocument;
use walkdir::WalkDir;

use crate::error::{ExecutorError, Result};

/// Plan file name, relative to the scratch directory.
pub const PLAN_FILE: &str = "plan.json";
pub const STDOUT_LOG: &str = "stdout.log";
pub const STDERR_LOG: &str = "stderr.log";

/// A prepared scratch directory.
#[derive(Debug, Clone)]
pub struct Scratch {
    dir: PathBuf,
}

impl Scratch {
    /// Create a fresh directory named after `template` below `work_dir`.
    pub fn create(work_dir: &Path, template: &str) -> Result<Self> {
        fs::create_dir_all(work_dir).map_err(|e| ExecutorError::io(work_dir, e))?;

        let dir = tempfile::Builder::new()
            .prefix(&format!("kiln-{template}-"))
            .disable_cleanup(true)
            .tempdir_in(work_dir)
            .map_err(|e| ExecutorError::io(work_dir, e))?;

        Ok(Self {
            dir: dir.path().to_path_buf(),
        })
    }

    /// Create the directory and write everything the builder reads.
    pub fn prepare(work_dir: &Path, template: &str, template_dir: &Path, plan: &PlanDocument) -> Result<Self> {
        let scratch = Self::create(work_dir, template)?;
        scratch.copy_inputs(template_dir)?;
        scratch.write_scripts()?;
        scratch.write_plan(plan)?;
        Ok(scratch)
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn plan_path(&self) -> PathBuf {
        self.dir.join(PLAN_FILE)
    }

    pub fn stdout_log(&self) -> PathBuf {
        self.dir.join(STDOUT_LOG)
    }

    pub fn stderr_log(&self) -> PathBuf {
        self.dir.join(STDERR_LOG)
    }

    /// Copy the template's `root/` and `scripts/` trees.
    ///
    /// `root/` always exists afterwards since the file provisioner uploads it.
    pub fn copy_inputs(&self, template_dir: &Path) -> Result<()> {
        for name in [ROOT_DIR, SCRIPTS_DIR] {
            let source = template_dir.join(name);
            if source.is_dir() {
                copy_tree(&source, &self.dir.join(name))?;
            }
        }

        let root = self.dir.join(ROOT_DIR);
        fs::create_dir_all(&root).map_err(|e| ExecutorError::io(&root, e))
    }

    /// Write the fixed begin/end scripts.
    pub fn write_scripts(&self) -> Result<()> {
        for (name, contents) in scripts::bundle() {
            let path = self.dir.join(name);
            fs::write(&path, contents).map_err(|e| ExecutorError::io(&path, e))?;
            make_executable(&path)?;
        }
        Ok(())
    }

    /// Serialize `plan` to the plan file.
    pub fn write_plan(&self, plan: &PlanDocument) -> Result<PathBuf> {
        let path = self.plan_path();
        let json = plan.to_json_pretty()?;
        fs::write(&path, json).map_err(|e| ExecutorError::io(&path, e))?;
        Ok(path)
    }
}

fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry.map_err(|e| ExecutorError::io(source, e.into()))?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| ExecutorError::io(&target, e))?;
        } else {
            // Copies permissions too, which keeps scripts executable.
            fs::copy(entry.path(), &target).map_err(|e| ExecutorError::io(entry.path(), e))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(|e| ExecutorError::io(path, e))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
