//! Common test utilities for CLI testing.
#![allow(dead_code)]

use std::path::Path;
use std::process::Output;

use assert_cmd::Command;
use kiln_test_utils::{fake_cloud_cli, FakeBuilder, InstalledBuilder, TemplateTree};
use tempfile::{tempdir, TempDir};

/// Account the fake cloud CLI reports.
pub const ACCOUNT: &str = "123456789012";

/// A templates directory wired to a fake builder and a fake cloud CLI
/// through its `.kiln/config.yaml`.
pub struct TestContext {
    pub tree: TemplateTree,
    pub builder: InstalledBuilder,
    pub work_dir: TempDir,
    cloud_dir: TempDir,
}

impl TestContext {
    /// `images` are `(name, image id)` pairs already in the registry.
    pub fn new(tree: TemplateTree, builder: FakeBuilder, images: &[(&str, &str)]) -> Self {
        let builder = builder.install();
        let work_dir = tempdir().expect("Failed to create work dir");
        let cloud_dir = tempdir().expect("Failed to create cloud dir");
        let aws = fake_cloud_cli(cloud_dir.path(), ACCOUNT, images);

        let config = format!(
            "builder:\n  binary: {}\n  work_dir: {}\nregistry:\n  binary: {}\n",
            builder.binary().display(),
            work_dir.path().display(),
            aws.display(),
        );
        let tree = tree.file(".kiln/config.yaml", &config);

        Self {
            tree,
            builder,
            work_dir,
            cloud_dir,
        }
    }

    /// Get path to the templates directory
    pub fn path(&self) -> &Path {
        self.tree.path()
    }

    /// Create a command running in the templates directory with a clean
    /// environment
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("kiln").expect("Binary not found");
        cmd.current_dir(self.path())
            .env_remove("KILN_CONFIG")
            .env_remove("KILN_LOG_LEVEL")
            .env_remove("RUST_LOG")
            .env_remove("AWS_REGION")
            .env("AWS_DEFAULT_REGION", "us-east-1")
            .env("NO_COLOR", "1");
        cmd
    }

    /// Scratch directories created so far.
    pub fn scratch_dirs(&self) -> Vec<std::path::PathBuf> {
        let mut dirs: Vec<_> = std::fs::read_dir(self.work_dir.path())
            .expect("Failed to read work dir")
            .map(|entry| entry.expect("Failed to read entry").path())
            .collect();
        dirs.sort();
        dirs
    }
}

/// The usual two-level tree: `base-os` with `app` and `db` on top.
pub fn standard_tree() -> TemplateTree {
    TemplateTree::new()
        .template("base-os", "ami:\n  region: us-west-2\n  instance_type: t3.small\n")
        .template(
            "app",
            "base: base-os\nscripts: [app.sh]\nvariables:\n  port: 8080\n",
        )
        .script("app", "app.sh", "echo app\n")
        .template("db", "base: base-os\n")
}

/// Assert helpers for CLI output
pub trait OutputAssertions {
    fn assert_success(&self);
    fn assert_stdout_contains(&self, text: &str);
    fn assert_stderr_contains(&self, text: &str);
    fn assert_exit_code(&self, code: i32);
    fn stdout_json(&self) -> serde_json::Value;
}

impl OutputAssertions for Output {
    fn assert_success(&self) {
        assert!(
            self.status.success(),
            "Command failed with status: {}\nstderr: {}",
            self.status,
            String::from_utf8_lossy(&self.stderr)
        );
    }

    fn assert_stdout_contains(&self, text: &str) {
        let stdout = String::from_utf8_lossy(&self.stdout);
        assert!(
            stdout.contains(text),
            "stdout did not contain '{}'\nstdout: {}",
            text,
            stdout
        );
    }

    fn assert_stderr_contains(&self, text: &str) {
        let stderr = String::from_utf8_lossy(&self.stderr);
        assert!(
            stderr.contains(text),
            "stderr did not contain '{}'\nstderr: {}",
            text,
            stderr
        );
    }

    fn assert_exit_code(&self, code: i32) {
        assert_eq!(
            self.status.code(),
            Some(code),
            "Expected exit code {}, got {:?}\nstderr: {}",
            code,
            self.status.code(),
            String::from_utf8_lossy(&self.stderr)
        );
    }

    fn stdout_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.stdout).expect("Failed to parse JSON output")
    }
}
