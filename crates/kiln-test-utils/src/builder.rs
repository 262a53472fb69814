//! Stand-ins for the external executables kiln drives.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Configures a shell script that behaves like the image builder.
///
/// The script reads the builder `name` and `source_ami` from the plan file
/// it is given, records the call, and on `build` prints an image-id line
/// `AMI: ami-<name>`.
#[derive(Debug, Default, Clone)]
pub struct FakeBuilder {
    failing: Vec<String>,
    without_image: Vec<String>,
    delay_secs: u32,
}

impl FakeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit non-zero whenever this template is run.
    pub fn failing(mut self, template: &str) -> Self {
        self.failing.push(template.to_string());
        self
    }

    /// Succeed without printing an image id for this template.
    pub fn without_image(mut self, template: &str) -> Self {
        self.without_image.push(template.to_string());
        self
    }

    /// Sleep this long on every run before exiting.
    pub fn delayed(mut self, secs: u32) -> Self {
        self.delay_secs = secs;
        self
    }

    /// Write the script into a fresh temp dir.
    pub fn install(self) -> InstalledBuilder {
        let dir = tempfile::tempdir().expect("Failed to create fake builder dir");
        let log = dir.path().join("invocations.log");
        let binary = dir.path().join("packer");

        let script = format!(
            r#"#!/bin/sh
command="$1"
plan="$2"
[ -f "$plan" ] || {{ echo "missing plan $plan" >&2; exit 2; }}
field() {{
    sed -n "s/^ *\"$1\": \"\(.*\)\",\{{0,1\}}$/\1/p" "$plan" | head -n 1
}}
name=$(field name)
source=$(field source_ami)
echo "$command $name $source" >> "{log}"
echo "==> $name: running $command"
[ {delay} -eq 0 ] || sleep {delay}
case " {failing} " in *" $name "*) echo "$name: provisioning failed" >&2; exit 1;; esac
[ "$command" = build ] || exit 0
case " {without_image} " in *" $name "*) exit 0;; esac
echo "==> amazon-ebs: AMI: ami-$name"
"#,
            log = log.display(),
            failing = self.failing.join(" "),
            without_image = self.without_image.join(" "),
            delay = self.delay_secs,
        );
        write_executable(&binary, &script);

        InstalledBuilder {
            _dir: dir,
            binary,
            log,
        }
    }
}

/// A fake builder written to disk.
pub struct InstalledBuilder {
    _dir: TempDir,
    binary: PathBuf,
    log: PathBuf,
}

/// One recorded call of the fake builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub template: String,
    pub source_ami: String,
}

impl InstalledBuilder {
    /// Path to pass as the builder binary.
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Calls so far, in completion order.
    pub fn invocations(&self) -> Vec<Invocation> {
        let contents = fs::read_to_string(&self.log).unwrap_or_default();
        contents
            .lines()
            .filter_map(|line| {
                let mut parts = line.splitn(3, ' ');
                Some(Invocation {
                    command: parts.next()?.to_string(),
                    template: parts.next()?.to_string(),
                    source_ami: parts.next().unwrap_or_default().to_string(),
                })
            })
            .collect()
    }

    /// The call made for `template`, if any.
    pub fn invocation_for(&self, template: &str) -> Option<Invocation> {
        self.invocations().into_iter().find(|i| i.template == template)
    }
}

/// A shell script answering the cloud CLI calls the image registry makes.
///
/// `iam get-user` reports a user in `account`; `ec2 describe-images`
/// returns `images` as `(name, image id)` pairs.
pub fn fake_cloud_cli(dir: &Path, account: &str, images: &[(&str, &str)]) -> PathBuf {
    let images_json = images
        .iter()
        .map(|(name, id)| format!(r#"{{"Name": "{name}", "ImageId": "{id}", "OwnerId": "{account}"}}"#))
        .collect::<Vec<_>>()
        .join(", ");

    let script = format!(
        r#"#!/bin/sh
case "$*" in
    *"iam get-user"*) echo '{{"User": {{"Arn": "arn:aws:iam::{account}:user/ci"}}}}' ;;
    *"iam list-roles"*) echo '{{"Roles": []}}' ;;
    *"ec2 describe-images"*) echo '{{"Images": [{images_json}]}}' ;;
    *) echo "unexpected call: $*" >&2; exit 2 ;;
esac
"#
    );

    let path = dir.join("aws");
    write_executable(&path, &script);
    path
}

fn write_executable(path: &Path, contents: &str) {
    fs::write(path, contents).expect("Failed to write fake executable");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .expect("Failed to mark fake executable");
    }
}
