//! Provisioning scripts attached to every template.
//!
//! Every plan runs [`BEGIN_SCRIPT`] first and [`END_SCRIPT`] last, with the
//! template's own scripts in between. Parent scripts are not inherited.

/// Local directory uploaded by the file provisioner.
pub const ROOT_DIR: &str = "root";

/// Remote path the file provisioner uploads into.
pub const REMOTE_UPLOAD_DIR: &str = "/tmp";

/// Directory holding a template's own scripts, relative to the plan file.
pub const SCRIPTS_DIR: &str = "scripts";

/// File name of the pre-provisioning hook.
pub const BEGIN_SCRIPT_NAME: &str = "begin.sh";

/// File name of the post-provisioning hook.
pub const END_SCRIPT_NAME: &str = "end.sh";

/// Pre-provisioning hook.
pub const BEGIN_SCRIPT: &str = r#"#!/bin/sh
set -eu

# First boot may still be configuring the package manager.
if command -v cloud-init >/dev/null 2>&1; then
    sudo cloud-init status --wait >/dev/null || true
fi

if [ -d /tmp/root ]; then
    sudo cp -R /tmp/root/. /
fi
"#;

/// Post-provisioning hook.
pub const END_SCRIPT: &str = r#"#!/bin/sh
set -eu

sudo rm -rf /tmp/root /tmp/scripts
sudo rm -f /etc/ssh/ssh_host_*
if command -v cloud-init >/dev/null 2>&1; then
    sudo cloud-init clean --logs
fi
sync
"#;

/// The fixed scripts as `(file name, contents)` pairs.
pub fn bundle() -> [(&'static str, &'static str); 2] {
    [(BEGIN_SCRIPT_NAME, BEGIN_SCRIPT), (END_SCRIPT_NAME, END_SCRIPT)]
}

/// Path of a template script as referenced from a plan.
pub fn script_path(name: &str) -> String {
    format!("{SCRIPTS_DIR}/{name}")
}
