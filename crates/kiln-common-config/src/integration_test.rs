use std::env;
use std::fs;
use tempfile::tempdir;

use super::*;

#[test]
fn test_full_config_loading_workflow() {
    env::set_var("KILN_IT_PACKER", "/opt/hashicorp/packer");

    let dir = tempdir().unwrap();
    let kiln_dir = dir.path().join(".kiln");
    fs::create_dir_all(&kiln_dir).unwrap();

    let config_content = r#"
builder:
  binary: ${KILN_IT_PACKER}
  work_dir: ${KILN_IT_WORK_DIR:-/var/tmp/kiln}

registry:
  profile: ${KILN_IT_PROFILE:-default}
"#;
    fs::write(kiln_dir.join("config.yaml"), config_content).unwrap();

    let config = ConfigLoader::new(dir.path()).load().unwrap();

    assert_eq!(config.builder.binary, "/opt/hashicorp/packer");
    assert_eq!(config.builder.work_dir(), std::path::PathBuf::from("/var/tmp/kiln"));
    assert_eq!(config.builder.builder_type, "amazon-ebs");
    assert_eq!(config.registry.profile.as_deref(), Some("default"));
    assert!(config.registry.region.is_none());

    env::remove_var("KILN_IT_PACKER");
}

#[test]
fn test_explicit_path_outside_templates_dir() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ci.yaml");
    fs::write(&path, "registry:\n  binary: /usr/bin/aws\n").unwrap();

    let loader = ConfigLoader::from_file(&path);
    assert_eq!(loader.path(), path.as_path());

    let config = loader.load().unwrap();
    assert_eq!(config.registry.binary, "/usr/bin/aws");
    assert_eq!(config.builder.binary, "packer");
}
