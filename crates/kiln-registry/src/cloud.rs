//! Cloud provider access.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use kiln_common_config::RegistryConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::{RegistryError, Result};

/// A machine image known to the cloud provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "ImageId")]
    pub id: String,
    #[serde(rename = "OwnerId", default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

/// The calls kiln makes against the cloud provider.
#[async_trait]
pub trait CloudApi: Send + Sync {
    /// ARN of the calling user, if the credentials belong to one.
    async fn current_user_arn(&self) -> Result<Option<String>>;

    /// ARNs of the roles visible to the caller.
    async fn role_arns(&self) -> Result<Vec<String>>;

    /// Images owned by `owner` whose name starts with `name_prefix`.
    async fn describe_images(&self, name_prefix: &str, owner: &str) -> Result<Vec<ImageRecord>>;
}

/// [`CloudApi`] backed by the `aws` command-line tool.
#[derive(Debug, Clone)]
pub struct AwsCli {
    binary: PathBuf,
    profile: Option<String>,
    region: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetUserResponse {
    user: ArnRecord,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListRolesResponse {
    #[serde(default)]
    roles: Vec<ArnRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ArnRecord {
    arn: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeImagesResponse {
    #[serde(default)]
    images: Vec<ImageRecord>,
}

impl AwsCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            profile: None,
            region: None,
        }
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        Self {
            binary: PathBuf::from(&config.binary),
            profile: config.profile.clone(),
            region: config.region.clone(),
        }
    }

    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    fn global_args(&self) -> Vec<String> {
        let mut args = vec!["--output".to_string(), "json".to_string()];
        if let Some(profile) = &self.profile {
            args.extend(["--profile".to_string(), profile.clone()]);
        }
        if let Some(region) = &self.region {
            args.extend(["--region".to_string(), region.clone()]);
        }
        args
    }

    #[instrument(skip(self), fields(binary = %self.binary.display()))]
    async fn call<T: DeserializeOwned>(&self, args: &[&str]) -> Result<T> {
        let command = args.join(" ");
        debug!("Calling cloud CLI");

        let output = Command::new(&self.binary)
            .args(self.global_args())
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| RegistryError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(RegistryError::CommandFailed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|source| RegistryError::Response { command, source })
    }
}

#[async_trait]
impl CloudApi for AwsCli {
    async fn current_user_arn(&self) -> Result<Option<String>> {
        let response: GetUserResponse = self.call(&["iam", "get-user"]).await?;
        let arn = response.user.arn;
        Ok((!arn.is_empty()).then_some(arn))
    }

    async fn role_arns(&self) -> Result<Vec<String>> {
        let response: ListRolesResponse = self.call(&["iam", "list-roles"]).await?;
        Ok(response.roles.into_iter().map(|role| role.arn).collect())
    }

    async fn describe_images(&self, name_prefix: &str, owner: &str) -> Result<Vec<ImageRecord>> {
        let filter = format!("Name=name,Values={name_prefix}*");
        let response: DescribeImagesResponse = self
            .call(&["ec2", "describe-images", "--owners", owner, "--filters", &filter])
            .await?;
        Ok(response.images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_args() {
        let cli = AwsCli::new("aws");
        assert_eq!(cli.global_args(), ["--output", "json"]);

        let cli = cli
            .with_profile(Some("images".into()))
            .with_region(Some("eu-west-1".into()));
        assert_eq!(
            cli.global_args(),
            ["--output", "json", "--profile", "images", "--region", "eu-west-1"]
        );
    }

    #[test]
    fn test_from_config() {
        let config = RegistryConfig {
            binary: "/opt/aws/bin/aws".into(),
            profile: Some("ci".into()),
            region: None,
        };
        let cli = AwsCli::from_config(&config);
        assert_eq!(cli.binary, PathBuf::from("/opt/aws/bin/aws"));
        assert_eq!(cli.global_args(), ["--output", "json", "--profile", "ci"]);
    }

    #[test]
    fn test_parse_describe_images() {
        let json = r#"{"Images": [{"Name": "base-os/2024-01-01T00-00-00Z", "ImageId": "ami-1", "OwnerId": "123", "State": "available"}]}"#;
        let response: DescribeImagesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response.images,
            vec![ImageRecord {
                name: "base-os/2024-01-01T00-00-00Z".into(),
                id: "ami-1".into(),
                owner: Some("123".into()),
            }]
        );

        let empty: DescribeImagesResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.images.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_aws_cli_against_script() {
        let dir = tempfile::tempdir().unwrap();
        let binary = kiln_test_utils::fake_cloud_cli(
            dir.path(),
            "123456789012",
            &[("base-os/2024-01-01T00-00-00Z", "ami-1")],
        );
        let cli = AwsCli::new(binary);

        assert_eq!(
            cli.current_user_arn().await.unwrap().as_deref(),
            Some("arn:aws:iam::123456789012:user/ci")
        );
        assert!(cli.role_arns().await.unwrap().is_empty());
        let images = cli.describe_images("base-os/", "123456789012").await.unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].id, "ami-1");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_aws_cli_failure() {
        let dir = tempfile::tempdir().unwrap();
        let binary = kiln_test_utils::fake_cloud_cli(dir.path(), "1", &[]);
        let cli = AwsCli::new(binary);

        match cli.call::<serde_json::Value>(&["s3", "ls"]).await {
            Err(RegistryError::CommandFailed { command, stderr, .. }) => {
                assert_eq!(command, "s3 ls");
                assert!(stderr.contains("unexpected call"));
            }
            other => panic!("Expected CommandFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_aws_cli_missing_binary() {
        let cli = AwsCli::new("/nonexistent/kiln/aws");
        assert!(matches!(
            cli.current_user_arn().await,
            Err(RegistryError::Spawn { .. })
        ));
    }
}
