//! Source image resolution.

use std::sync::Arc;

use kiln_template::{TemplateForest, TemplateId};
use tracing::{debug, info, instrument};

use crate::cloud::{CloudApi, ImageRecord};
use crate::error::{RegistryError, Result};

/// Account id embedded in an ARN (`arn:aws:iam::<account>:...`).
pub fn account_from_arn(arn: &str) -> Option<&str> {
    arn.split(':')
        .nth(4)
        .filter(|account| !account.is_empty())
}

/// Finds the images templates are built from.
#[derive(Clone)]
pub struct ImageRegistry {
    api: Arc<dyn CloudApi>,
}

impl ImageRegistry {
    pub fn new(api: Arc<dyn CloudApi>) -> Self {
        Self { api }
    }

    /// Account owning the caller's credentials.
    ///
    /// Uses the caller's user when there is one, otherwise the first role
    /// whose ARN carries an account id.
    pub async fn account_id(&self) -> Result<String> {
        match self.api.current_user_arn().await {
            Ok(Some(arn)) => {
                if let Some(account) = account_from_arn(&arn) {
                    return Ok(account.to_string());
                }
                debug!(%arn, "User ARN carries no account id");
            }
            Ok(None) => debug!("Credentials do not belong to a user"),
            Err(e) => debug!(error = %e, "User lookup failed, trying roles"),
        }

        let roles = self
            .api
            .role_arns()
            .await
            .map_err(|e| RegistryError::IdentityUnavailable {
                reason: e.to_string(),
            })?;

        roles
            .iter()
            .find_map(|arn| account_from_arn(arn))
            .map(str::to_string)
            .ok_or_else(|| RegistryError::IdentityUnavailable {
                reason: "no user or role ARN carries an account id".to_string(),
            })
    }

    /// Most recent image built from template `base`.
    ///
    /// Image names are `<template>/<stamp>` and stamps sort chronologically
    /// as strings, so the lexicographically last name is the newest.
    #[instrument(skip(self))]
    pub async fn latest_image(&self, base: &str) -> Result<Option<ImageRecord>> {
        let account = self.account_id().await?;
        let prefix = format!("{base}/");

        let images = self.api.describe_images(&prefix, &account).await?;
        let latest = images
            .into_iter()
            .filter(|image| image.name.starts_with(&prefix))
            .filter(|image| image.owner.as_deref().map_or(true, |owner| owner == account))
            .max_by(|a, b| a.name.cmp(&b.name));

        match &latest {
            Some(image) => info!(image = %image.id, name = %image.name, "Found source image"),
            None => debug!("No images found"),
        }
        Ok(latest)
    }

    /// Source image id for building `id`.
    ///
    /// `None` for templates without a parent, and for based templates whose
    /// parent has never been built.
    pub async fn resolve_source(&self, forest: &TemplateForest, id: TemplateId) -> Result<Option<String>> {
        let Some(parent) = forest.get(id).parent() else {
            return Ok(None);
        };
        let base = forest.get(parent).name();
        Ok(self.latest_image(base).await?.map(|image| image.id))
    }
}
