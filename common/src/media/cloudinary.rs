use std::{env::var, time::Duration};

use anyhow::Context as _;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::services::{MEDIA_FOLDER, MEDIA_TIMEOUT_SECS};

use super::{MediaKind, MediaStore, StoredAsset, UploadedFile};

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
}

impl CloudinaryConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            cloud_name: var("CLOUDINARY_CLOUD_NAME").context("CLOUDINARY_CLOUD_NAME is not set")?,
            api_key: var("CLOUDINARY_API_KEY").context("CLOUDINARY_API_KEY is not set")?,
            api_secret: var("CLOUDINARY_API_SECRET")
                .context("CLOUDINARY_API_SECRET is not set")?,
            folder: MEDIA_FOLDER.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

pub struct Cloudinary {
    config: CloudinaryConfig,
    client: reqwest::Client,
}

impl Cloudinary {
    pub fn new(config: CloudinaryConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(*MEDIA_TIMEOUT_SECS))
            .build()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self, kind: MediaKind, action: &str) -> String {
        format!("{}/{}/{}/{}", API_BASE, self.config.cloud_name, kind, action)
    }

    /// Signs the already sorted `key=value` pairs the way the upload API expects.
    fn sign(&self, params: &[(&str, &str)]) -> String {
        let joined = params
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("&");
        sha256::digest(format!("{}{}", joined, self.config.api_secret))
    }
}

#[async_trait]
impl MediaStore for Cloudinary {
    async fn upload(&self, file: &UploadedFile, kind: MediaKind) -> anyhow::Result<StoredAsset> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&[
            ("folder", self.config.folder.as_str()),
            ("timestamp", timestamp.as_str()),
        ]);

        let form = Form::new()
            .part(
                "file",
                Part::bytes(file.content.clone()).file_name(file.file_name.clone()),
            )
            .text("api_key", self.config.api_key.clone())
            .text("folder", self.config.folder.clone())
            .text("timestamp", timestamp)
            .text("signature_algorithm", "sha256")
            .text("signature", signature);

        let response = self
            .client
            .post(self.endpoint(kind, "upload"))
            .multipart(form)
            .send()
            .await
            .context("Failed to reach media host")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("Media host rejected upload with status {}: {}", status, error_text);
        }

        let body: UploadResponse = response
            .json()
            .await
            .context("Failed to parse upload response")?;

        log::info!("Uploaded {} {} as {}", kind, file.file_name, body.public_id);
        Ok(StoredAsset {
            url: body.secure_url,
            public_id: body.public_id,
        })
    }

    async fn destroy(&self, public_id: &str, kind: MediaKind) -> anyhow::Result<bool> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&[("public_id", public_id), ("timestamp", timestamp.as_str())]);

        let response = self
            .client
            .post(self.endpoint(kind, "destroy"))
            .form(&[
                ("public_id", public_id),
                ("api_key", self.config.api_key.as_str()),
                ("timestamp", timestamp.as_str()),
                ("signature_algorithm", "sha256"),
                ("signature", signature.as_str()),
            ])
            .send()
            .await
            .context("Failed to reach media host")?
            .error_for_status()?;

        let body: DestroyResponse = response
            .json()
            .await
            .context("Failed to parse destroy response")?;

        Ok(body.result == "ok")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloudinary() -> Cloudinary {
        Cloudinary::new(CloudinaryConfig {
            cloud_name: "demo".to_string(),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            folder: "showroom".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn signature_covers_params_and_secret() {
        let cloudinary = cloudinary();
        assert_eq!(
            cloudinary.sign(&[("public_id", "a/b"), ("timestamp", "1")]),
            sha256::digest("public_id=a/b&timestamp=1secret".to_string())
        );
    }

    #[test]
    fn endpoints_follow_resource_type() {
        let cloudinary = cloudinary();
        assert_eq!(
            cloudinary.endpoint(MediaKind::Video, "upload"),
            "https://api.cloudinary.com/v1_1/demo/video/upload"
        );
    }
}
