//! Cloud copies of generated documents (S3 / MinIO).
//!
//! Every call site treats these operations as best-effort: failures are logged
//! and never fail the forecast that triggered them.

use std::path::Path;

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::S3Config;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("S3 error: {0}")]
    S3(String),
}

/// File in, remote identifier out.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, local_path: &Path, display_name: &str) -> Result<String, StorageError>;
    async fn delete(&self, remote_id: &str) -> Result<(), StorageError>;
}

pub struct S3Uploader {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
}

impl S3Uploader {
    /// Constructs a client configured for MinIO (local, via endpoint) or AWS.
    pub async fn from_config(config: &S3Config) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let (Some(key), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                key,
                secret,
                None,
                None,
                "forecast-static",
            ));
        }
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.endpoint.is_some())
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            prefix: config.prefix.trim_matches('/').to_string(),
        }
    }

    fn object_key(&self, display_name: &str) -> String {
        object_key(&self.prefix, Uuid::new_v4(), display_name)
    }
}

/// `{prefix}/{unique}/{display name}`; path separators in the name become `-`.
fn object_key(prefix: &str, unique: Uuid, display_name: &str) -> String {
    let name: String = display_name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '-' } else { c })
        .collect();
    if prefix.is_empty() {
        format!("{unique}/{name}")
    } else {
        format!("{prefix}/{unique}/{name}")
    }
}

#[async_trait]
impl Uploader for S3Uploader {
    async fn upload(&self, local_path: &Path, display_name: &str) -> Result<String, StorageError> {
        let bytes = tokio::fs::read(local_path).await?;
        let key = self.object_key(display_name);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .content_type("application/pdf")
            .content_disposition(format!("attachment; filename=\"{display_name}\""))
            .send()
            .await
            .map_err(|e| StorageError::S3(format!("upload failed: {e}")))?;

        info!("Uploaded forecast to s3://{}/{}", self.bucket, key);
        Ok(key)
    }

    async fn delete(&self, remote_id: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(remote_id)
            .send()
            .await
            .map_err(|e| StorageError::S3(format!("delete failed: {e}")))?;

        info!("Deleted s3://{}/{}", self.bucket, remote_id);
        Ok(())
    }
}
