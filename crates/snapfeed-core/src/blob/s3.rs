//! S3-backed blob store for production runs.

use std::path::Path;

use aws_sdk_s3::primitives::ByteStream;

use crate::error::BlobError;

use super::{to_stored_json, BlobStore};

/// Blob store over a single S3 bucket.
#[derive(Debug, Clone)]
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3BlobStore {
    /// Create a store over an existing SDK client.
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    /// Create a store using ambient AWS credentials and region.
    pub async fn from_env(bucket: String) -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(aws_sdk_s3::Client::new(&config), bucket)
    }

    /// The bucket this store writes to.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait::async_trait]
impl BlobStore for S3BlobStore {
    async fn put_image(&self, local_path: &Path, key: &str) -> Result<(), BlobError> {
        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| BlobError::Service {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("image/png")
            .body(body)
            .send()
            .await
            .map_err(|e| BlobError::Service {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        tracing::debug!(bucket = %self.bucket, key, "uploaded image");
        Ok(())
    }

    async fn put_json(&self, value: &serde_json::Value, key: &str) -> Result<(), BlobError> {
        let body = to_stored_json(value, key)?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/json")
            .body(ByteStream::from(body.into_bytes()))
            .send()
            .await
            .map_err(|e| BlobError::Service {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        tracing::debug!(bucket = %self.bucket, key, "uploaded JSON");
        Ok(())
    }

    async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                let service_err = e.into_service_error();
                return if service_err.is_no_such_key() {
                    Err(BlobError::NotFound {
                        key: key.to_string(),
                    })
                } else {
                    Err(BlobError::Service {
                        key: key.to_string(),
                        message: service_err.to_string(),
                    })
                };
            }
        };

        let data = output.body.collect().await.map_err(|e| BlobError::Service {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(data.into_bytes().to_vec())
    }
}
