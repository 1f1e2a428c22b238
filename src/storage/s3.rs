//! S3-compatible object store
//!
//! Uses the official AWS SDK. Credentials come from the standard provider
//! chain (environment, profile, instance metadata). Set `endpoint` and
//! `force_path_style` for R2, MinIO or LocalStack.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use tokio::sync::OnceCell;

use super::{ObjectStore, StorageError, StoredObject};
use crate::config::S3StorageConfig;

/// [`ObjectStore`] over one S3 bucket
///
/// The SDK client is built on first use so that it binds to the runtime
/// serving requests rather than the one active at startup.
pub struct S3ObjectStore {
    config: S3StorageConfig,
    client: OnceCell<S3Client>,
}

impl S3ObjectStore {
    pub fn new(config: S3StorageConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    async fn client(&self) -> &S3Client {
        self.client
            .get_or_init(|| async {
                tracing::info!(
                    bucket = %self.config.bucket,
                    region = %self.config.region,
                    endpoint = ?self.config.endpoint,
                    "Creating S3 client"
                );

                let sdk_config = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(self.config.region.clone()))
                    .load()
                    .await;

                let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config)
                    .force_path_style(self.config.force_path_style);
                if let Some(endpoint) = &self.config.endpoint {
                    builder = builder.endpoint_url(endpoint);
                }

                S3Client::from_conf(builder.build())
            })
            .await
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
        let response = match self
            .client()
            .await
            .get_object()
            .bucket(self.bucket())
            .key(key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false)
                {
                    return Ok(None);
                }
                return Err(StorageError::Read {
                    key: key.to_string(),
                    message: err.to_string(),
                });
            }
        };

        let content_type = response.content_type().map(str::to_string);

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Read {
                key: key.to_string(),
                message: format!("Failed to read S3 body: {e}"),
            })?
            .into_bytes();

        tracing::debug!(
            bucket = %self.bucket(),
            key = %key,
            size = body.len(),
            "Fetched object from S3"
        );

        Ok(Some(StoredObject { body, content_type }))
    }

    async fn put(&self, key: &str, object: StoredObject) -> Result<(), StorageError> {
        let size = object.body.len();
        let mut request = self
            .client()
            .await
            .put_object()
            .bucket(self.bucket())
            .key(key)
            .body(ByteStream::from(object.body));
        if let Some(content_type) = object.content_type {
            request = request.content_type(content_type);
        }

        request.send().await.map_err(|e| StorageError::Write {
            key: key.to_string(),
            message: e.to_string(),
        })?;

        tracing::debug!(
            bucket = %self.bucket(),
            key = %key,
            size = size,
            "Stored object in S3"
        );

        Ok(())
    }
}
