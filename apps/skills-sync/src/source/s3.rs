use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::info;

use crate::errors::FetchError;
use crate::source::{BlobConnection, BlobSource};

/// S3-compatible object storage. Containers map to buckets, blobs to keys.
#[derive(Clone)]
pub struct S3BlobSource {
    client: S3Client,
}

impl S3BlobSource {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }

    /// Constructs a client for AWS, or for MinIO-style storage when the
    /// connection string names a custom endpoint.
    pub async fn connect(connection: &BlobConnection) -> Self {
        let credentials = Credentials::new(
            &connection.access_key_id,
            &connection.secret_access_key,
            None,
            None,
            "skills-sync-static",
        );

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(connection.region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &connection.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        // Custom endpoints rarely support virtual-hosted bucket addressing.
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(connection.endpoint.is_some())
            .build();

        Self::new(S3Client::from_conf(s3_config))
    }
}

#[async_trait]
impl BlobSource for S3BlobSource {
    async fn fetch(&self, container: &str, blob: &str) -> Result<Bytes, FetchError> {
        info!("Fetching blob {container}/{blob}");

        let output = self
            .client
            .get_object()
            .bucket(container)
            .key(blob)
            .send()
            .await
            .map_err(|err| match err {
                SdkError::ServiceError(ctx) => {
                    let status = ctx.raw().status().as_u16();
                    let service_err = ctx.into_err();
                    if service_err.is_no_such_key() || status == 404 {
                        FetchError::NotFound {
                            container: container.to_string(),
                            blob: blob.to_string(),
                        }
                    } else if status == 401 || status == 403 {
                        FetchError::Unauthorized(DisplayErrorContext(&service_err).to_string())
                    } else {
                        FetchError::Storage(DisplayErrorContext(&service_err).to_string())
                    }
                }
                other => FetchError::Network(DisplayErrorContext(&other).to_string()),
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?
            .into_bytes();

        info!("Fetched {} bytes from {container}/{blob}", data.len());
        Ok(data)
    }
}
