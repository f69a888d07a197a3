//! Source fetcher: pulls the raw survey CSV out of object storage.
//!
//! `BlobSource` is the seam; the pipeline holds an `Arc<dyn BlobSource>` so a
//! run can be pointed at S3-compatible storage, a local directory, or an
//! in-memory fake in tests.

pub mod local;
pub mod s3;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::{ConfigError, FetchError};

pub use local::LocalBlobSource;
pub use s3::S3BlobSource;

#[async_trait]
pub trait BlobSource: Send + Sync {
    /// Returns the full content of `blob` inside `container`.
    async fn fetch(&self, container: &str, blob: &str) -> Result<Bytes, FetchError>;
}

/// Parsed form of a `Key=Value;Key=Value` storage connection string.
#[derive(Clone, PartialEq)]
pub struct BlobConnection {
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for BlobConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobConnection")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

impl BlobConnection {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut endpoint = None;
        let mut region = None;
        let mut access_key_id = None;
        let mut secret_access_key = None;

        for part in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            // Values may themselves contain '=' (base64 secrets), so split once.
            let (key, value) = part.split_once('=').ok_or_else(|| {
                ConfigError::ConnectionString(format!("segment '{part}' is not Key=Value"))
            })?;
            let value = value.trim().to_string();
            match key.trim().to_ascii_lowercase().as_str() {
                "endpoint" => endpoint = Some(value.trim_end_matches('/').to_string()),
                "region" => region = Some(value),
                "accesskeyid" => access_key_id = Some(value),
                "secretaccesskey" => secret_access_key = Some(value),
                other => tracing::debug!("Ignoring connection string key '{other}'"),
            }
        }

        let access_key_id = access_key_id
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::ConnectionString("AccessKeyId is required".into()))?;
        let secret_access_key = secret_access_key
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::ConnectionString("SecretAccessKey is required".into()))?;

        Ok(Self {
            endpoint: endpoint.filter(|v| !v.is_empty()),
            region: region
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "us-east-1".to_string()),
            access_key_id,
            secret_access_key,
        })
    }
}
