use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::info;

use crate::errors::FetchError;
use crate::source::BlobSource;

/// Reads `<root>/<container>/<blob>` from disk, for offline runs.
#[derive(Debug, Clone)]
pub struct LocalBlobSource {
    root: PathBuf,
}

impl LocalBlobSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobSource for LocalBlobSource {
    async fn fetch(&self, container: &str, blob: &str) -> Result<Bytes, FetchError> {
        let path = self.root.join(container).join(blob);
        info!("Reading blob from {}", path.display());

        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FetchError::NotFound {
                container: container.to_string(),
                blob: blob.to_string(),
            }),
            Err(e) => Err(FetchError::Io(e)),
        }
    }
}
