//! Blob storage for uploaded images: local disk or the hosted blob API.

use async_trait::async_trait;
use axum::body::Bytes;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::config::StorageConfig;

const VERCEL_BLOB_API: &str = "https://blob.vercel-storage.com";
const VERCEL_BLOB_API_VERSION: &str = "7";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("invalid blob path: {0}")]
    InvalidPath(String),
    #[error("blob io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("blob transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("blob store rejected the request ({status}): {body}")]
    Provider { status: u16, body: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoredBlob {
    pub url: String,
    pub pathname: String,
}

#[async_trait]
pub trait BlobStorage: Send + Sync {
    async fn put(
        &self,
        pathname: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<StoredBlob, StorageError>;

    /// Removes the blob behind a URL previously returned by `put`. Deleting a
    /// blob that no longer exists succeeds.
    async fn delete(&self, url: &str) -> Result<(), StorageError>;
}

/// Relative, forward-slash paths only; no traversal.
pub fn is_safe_pathname(pathname: &str) -> bool {
    !pathname.is_empty()
        && !pathname.starts_with('/')
        && !pathname.contains('\\')
        && !pathname.contains('\0')
        && pathname.split('/').all(|seg| !seg.is_empty() && seg != "." && seg != "..")
}

// ============================================================================
// Local disk
// ============================================================================

/// Writes under `root`; files are served back under `public_base`.
pub struct LocalBlobStorage {
    root: PathBuf,
    public_base: String,
}

impl LocalBlobStorage {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn pathname_for_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        // Absolute URLs pointing at this server carry the public base in their path.
        let path = match url.find("://") {
            Some(scheme_end) => {
                let rest = &url[scheme_end + 3..];
                &rest[rest.find('/')?..]
            }
            None => url,
        };
        path.strip_prefix(&self.public_base)?.strip_prefix('/')
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStorage {
    async fn put(
        &self,
        pathname: &str,
        bytes: Bytes,
        _content_type: &str,
    ) -> Result<StoredBlob, StorageError> {
        if !is_safe_pathname(pathname) {
            return Err(StorageError::InvalidPath(pathname.to_string()));
        }
        let target = self.root.join(pathname);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &bytes).await?;

        Ok(StoredBlob {
            url: format!("{}/{}", self.public_base, pathname),
            pathname: pathname.to_string(),
        })
    }

    async fn delete(&self, url: &str) -> Result<(), StorageError> {
        let pathname = self
            .pathname_for_url(url)
            .filter(|p| is_safe_pathname(p))
            .ok_or_else(|| StorageError::InvalidPath(url.to_string()))?;

        match tokio::fs::remove_file(self.root.join(pathname)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Hosted blob API
// ============================================================================

pub struct VercelBlobStorage {
    client: reqwest::Client,
    token: String,
}

impl VercelBlobStorage {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StorageError::Provider {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl BlobStorage for VercelBlobStorage {
    async fn put(
        &self,
        pathname: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<StoredBlob, StorageError> {
        if !is_safe_pathname(pathname) {
            return Err(StorageError::InvalidPath(pathname.to_string()));
        }
        let response = self
            .client
            .put(format!("{}/{}", VERCEL_BLOB_API, pathname))
            .bearer_auth(&self.token)
            .header("x-api-version", VERCEL_BLOB_API_VERSION)
            .header("x-content-type", content_type)
            .header("x-add-random-suffix", "0")
            .body(bytes)
            .send()
            .await?;

        Ok(Self::check(response).await?.json::<StoredBlob>().await?)
    }

    async fn delete(&self, url: &str) -> Result<(), StorageError> {
        let response = self
            .client
            .post(format!("{}/delete", VERCEL_BLOB_API))
            .bearer_auth(&self.token)
            .header("x-api-version", VERCEL_BLOB_API_VERSION)
            .json(&serde_json::json!({ "urls": [url] }))
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }
}

pub fn blob_storage_from_config(config: &StorageConfig) -> Arc<dyn BlobStorage> {
    match &config.blob_token {
        Some(token) => {
            tracing::info!("Using hosted blob storage for uploads");
            Arc::new(VercelBlobStorage::new(token.clone()))
        }
        None => {
            tracing::info!(
                "BLOB_READ_WRITE_TOKEN not set. Storing uploads in {}",
                config.upload_dir.display()
            );
            Arc::new(LocalBlobStorage::new(
                config.upload_dir.clone(),
                config.public_base.clone(),
            ))
        }
    }
}
