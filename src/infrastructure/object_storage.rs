// Object storage - bucketed blob uploads with public URLs
// LocalObjectStorage keeps objects on disk under <root>/<bucket>/<key>

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    /// Seconds clients may cache the object for.
    pub cache_control: u32,
    /// Overwrite an existing object instead of failing with `Conflict`.
    pub upsert: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            cache_control: 3600,
            upsert: false,
        }
    }
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
        options: &UploadOptions,
    ) -> AppResult<()>;

    fn public_url(&self, bucket: &str, key: &str) -> String;
}

pub struct LocalObjectStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn object_path(&self, bucket: &str, key: &str) -> AppResult<PathBuf> {
        for part in [bucket, key] {
            let path = Path::new(part);
            let plain = !part.is_empty()
                && path.components().all(|c| matches!(c, Component::Normal(_)));
            if !plain {
                return Err(AppError::Validation(format!("Invalid object path: {}", part)));
            }
        }
        Ok(self.root.join(bucket).join(key))
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
        options: &UploadOptions,
    ) -> AppResult<()> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::RemoteFailure(format!("Failed to prepare bucket: {}", e)))?;
        }

        let mut open = tokio::fs::OpenOptions::new();
        open.write(true);
        if options.upsert {
            open.create(true).truncate(true);
        } else {
            open.create_new(true);
        }

        let mut file = open.open(&path).await.map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => {
                AppError::Conflict("The resource already exists".to_string())
            }
            _ => AppError::RemoteFailure(format!("Failed to upload {}/{}: {}", bucket, key, e)),
        })?;
        file.write_all(bytes)
            .await
            .map_err(|e| AppError::RemoteFailure(format!("Failed to upload {}/{}: {}", bucket, key, e)))?;
        file.flush()
            .await
            .map_err(|e| AppError::RemoteFailure(format!("Failed to upload {}/{}: {}", bucket, key, e)))?;

        debug!(
            "Stored {}/{} ({} bytes, max-age={})",
            bucket,
            key,
            bytes.len(),
            options.cache_control
        );
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, bucket, key)
    }
}
