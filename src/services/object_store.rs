//! Blob storage for image payloads.
//!
//! The catalog core only depends on the [`ObjectStore`] trait: `put` a blob
//! and get back a durable public URL, `delete` a blob by its locator.
//! [`FsObjectStore`] is the disk-backed implementation, sharding payloads
//! beneath `base_path/{shard}/{shard}/{key}`.

use async_trait::async_trait;
use bytes::Bytes;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid object key")]
    InvalidKey,
    #[error("locator `{0}` does not address a stored blob")]
    InvalidLocator(String),
    #[error("blob `{0}` not found")]
    BlobNotFound(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable binary blob storage addressed by key.
///
/// `put` must confirm the blob is durably written before returning its public
/// URL; the catalog only ever records a locator it got back from here.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write a blob and return its durable public URL.
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> StoreResult<String>;

    /// Remove a blob addressed by key or by the public URL `put` returned.
    ///
    /// Removing a blob that is already gone is not an error.
    async fn delete(&self, locator: &str) -> StoreResult<()>;
}

const MAX_KEY_LEN: usize = 1024;

/// Disk-backed blob store.
///
/// Payloads are written to a temp file, fsynced, and atomically renamed into
/// a two-level shard directory derived from the key, so a crash mid-write
/// never leaves a partial blob at the final path.
#[derive(Clone, Debug)]
pub struct FsObjectStore {
    base_path: PathBuf,
    public_base_url: String,
}

impl FsObjectStore {
    pub fn new(base_path: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Basic key validation to avoid trivial path traversal vectors.
    fn ensure_key_safe(key: &str) -> StoreResult<()> {
        if key.is_empty() || key.len() > MAX_KEY_LEN {
            return Err(StoreError::InvalidKey);
        }
        if key.starts_with('/') || key.contains("..") {
            return Err(StoreError::InvalidKey);
        }
        if key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(StoreError::InvalidKey);
        }
        Ok(())
    }

    /// Generate two-level shard identifiers for a key.
    ///
    /// Uses MD5(key) and returns the first two bytes as lowercase hexadecimal
    /// strings (00–ff). Keeps the file count per directory bounded.
    fn shards(key: &str) -> (String, String) {
        let digest = md5::compute(key);
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Fully-qualified payload path: `base_path/{shard}/{shard}/{key}`.
    fn blob_path(&self, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::shards(key);
        let mut path = self.base_path.clone();
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    /// Extract the storage key from a locator.
    ///
    /// Accepts a bare key, one of our own public URLs, or a foreign URL whose
    /// last path segment is the key (records migrated from another store).
    fn key_from_locator(&self, locator: &str) -> StoreResult<String> {
        let key = if let Some(rest) = locator.strip_prefix(&self.public_base_url) {
            rest.trim_start_matches('/')
        } else if locator.contains("://") {
            locator
                .rsplit('/')
                .next()
                .ok_or_else(|| StoreError::InvalidLocator(locator.to_string()))?
        } else {
            locator
        };
        if key.is_empty() {
            return Err(StoreError::InvalidLocator(locator.to_string()));
        }
        Self::ensure_key_safe(key)?;
        Ok(key.to_string())
    }

    /// Open a stored blob for streaming out, together with its size.
    pub async fn reader(&self, key: &str) -> StoreResult<(File, u64)> {
        Self::ensure_key_safe(key)?;
        let path = self.blob_path(key);
        let file = File::open(&path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                StoreError::BlobNotFound(key.to_string())
            } else {
                StoreError::Io(err)
            }
        })?;
        let len = file.metadata().await?.len();
        Ok((file, len))
    }

    /// Recursively remove empty shard directories up to the store root.
    ///
    /// Stops when a directory is not empty, not found, or on any unexpected
    /// I/O error.
    async fn prune_empty_dirs(&self, start: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(&self.base_path) && current != self.base_path {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> StoreResult<String> {
        Self::ensure_key_safe(key)?;
        let path = self.blob_path(key);
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .ok_or(StoreError::InvalidKey)?;
        fs::create_dir_all(&parent).await?;

        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;
        if let Err(err) = file.write_all(&bytes).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        if let Err(err) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }

        debug!(
            key,
            content_type,
            size = bytes.len(),
            "stored blob at {}",
            path.display()
        );
        Ok(self.public_url(key))
    }

    async fn delete(&self, locator: &str) -> StoreResult<()> {
        let key = self.key_from_locator(locator)?;
        let path = self.blob_path(&key);
        match fs::remove_file(&path).await {
            Ok(_) => debug!("removed blob {}", path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("blob {} already missing", path.display());
            }
            Err(err) => return Err(StoreError::Io(err)),
        }

        if let Some(parent) = path.parent() {
            self.prune_empty_dirs(parent).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> FsObjectStore {
        let dir = std::env::temp_dir().join(format!("image-catalog-test-{}", Uuid::new_v4()));
        FsObjectStore::new(dir, "http://localhost:3000/files")
    }

    #[tokio::test]
    async fn put_returns_public_url_and_persists_blob() {
        let store = temp_store();
        let url = store
            .put("image-1-abc.jpeg", Bytes::from_static(b"payload"), "image/jpeg")
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:3000/files/image-1-abc.jpeg");

        let (_file, len) = store.reader("image-1-abc.jpeg").await.unwrap();
        assert_eq!(len, 7);
    }

    #[tokio::test]
    async fn delete_accepts_public_url_and_is_idempotent() {
        let store = temp_store();
        let url = store
            .put("image-2-def.jpeg", Bytes::from_static(b"payload"), "image/jpeg")
            .await
            .unwrap();

        store.delete(&url).await.unwrap();
        assert!(matches!(
            store.reader("image-2-def.jpeg").await,
            Err(StoreError::BlobNotFound(_))
        ));

        // A second delete of the same locator is not an error.
        store.delete(&url).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_unsafe_keys() {
        let store = temp_store();
        let result = store
            .put("../escape.jpeg", Bytes::from_static(b"x"), "image/jpeg")
            .await;
        assert!(matches!(result, Err(StoreError::InvalidKey)));
        assert!(matches!(
            store.reader("/absolute").await,
            Err(StoreError::InvalidKey)
        ));
    }

    #[test]
    fn locator_parsing_handles_bare_keys_and_foreign_urls() {
        let store = temp_store();
        assert_eq!(
            store.key_from_locator("image-3.jpeg").unwrap(),
            "image-3.jpeg"
        );
        assert_eq!(
            store
                .key_from_locator("http://localhost:3000/files/image-3.jpeg")
                .unwrap(),
            "image-3.jpeg"
        );
        assert_eq!(
            store
                .key_from_locator("https://bucket.s3.us-east-1.amazonaws.com/image-3.jpeg")
                .unwrap(),
            "image-3.jpeg"
        );
        assert!(store.key_from_locator("").is_err());
    }
}
