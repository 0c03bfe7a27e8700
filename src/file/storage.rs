//! Blob storage for filedepot.
//!
//! Blobs live directly under a root directory, one file per name:
//! ```text
//! {base_path}/
//! ├── report.csv
//! └── a.txt
//! ```

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::validation::is_safe_name;

/// A stream of uploaded bytes, consumed by [`BlobStore::write`].
pub type ByteStream<'a> = BoxStream<'a, io::Result<Bytes>>;

/// Blob storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No blob is stored under the name.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The name cannot be mapped to a file under the root.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Filesystem failure (permission denied, disk full, ...).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Named byte storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Create or truncate the blob and copy the whole stream into it.
    ///
    /// Returns the location to record as the file's `path`. A failed write
    /// may leave a truncated blob behind.
    async fn write(&self, name: &str, stream: ByteStream<'_>) -> Result<String, StorageError>;

    /// Read the whole blob.
    async fn read(&self, name: &str) -> Result<Vec<u8>, StorageError>;

    /// Delete the blob. A missing blob is [`StorageError::NotFound`].
    async fn remove(&self, name: &str) -> Result<(), StorageError>;
}

/// Filesystem blob store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new FileStorage with the given base path.
    ///
    /// The base directory will be created if it doesn't exist.
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await?;

        Ok(Self { base_path })
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Check if a blob exists.
    pub async fn exists(&self, name: &str) -> bool {
        match self.key_path(name) {
            Ok(path) => fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Map a name to its path under the root.
    fn key_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        if !is_safe_name(name) {
            return Err(StorageError::InvalidKey(name.to_string()));
        }
        Ok(self.base_path.join(name))
    }
}

#[async_trait]
impl BlobStore for FileStorage {
    async fn write(&self, name: &str, mut stream: ByteStream<'_>) -> Result<String, StorageError> {
        let path = self.key_path(name)?;
        let mut file = fs::File::create(&path).await?;

        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(name, bytes = written, "blob written");
        Ok(path.to_string_lossy().into_owned())
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.key_path(name)?;

        match fs::read(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, name: &str) -> Result<(), StorageError> {
        let path = self.key_path(name)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(name, "blob removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Wrap an in-memory buffer as a single-chunk [`ByteStream`].
pub fn bytes_stream(content: impl Into<Bytes>) -> ByteStream<'static> {
    futures::stream::once(futures::future::ready(Ok(content.into()))).boxed()
}
