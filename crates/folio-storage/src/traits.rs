//! Storage abstraction trait

use async_trait::async_trait;
use bytes::Bytes;
use folio_core::StoredAsset;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid file name: {0}")]
    InvalidKey(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Chunked file contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Storage abstraction trait
///
/// Files are addressed by their bare filename. Implementations must reject
/// names containing `..`, `/` or `\`.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist `data` under `filename`. Never overwrites an existing file.
    async fn upload(
        &self,
        filename: &str,
        content_type: &str,
        data: Bytes,
    ) -> StorageResult<StoredAsset>;

    async fn download(&self, filename: &str) -> StorageResult<Vec<u8>>;

    async fn download_stream(&self, filename: &str) -> StorageResult<ByteStream>;

    async fn exists(&self, filename: &str) -> StorageResult<bool>;

    async fn content_length(&self, filename: &str) -> StorageResult<u64>;

    /// Public URL a stored file is served from.
    fn url_for(&self, filename: &str) -> String;
}
