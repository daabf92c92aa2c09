use crate::keys::validate_filename;
use crate::traits::{ByteStream, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use folio_core::StoredAsset;
use futures::StreamExt;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Permission bits for the store directory.
pub const DIR_MODE: u32 = 0o755;
/// Permission bits for stored files.
pub const FILE_MODE: u32 = 0o644;

/// Local filesystem storage implementation
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
    public_path: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Directory holding every stored file (e.g., "/var/lib/folio/uploads")
    /// * `public_path` - URL prefix files are served under (e.g., "/api/uploads")
    pub async fn new(base_path: impl Into<PathBuf>, public_path: impl Into<String>) -> StorageResult<Self> {
        let storage = LocalStorage {
            base_path: base_path.into(),
            public_path: public_path.into(),
        };

        storage.ensure_base_dir().await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                storage.base_path.display(),
                e
            ))
        })?;

        Ok(storage)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn path_for(&self, filename: &str) -> StorageResult<PathBuf> {
        validate_filename(filename)?;
        Ok(self.base_path.join(filename))
    }

    /// Create the store directory if it is missing, with fixed permissions.
    async fn ensure_base_dir(&self) -> StorageResult<()> {
        if fs::try_exists(&self.base_path).await.unwrap_or(false) {
            return Ok(());
        }

        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(DIR_MODE);
        builder.create(&self.base_path).await?;

        set_mode(&self.base_path, DIR_MODE).await?;

        tracing::info!(path = %self.base_path.display(), "Created storage directory");
        Ok(())
    }
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

/// Await `write`; if it fails, delete the file at `path` so a half-written
/// upload is never left behind to be served.
async fn remove_on_error<F>(path: &Path, write: F) -> std::io::Result<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    let result = write.await;
    if result.is_err() {
        if let Err(e) = fs::remove_file(path).await {
            tracing::error!(
                path = %path.display(),
                error = %e,
                "Failed to remove partially written file"
            );
        }
    }
    result
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(
        &self,
        filename: &str,
        _content_type: &str,
        data: Bytes,
    ) -> StorageResult<StoredAsset> {
        let path = self.path_for(filename)?;
        let size = data.len();

        self.ensure_base_dir().await?;

        let start = std::time::Instant::now();

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(FILE_MODE);

        let mut file = options.open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                StorageError::AlreadyExists(filename.to_string())
            } else {
                StorageError::UploadFailed(format!(
                    "Failed to create file {}: {}",
                    path.display(),
                    e
                ))
            }
        })?;

        remove_on_error(&path, async {
            file.write_all(&data).await?;
            file.sync_all().await?;
            // umask may have stripped bits from the create mode
            set_mode(&path, FILE_MODE).await
        })
        .await
        .map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        let url = self.url_for(filename);

        tracing::info!(
            path = %path.display(),
            filename = %filename,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(StoredAsset {
            filename: filename.to_string(),
            size: size as u64,
            url,
        })
    }

    async fn download(&self, filename: &str) -> StorageResult<Vec<u8>> {
        let path = self.path_for(filename)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(filename.to_string()));
        }

        fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })
    }

    async fn download_stream(&self, filename: &str) -> StorageResult<ByteStream> {
        let path = self.path_for(filename)?;

        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(filename.to_string()))
            }
            Err(e) => {
                return Err(StorageError::DownloadFailed(format!(
                    "Failed to open file {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let key = filename.to_string();
        let stream = tokio_util::io::ReaderStream::new(file).map(move |result| {
            result.map_err(|e| {
                tracing::error!(filename = %key, error = %e, "Local storage stream read error");
                StorageError::DownloadFailed(format!("Failed to read chunk: {}", e))
            })
        });

        Ok(Box::pin(stream))
    }

    async fn exists(&self, filename: &str) -> StorageResult<bool> {
        let path = self.path_for(filename)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn content_length(&self, filename: &str) -> StorageResult<u64> {
        let path = self.path_for(filename)?;
        let meta = fs::metadata(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(filename.to_string())
            } else {
                StorageError::IoError(e)
            }
        })?;
        Ok(meta.len())
    }

    fn url_for(&self, filename: &str) -> String {
        format!("{}/{}", self.public_path.trim_end_matches('/'), filename)
    }
}
