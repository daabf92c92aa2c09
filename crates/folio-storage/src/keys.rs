//! Filename checks and content-type inference for the flat store.

use crate::traits::{StorageError, StorageResult};

/// Reject names that could address anything outside the store directory.
pub fn validate_filename(filename: &str) -> StorageResult<()> {
    if filename.is_empty() {
        return Err(StorageError::InvalidKey("File name is empty".to_string()));
    }

    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        return Err(StorageError::InvalidKey(
            "File name contains path components".to_string(),
        ));
    }

    if filename.contains('\0') {
        return Err(StorageError::InvalidKey(
            "File name contains invalid characters".to_string(),
        ));
    }

    Ok(())
}

/// Content type inferred from the extension; unknown extensions are served
/// as opaque bytes.
pub fn content_type_for(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "heif" => "image/heif",
        _ => "application/octet-stream",
    }
}
