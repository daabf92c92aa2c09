use folio_core::{ImageKind, StoredAsset, ThumbnailAsset};
use serde::Serialize;
use utoipa::ToSchema;

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub original: StoredAsset,
    /// `None` when thumbnail generation failed or timed out.
    pub thumbnail: Option<ThumbnailAsset>,
    pub format: ImageKind,
    /// `None` when the original bytes were stored after a processing failure.
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Success body of `POST /api/upload`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Always `true`
    pub success: bool,
    /// Retrieval path of the stored original
    #[schema(example = "/api/uploads/1700000000000-k2j4h5g6f7d8s-421337.webp")]
    pub url: String,
    pub thumbnail_url: Option<String>,
    /// Secure stored filename
    pub filename: String,
    /// Stored size in bytes
    pub size: u64,
    /// Final MIME type of the stored original
    #[serde(rename = "type")]
    #[schema(example = "image/webp")]
    pub content_type: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl From<UploadOutcome> for UploadResponse {
    fn from(outcome: UploadOutcome) -> Self {
        Self {
            success: true,
            url: outcome.original.url,
            thumbnail_url: outcome.thumbnail.map(|t| t.url),
            filename: outcome.original.filename,
            size: outcome.original.size,
            content_type: outcome.format.mime_type().to_string(),
            width: outcome.width,
            height: outcome.height,
        }
    }
}
