//! Transient values that flow through a single upload request.
//!
//! Nothing here outlives the HTTP response; only the bytes written to the
//! content store do.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Image formats accepted by the upload pipeline.
///
/// SVG is deliberately absent: it can carry script and is never accepted,
/// whatever its bytes look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
    Gif,
    Heic,
    Heif,
}

impl ImageKind {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Webp => "image/webp",
            ImageKind::Gif => "image/gif",
            ImageKind::Heic => "image/heic",
            ImageKind::Heif => "image/heif",
        }
    }

    /// Canonical file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Webp => "webp",
            ImageKind::Gif => "gif",
            ImageKind::Heic => "heic",
            ImageKind::Heif => "heif",
        }
    }

    /// Parse a client-declared MIME type.
    ///
    /// Parameters (`; charset=...`) and case are ignored, and the common
    /// `image/jpg` alias is accepted.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageKind::Jpeg),
            "image/png" => Some(ImageKind::Png),
            "image/webp" => Some(ImageKind::Webp),
            "image/gif" => Some(ImageKind::Gif),
            "image/heic" | "image/heic-sequence" => Some(ImageKind::Heic),
            "image/heif" | "image/heif-sequence" => Some(ImageKind::Heif),
            _ => None,
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            "png" => Some(ImageKind::Png),
            "webp" => Some(ImageKind::Webp),
            "gif" => Some(ImageKind::Gif),
            "heic" => Some(ImageKind::Heic),
            "heif" => Some(ImageKind::Heif),
            _ => None,
        }
    }

    /// HEIC and HEIF share a container and a decoder.
    pub fn is_heic_family(self) -> bool {
        matches!(self, ImageKind::Heic | ImageKind::Heif)
    }
}

impl std::fmt::Display for ImageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// An uploaded file exactly as the client described it. Every field except
/// `data` is untrusted.
#[derive(Debug, Clone)]
pub struct UploadCandidate {
    pub data: Bytes,
    pub declared_mime: String,
    pub declared_filename: String,
    pub declared_size: u64,
}

impl UploadCandidate {
    pub fn new(data: Bytes, declared_mime: String, declared_filename: String) -> Self {
        let declared_size = data.len() as u64;
        Self {
            data,
            declared_mime,
            declared_filename,
            declared_size,
        }
    }
}

/// Result of the transcoding stage.
///
/// `format` is never HEIC/HEIF when the input was HEIC/HEIF. Dimensions are
/// `None` only when the original bytes were kept after a processing failure.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub data: Bytes,
    pub format: ImageKind,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// False when `data` is byte-identical to the input.
    pub transformed: bool,
}

impl ProcessedImage {
    /// Keep the original bytes untouched.
    pub fn passthrough(data: Bytes, format: ImageKind, dimensions: Option<(u32, u32)>) -> Self {
        Self {
            data,
            format,
            width: dimensions.map(|(w, _)| w),
            height: dimensions.map(|(_, h)| h),
            transformed: false,
        }
    }
}

/// A file persisted to the content store under a secure name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredAsset {
    pub filename: String,
    pub size: u64,
    pub url: String,
}

/// A preview derived from a [`StoredAsset`], always WebP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThumbnailAsset {
    pub filename: String,
    pub size: u64,
    pub url: String,
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_mime_type_accepts_aliases_and_parameters() {
        assert_eq!(ImageKind::from_mime_type("image/jpg"), Some(ImageKind::Jpeg));
        assert_eq!(
            ImageKind::from_mime_type("IMAGE/PNG; charset=binary"),
            Some(ImageKind::Png)
        );
        assert_eq!(ImageKind::from_mime_type("image/heif"), Some(ImageKind::Heif));
    }

    #[test]
    fn test_from_mime_type_rejects_svg_and_unknown() {
        assert_eq!(ImageKind::from_mime_type("image/svg+xml"), None);
        assert_eq!(ImageKind::from_mime_type("application/octet-stream"), None);
        assert_eq!(ImageKind::from_mime_type(""), None);
    }

    #[test]
    fn test_extension_round_trips_through_from_extension() {
        for kind in [
            ImageKind::Jpeg,
            ImageKind::Png,
            ImageKind::Webp,
            ImageKind::Gif,
            ImageKind::Heic,
            ImageKind::Heif,
        ] {
            assert_eq!(ImageKind::from_extension(kind.extension()), Some(kind));
        }
        assert_eq!(ImageKind::from_extension("JPEG"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_extension("svg"), None);
    }

    #[test]
    fn test_upload_candidate_declared_size_matches_buffer() {
        let candidate = UploadCandidate::new(
            Bytes::from_static(b"abc"),
            "image/png".to_string(),
            "a.png".to_string(),
        );
        assert_eq!(candidate.declared_size, 3);
    }

    #[test]
    fn test_passthrough_is_not_transformed() {
        let processed =
            ProcessedImage::passthrough(Bytes::from_static(b"x"), ImageKind::Png, Some((4, 3)));
        assert!(!processed.transformed);
        assert_eq!(processed.width, Some(4));
        assert_eq!(processed.height, Some(3));
    }
}
