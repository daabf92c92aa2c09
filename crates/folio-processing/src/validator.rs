//! File signature validation
//!
//! Authenticates an upload's declared type against its leading bytes. The
//! client-supplied MIME type only selects which signature the bytes must
//! match; it is never trusted on its own.

use crate::heic::is_heic;
use folio_core::{ImageKind, UploadCandidate};
use thiserror::Error;

/// Size ceiling applied when none is configured (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const GIF87A_MAGIC: &[u8] = b"GIF87a";
const GIF89A_MAGIC: &[u8] = b"GIF89a";
const RIFF_MAGIC: &[u8] = b"RIFF";
const WEBP_FOURCC: &[u8] = b"WEBP";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("File type '{0}' is not allowed")]
    DisallowedType(String),

    #[error("SVG files are not allowed")]
    SvgForbidden,

    #[error("File is empty")]
    EmptyFile,

    #[error("File too large: {size} bytes exceeds maximum of {max} bytes")]
    FileTooLarge { size: u64, max: u64 },

    #[error("File content does not match declared type {declared}")]
    SignatureMismatch { declared: &'static str },
}

/// `Ok` carries the signature-confirmed type.
pub type ValidationResult = Result<ImageKind, ValidationError>;

/// Validates uploads against the allow-list, the size ceiling and the
/// magic-number table.
#[derive(Debug, Clone)]
pub struct FileSignatureValidator {
    max_file_size: u64,
}

impl Default for FileSignatureValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_SIZE)
    }
}

impl FileSignatureValidator {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn validate(&self, candidate: &UploadCandidate) -> ValidationResult {
        self.validate_parts(
            &candidate.declared_mime,
            candidate.declared_size,
            &candidate.data,
        )
    }

    /// Checks run cheapest first: declared type, size, then the bytes.
    pub fn validate_parts(
        &self,
        declared_mime: &str,
        declared_size: u64,
        buffer: &[u8],
    ) -> ValidationResult {
        let kind = Self::validate_content_type(declared_mime)?;

        // The buffer is authoritative; a lying size field cannot sneak past the ceiling.
        let size = declared_size.max(buffer.len() as u64);
        self.validate_file_size(size, buffer.is_empty())?;

        if !matches_signature(kind, buffer) {
            return Err(ValidationError::SignatureMismatch {
                declared: kind.mime_type(),
            });
        }

        Ok(kind)
    }

    fn validate_content_type(declared_mime: &str) -> Result<ImageKind, ValidationError> {
        let essence = declared_mime
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_lowercase();

        if essence.starts_with("image/svg") {
            return Err(ValidationError::SvgForbidden);
        }

        ImageKind::from_mime_type(&essence)
            .ok_or_else(|| ValidationError::DisallowedType(essence.clone()))
    }

    fn validate_file_size(&self, size: u64, buffer_empty: bool) -> Result<(), ValidationError> {
        if size == 0 || buffer_empty {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }
}

/// Whether `buffer` starts with a known signature for `kind`.
pub fn matches_signature(kind: ImageKind, buffer: &[u8]) -> bool {
    match kind {
        ImageKind::Jpeg => buffer.starts_with(JPEG_MAGIC),
        ImageKind::Png => buffer.starts_with(PNG_MAGIC),
        ImageKind::Gif => buffer.starts_with(GIF87A_MAGIC) || buffer.starts_with(GIF89A_MAGIC),
        ImageKind::Webp => {
            buffer.starts_with(RIFF_MAGIC) && buffer.get(8..12) == Some(WEBP_FOURCC)
        }
        ImageKind::Heic | ImageKind::Heif => is_heic(buffer),
    }
}
