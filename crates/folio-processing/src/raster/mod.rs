//! Bounded decoding through the primary codec (`image`).

pub mod resize;

use crate::error::ProcessingError;
use folio_core::{ImageKind, TranscoderConfig};
use image::{DynamicImage, ImageFormat, ImageReader, Limits};
use std::io::Cursor;

pub use resize::{fit_to_width, fit_within, select_filter, should_transcode};

/// Header-level facts about an image, read without decoding pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub kind: ImageKind,
    pub width: u32,
    pub height: u32,
}

impl ImageInfo {
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

fn kind_from_format(format: ImageFormat) -> Option<ImageKind> {
    match format {
        ImageFormat::Jpeg => Some(ImageKind::Jpeg),
        ImageFormat::Png => Some(ImageKind::Png),
        ImageFormat::WebP => Some(ImageKind::Webp),
        ImageFormat::Gif => Some(ImageKind::Gif),
        _ => None,
    }
}

/// Read format and dimensions from the header.
///
/// Fails with [`ProcessingError::UnknownFormat`] for anything the primary
/// codec does not handle, HEIC included.
pub fn read_info(data: &[u8]) -> Result<ImageInfo, ProcessingError> {
    let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
    let kind = reader
        .format()
        .and_then(kind_from_format)
        .ok_or(ProcessingError::UnknownFormat)?;
    let (width, height) = reader.into_dimensions()?;

    Ok(ImageInfo {
        kind,
        width,
        height,
    })
}

pub fn check_pixel_count(width: u32, height: u32, max_pixels: u64) -> Result<(), ProcessingError> {
    let pixels = width as u64 * height as u64;
    if pixels > max_pixels {
        return Err(ProcessingError::TooManyPixels {
            pixels,
            max: max_pixels,
        });
    }
    Ok(())
}

/// Pixel count is enforced separately by [`check_pixel_count`].
fn decode_limits(config: &TranscoderConfig) -> Limits {
    let mut limits = Limits::default();
    limits.max_alloc = Some(config.max_decode_bytes);
    limits
}

/// Decode pixels with the configured allocation ceiling.
pub fn decode_limited(data: &[u8], config: &TranscoderConfig) -> Result<DynamicImage, ProcessingError> {
    let mut reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
    reader.limits(decode_limits(config));
    Ok(reader.decode()?)
}
