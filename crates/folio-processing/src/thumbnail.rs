//! Thumbnail generator
//!
//! Bounded-width WebP previews of stored originals.

use crate::compression::encode_webp;
use crate::error::ProcessingError;
use crate::heic::{is_heic, HeicConverter};
use crate::raster::{self, check_pixel_count, fit_to_width, resize::resize_to};
use bytes::Bytes;
use folio_core::TranscoderConfig;
use std::borrow::Cow;

/// Encoded preview and its dimensions.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
}

/// Build a WebP preview at most `thumbnail_width` wide.
///
/// HEIC input is recognized by signature and converted first; the stored
/// original is normally already converted, so this only matters when an
/// untranscoded container slips through.
pub fn make_thumbnail(
    data: &[u8],
    config: &TranscoderConfig,
    heic: &HeicConverter,
) -> Result<Thumbnail, ProcessingError> {
    let source: Cow<'_, [u8]> = if is_heic(data) {
        Cow::Owned(heic.convert_to_raster(data)?.to_vec())
    } else {
        Cow::Borrowed(data)
    };

    let info = raster::read_info(&source)?;
    check_pixel_count(info.width, info.height, config.max_input_pixels)?;

    let (width, height) = fit_to_width(info.width, info.height, config.thumbnail_width);
    let img = raster::decode_limited(&source, config)?;
    let img = resize_to(img, width, height);
    let data = encode_webp(&img, config.thumbnail_quality, config.webp_method)?;

    Ok(Thumbnail {
        data,
        width,
        height,
    })
}
