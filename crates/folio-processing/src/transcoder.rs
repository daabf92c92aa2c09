//! Image transcoder/optimizer
//!
//! Already reasonable images are stored byte-for-byte. Oversized or
//! HEIC-origin images are downscaled (never upscaled) and re-encoded to WebP,
//! so every transformed output has one predictable format.

use crate::compression::encode_webp;
use crate::error::ProcessingError;
use crate::raster::{self, check_pixel_count, fit_within, resize::resize_to, should_transcode};
use bytes::Bytes;
use folio_core::{ImageKind, ProcessedImage, TranscoderConfig};

/// Optimize `data` for storage.
///
/// `heic_origin` marks a JPEG intermediate produced from HEIC input; such
/// images are always re-encoded so that no HEIC-derived intermediate is stored.
pub fn process(
    data: &Bytes,
    heic_origin: bool,
    config: &TranscoderConfig,
) -> Result<ProcessedImage, ProcessingError> {
    let info = raster::read_info(data)?;
    check_pixel_count(info.width, info.height, config.max_input_pixels)?;

    if !should_transcode(info.width, info.height, heic_origin, config.max_dimension) {
        return Ok(ProcessedImage::passthrough(
            data.clone(),
            info.kind,
            Some((info.width, info.height)),
        ));
    }

    let (target_width, target_height) = fit_within(info.width, info.height, config.max_dimension);
    let img = raster::decode_limited(data, config)?;
    let img = resize_to(img, target_width, target_height);
    let encoded = encode_webp(&img, config.webp_quality, config.webp_method)?;

    tracing::debug!(
        source_format = %info.kind,
        source_width = info.width,
        source_height = info.height,
        width = target_width,
        height = target_height,
        input_bytes = data.len(),
        output_bytes = encoded.len(),
        heic_origin,
        "Transcoded image to WebP"
    );

    Ok(ProcessedImage {
        data: encoded,
        format: ImageKind::Webp,
        width: Some(target_width),
        height: Some(target_height),
        transformed: true,
    })
}
