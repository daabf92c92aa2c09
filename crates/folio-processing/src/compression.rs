//! Output encoders
//!
//! WebP for everything the pipeline re-encodes, JPEG (mozjpeg) for the
//! HEIC intermediate.

use crate::error::ProcessingError;
use bytes::Bytes;
use image::DynamicImage;

/// Encode as lossy WebP.
///
/// `method` bounds encoder CPU effort (0 = fastest, 6 = slowest). Lossy WebP
/// always stores chroma subsampled (4:2:0).
pub fn encode_webp(img: &DynamicImage, quality: f32, method: i32) -> Result<Bytes, ProcessingError> {
    let mut config = webp::WebPConfig::new()
        .map_err(|_| ProcessingError::Encode("invalid WebP configuration".to_string()))?;
    config.quality = quality.clamp(0.0, 100.0);
    config.method = method.clamp(0, 6);

    let (width, height) = (img.width(), img.height());

    let (rgba, rgb);
    let encoder = if img.color().has_alpha() {
        rgba = img.to_rgba8();
        webp::Encoder::from_rgba(&rgba, width, height)
    } else {
        rgb = img.to_rgb8();
        webp::Encoder::from_rgb(&rgb, width, height)
    };

    encoder
        .encode_advanced(&config)
        .map(|memory| Bytes::copy_from_slice(&memory))
        .map_err(|e| ProcessingError::Encode(format!("WebP: {:?}", e)))
}

/// Encode as baseline-optimized JPEG.
pub fn encode_jpeg(img: &DynamicImage, quality: f32) -> Result<Bytes, ProcessingError> {
    let rgb_img = img.to_rgb8();
    let (width, height) = rgb_img.dimensions();

    let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
    comp.set_size(width as usize, height as usize);
    comp.set_quality(quality.clamp(1.0, 100.0));
    comp.set_optimize_coding(true);

    let mut comp = comp
        .start_compress(Vec::new())
        .map_err(|e| ProcessingError::Encode(format!("JPEG: {}", e)))?;
    comp.write_scanlines(&rgb_img)
        .map_err(|e| ProcessingError::Encode(format!("JPEG: {}", e)))?;
    let jpeg_data = comp
        .finish()
        .map_err(|e| ProcessingError::Encode(format!("JPEG: {}", e)))?;

    Ok(Bytes::from(jpeg_data))
}
