//! Dimension math for downscaling. Nothing here ever upscales.

use image::imageops::FilterType;
use image::DynamicImage;

/// Whether an image needs re-encoding before it is stored.
///
/// HEIC-origin images are always re-encoded; anything else only when one edge
/// exceeds `max_dimension`.
pub fn should_transcode(width: u32, height: u32, heic_origin: bool, max_dimension: u32) -> bool {
    heic_origin || width > max_dimension || height > max_dimension
}

/// Scale so the longer edge is at most `max_edge`, preserving aspect ratio.
pub fn fit_within(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    if width <= max_edge && height <= max_edge {
        return (width, height);
    }

    if width >= height {
        let aspect_ratio = height as f64 / width as f64;
        let h = (max_edge as f64 * aspect_ratio).round() as u32;
        (max_edge, h.max(1))
    } else {
        let aspect_ratio = width as f64 / height as f64;
        let w = (max_edge as f64 * aspect_ratio).round() as u32;
        (w.max(1), max_edge)
    }
}

/// Scale to `target_width`, height following the aspect ratio.
pub fn fit_to_width(width: u32, height: u32, target_width: u32) -> (u32, u32) {
    if width <= target_width {
        return (width, height);
    }

    let aspect_ratio = height as f64 / width as f64;
    let h = (target_width as f64 * aspect_ratio).round() as u32;
    (target_width, h.max(1))
}

/// Select appropriate filter type based on resize ratio
pub fn select_filter(
    orig_width: u32,
    orig_height: u32,
    new_width: u32,
    new_height: u32,
) -> FilterType {
    let width_ratio = orig_width as f32 / new_width.max(1) as f32;
    let height_ratio = orig_height as f32 / new_height.max(1) as f32;
    let max_ratio = width_ratio.max(height_ratio);

    if max_ratio > 2.0 {
        FilterType::Triangle
    } else if max_ratio > 1.5 {
        FilterType::CatmullRom
    } else {
        FilterType::Lanczos3
    }
}

/// Resize to exact dimensions, returning the input untouched when they match.
pub fn resize_to(img: DynamicImage, width: u32, height: u32) -> DynamicImage {
    if img.width() == width && img.height() == height {
        return img;
    }
    let filter = select_filter(img.width(), img.height(), width, height);
    img.resize_exact(width, height, filter)
}
