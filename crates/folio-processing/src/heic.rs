//! HEIC/HEIF detection and conversion
//!
//! HEIC is an ISO-BMFF container. A file starts with an `ftyp` box whose
//! major brand names the profile. Detection parses the real box header
//! instead of matching fixed byte prefixes, so encoders that emit a different
//! `ftyp` length (more compatible brands, 64-bit sizes) are still recognized.

use crate::compression::encode_jpeg;
use crate::error::ProcessingError;
use bytes::Bytes;
use image::DynamicImage;
use std::sync::Arc;

const FTYP: &[u8; 4] = b"ftyp";
const HEIC_BRANDS: [&[u8; 4]; 4] = [b"heic", b"heix", b"mif1", b"msf1"];

/// Major brand of the leading `ftyp` box, if the buffer starts with a
/// well-formed one.
fn ftyp_major_brand(buffer: &[u8]) -> Option<[u8; 4]> {
    let size = u32::from_be_bytes(buffer.get(0..4)?.try_into().ok()?);
    if buffer.get(4..8)? != FTYP {
        return None;
    }

    let (header_len, box_size) = match size {
        // 64-bit largesize follows the type
        1 => {
            let large = u64::from_be_bytes(buffer.get(8..16)?.try_into().ok()?);
            (16usize, large)
        }
        // box extends to the end of the file
        0 => (8usize, buffer.len() as u64),
        n => (8usize, n as u64),
    };

    // major_brand + minor_version must fit inside the box, and the box inside the buffer
    if box_size < header_len as u64 + 8 || box_size > buffer.len() as u64 {
        return None;
    }

    buffer
        .get(header_len..header_len + 4)?
        .try_into()
        .ok()
}

/// Whether `buffer` is a HEIC/HEIF image.
///
/// Only the major brand counts: AVIF files list `mif1` among their
/// compatible brands but are not HEIC.
pub fn is_heic(buffer: &[u8]) -> bool {
    ftyp_major_brand(buffer)
        .map(|brand| HEIC_BRANDS.iter().any(|b| **b == brand))
        .unwrap_or(false)
}

/// Decodes the primary image of a HEIC/HEIF container.
pub trait HeicDecoder: Send + Sync {
    fn decode(&self, data: &[u8], max_pixels: u64) -> Result<DynamicImage, ProcessingError>;
}

/// Decoder used when the crate is built without the `heic` feature.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedHeicDecoder;

impl HeicDecoder for UnsupportedHeicDecoder {
    fn decode(&self, _data: &[u8], _max_pixels: u64) -> Result<DynamicImage, ProcessingError> {
        Err(ProcessingError::HeicUnsupported)
    }
}

#[cfg(feature = "heic")]
pub use libheif::LibHeifDecoder;

#[cfg(feature = "heic")]
mod libheif {
    use super::HeicDecoder;
    use crate::error::ProcessingError;
    use crate::raster::check_pixel_count;
    use image::{DynamicImage, RgbImage};
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    /// libheif-backed decoder.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct LibHeifDecoder;

    impl HeicDecoder for LibHeifDecoder {
        fn decode(&self, data: &[u8], max_pixels: u64) -> Result<DynamicImage, ProcessingError> {
            let lib_heif = LibHeif::new();
            let ctx = HeifContext::read_from_bytes(data)
                .map_err(|e| ProcessingError::HeicDecode(e.to_string()))?;
            let handle = ctx
                .primary_image_handle()
                .map_err(|e| ProcessingError::HeicDecode(e.to_string()))?;

            check_pixel_count(handle.width(), handle.height(), max_pixels)?;

            let image = lib_heif
                .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
                .map_err(|e| ProcessingError::HeicDecode(e.to_string()))?;

            let planes = image.planes();
            let plane = planes.interleaved.ok_or_else(|| {
                ProcessingError::HeicDecode("decoded image has no interleaved plane".to_string())
            })?;

            let width = plane.width;
            let height = plane.height;
            let row_len = width as usize * 3;
            let mut pixels = Vec::with_capacity(row_len * height as usize);
            for row in plane.data.chunks(plane.stride).take(height as usize) {
                let row = row.get(..row_len).ok_or_else(|| {
                    ProcessingError::HeicDecode("decoded row shorter than image width".to_string())
                })?;
                pixels.extend_from_slice(row);
            }

            RgbImage::from_raw(width, height, pixels)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| {
                    ProcessingError::HeicDecode("decoded buffer has unexpected size".to_string())
                })
        }
    }
}

/// The decoder this build ships with.
pub fn default_heic_decoder() -> Arc<dyn HeicDecoder> {
    #[cfg(feature = "heic")]
    {
        Arc::new(LibHeifDecoder)
    }
    #[cfg(not(feature = "heic"))]
    {
        Arc::new(UnsupportedHeicDecoder)
    }
}

/// Converts HEIC/HEIF into a JPEG raster the primary codec can read.
#[derive(Clone)]
pub struct HeicConverter {
    decoder: Arc<dyn HeicDecoder>,
    quality: f32,
    max_pixels: u64,
}

impl HeicConverter {
    pub fn new(decoder: Arc<dyn HeicDecoder>, quality: f32, max_pixels: u64) -> Self {
        Self {
            decoder,
            quality,
            max_pixels,
        }
    }

    /// Decode `buffer` and re-encode it as a near-lossless JPEG.
    ///
    /// Any failure is returned as-is; callers must not fall back to the
    /// undecodable original.
    pub fn convert_to_raster(&self, buffer: &[u8]) -> Result<Bytes, ProcessingError> {
        if !is_heic(buffer) {
            return Err(ProcessingError::NotHeic);
        }

        let start = std::time::Instant::now();
        let decoded = self.decoder.decode(buffer, self.max_pixels)?;
        let jpeg = encode_jpeg(&decoded, self.quality)?;

        tracing::debug!(
            width = decoded.width(),
            height = decoded.height(),
            input_bytes = buffer.len(),
            output_bytes = jpeg.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Converted HEIC/HEIF to JPEG"
        );

        Ok(jpeg)
    }
}

impl std::fmt::Debug for HeicConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeicConverter")
            .field("quality", &self.quality)
            .field("max_pixels", &self.max_pixels)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn ftyp_box(size: u32, brand: &[u8; 4], compatible: &[&[u8; 4]]) -> Vec<u8> {
        let mut data = size.to_be_bytes().to_vec();
        data.extend_from_slice(b"ftyp");
        data.extend_from_slice(brand);
        data.extend_from_slice(&[0, 0, 0, 0]);
        for b in compatible {
            data.extend_from_slice(*b);
        }
        data
    }

    struct SolidDecoder;

    impl HeicDecoder for SolidDecoder {
        fn decode(&self, _data: &[u8], _max_pixels: u64) -> Result<DynamicImage, ProcessingError> {
            Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
                16,
                8,
                Rgb([200, 10, 10]),
            )))
        }
    }

    #[test]
    fn test_detects_common_box_sizes() {
        for compat in [1usize, 2, 3] {
            let brands: Vec<&[u8; 4]> = [b"mif1", b"heic", b"miaf"][..compat].to_vec();
            let size = 16 + 4 * compat as u32;
            let mut data = ftyp_box(size, b"heic", &brands);
            data.extend_from_slice(&[0u8; 32]);
            assert!(is_heic(&data), "box size {} not detected", size);
        }
    }

    #[test]
    fn test_detects_all_brands() {
        for brand in [b"heic", b"heix", b"mif1", b"msf1"] {
            let data = ftyp_box(24, brand, &[b"mif1", b"heic"]);
            assert!(is_heic(&data));
        }
    }

    #[test]
    fn test_detects_unusual_box_size() {
        // Seven compatible brands: a prefix table keyed on 24/28/32 would miss this.
        let compat: Vec<&[u8; 4]> = vec![b"mif1"; 7];
        let data = ftyp_box(16 + 28, b"heic", &compat);
        assert!(is_heic(&data));
    }

    #[test]
    fn test_detects_largesize_box() {
        let mut data = 1u32.to_be_bytes().to_vec();
        data.extend_from_slice(b"ftyp");
        data.extend_from_slice(&28u64.to_be_bytes());
        data.extend_from_slice(b"heix");
        data.extend_from_slice(&[0, 0, 0, 0]);
        data.extend_from_slice(b"mif1");
        assert!(is_heic(&data));
    }

    #[test]
    fn test_detects_box_to_end_of_file() {
        let data = ftyp_box(0, b"msf1", &[b"msf1"]);
        assert!(is_heic(&data));
    }

    #[test]
    fn test_rejects_avif_with_mif1_compatible_brand() {
        let data = ftyp_box(28, b"avif", &[b"mif1", b"miaf", b"avif"]);
        assert!(!is_heic(&data));
    }

    #[test]
    fn test_rejects_mp4() {
        let data = ftyp_box(24, b"isom", &[b"isom", b"mp41"]);
        assert!(!is_heic(&data));
    }

    #[test]
    fn test_rejects_truncated_and_malformed() {
        assert!(!is_heic(&[]));
        assert!(!is_heic(b"\x00\x00\x00\x18ftyp"));
        // box claims to be larger than the buffer
        assert!(!is_heic(&ftyp_box(4096, b"heic", &[b"mif1"])));
        // box too small to hold a brand
        assert!(!is_heic(&ftyp_box(12, b"heic", &[b"mif1"])));
        assert!(!is_heic(b"not an image at all"));
        assert!(!is_heic(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0]));
    }

    #[test]
    fn test_convert_to_raster_produces_jpeg() {
        let converter = HeicConverter::new(Arc::new(SolidDecoder), 95.0, 1_000_000);
        let data = ftyp_box(24, b"heic", &[b"mif1", b"heic"]);
        let jpeg = converter.convert_to_raster(&data).unwrap();
        assert!(jpeg.starts_with(&[0xFF, 0xD8, 0xFF]));
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[test]
    fn test_convert_to_raster_rejects_non_heic() {
        let converter = HeicConverter::new(Arc::new(SolidDecoder), 95.0, 1_000_000);
        assert!(matches!(
            converter.convert_to_raster(b"GIF89a"),
            Err(ProcessingError::NotHeic)
        ));
    }

    #[test]
    fn test_unsupported_decoder_fails() {
        let converter = HeicConverter::new(Arc::new(UnsupportedHeicDecoder), 95.0, 1_000_000);
        let data = ftyp_box(24, b"heic", &[b"mif1", b"heic"]);
        assert!(matches!(
            converter.convert_to_raster(&data),
            Err(ProcessingError::HeicUnsupported)
        ));
    }
}
