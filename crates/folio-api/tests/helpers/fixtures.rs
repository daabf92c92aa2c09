//! Test fixtures: in-memory images and hostile payloads.

use axum_test::multipart::Part;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, format)
        .expect("Failed to encode fixture");
    out.into_inner()
}

pub fn create_test_jpeg(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Jpeg)
}

pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Png)
}

/// JPEG magic followed by padding up to `size` bytes.
pub fn create_oversized_jpeg(size: usize) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
    data.resize(size, 0);
    data
}

/// Bare `ftyp` box with major brand `heic`; the fake decoder supplies pixels.
pub fn create_heic_stub() -> Vec<u8> {
    let mut data = vec![0x00, 0x00, 0x00, 0x18];
    data.extend_from_slice(b"ftypheic\x00\x00\x00\x00mif1heic");
    data
}

pub fn create_svg() -> Vec<u8> {
    br#"<svg xmlns="http://www.w3.org/2000/svg"><script>alert(1)</script></svg>"#.to_vec()
}

pub fn file_part(data: Vec<u8>, filename: &str, mime: &str) -> Part {
    Part::bytes(data).file_name(filename).mime_type(mime)
}
