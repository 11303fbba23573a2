//! Shared test utilities.
//!
//! Synthetic image builders so tests never depend on fixture files.
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let pixels = checkerboard(64, 48, 8);
//! let png = encode_png(&pixels);
//! let jpeg = encode_jpeg(64, 48);
//! ```

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};

pub const DARK: Rgba<u8> = Rgba([20, 40, 200, 255]);
pub const LIGHT: Rgba<u8> = Rgba([240, 200, 20, 255]);

/// Opaque two-color checkerboard with square cells of `cell` pixels.
pub fn checkerboard(width: u32, height: u32, cell: u32) -> RgbaImage {
    let cell = cell.max(1);
    RgbaImage::from_fn(width, height, |x, y| {
        if (x / cell + y / cell) % 2 == 0 {
            DARK
        } else {
            LIGHT
        }
    })
}

/// Encode an RGBA buffer as PNG, keeping the alpha channel.
pub fn encode_png(pixels: &RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(
            pixels.as_raw(),
            pixels.width(),
            pixels.height(),
            ExtendedColorType::Rgba8,
        )
        .unwrap();
    bytes
}

/// A JPEG of the given size filled with a soft gradient.
pub fn encode_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, 90)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    bytes
}
