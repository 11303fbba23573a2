//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (PNG, JPEG, GIF, BMP, TIFF, WebP) | `image::ImageReader` with content sniffing |
//! | Resample | `image::imageops::resize` with `Lanczos3`, premultiplied when the source has alpha |
//! | Encode → PNG | `image::codecs::png::PngEncoder`, fixed compression and filter |

use super::backend::{BackendError, ImageBackend, SourceImage};
use super::params::Dimensions;
use crate::config::LimitsConfig;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageEncoder, ImageError, ImageReader, Rgba, Rgba32FImage, RgbaImage};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone, Default)]
pub struct RustBackend {
    limits: LimitsConfig,
}

impl RustBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    fn decode_limits(&self) -> image::Limits {
        let mut limits = image::Limits::default();
        limits.max_image_width = Some(self.limits.max_image_dimension);
        limits.max_image_height = Some(self.limits.max_image_dimension);
        limits.max_alloc = Some(self.limits.max_alloc_mb.saturating_mul(1024 * 1024));
        limits
    }
}

/// A reader over `bytes` with the format detected from content.
fn sniffed_reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, BackendError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| BackendError::Decode(format!("Cannot detect image format: {e}")))?;
    if reader.format().is_none() {
        return Err(BackendError::UnsupportedFormat);
    }
    Ok(reader)
}

fn decode_error(err: ImageError) -> BackendError {
    match err {
        ImageError::Unsupported(_) => BackendError::UnsupportedFormat,
        other => BackendError::Decode(other.to_string()),
    }
}

/// Lanczos3 in premultiplied linear-alpha space, so the color of fully
/// transparent pixels never bleeds into visible edges.
fn resample_premultiplied(pixels: &RgbaImage, size: Dimensions) -> RgbaImage {
    let premultiplied = Rgba32FImage::from_fn(pixels.width(), pixels.height(), |x, y| {
        let [r, g, b, a] = pixels.get_pixel(x, y).0;
        let alpha = a as f32 / 255.0;
        Rgba([
            r as f32 / 255.0 * alpha,
            g as f32 / 255.0 * alpha,
            b as f32 / 255.0 * alpha,
            alpha,
        ])
    });

    let resized =
        image::imageops::resize(&premultiplied, size.width, size.height, FilterType::Lanczos3);

    RgbaImage::from_fn(size.width, size.height, |x, y| {
        let [r, g, b, a] = resized.get_pixel(x, y).0;
        let alpha = a.clamp(0.0, 1.0);
        let alpha8 = (alpha * 255.0).round() as u8;
        if alpha8 == 0 {
            return Rgba([0, 0, 0, 0]);
        }
        let straight = |c: f32| ((c / alpha).clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgba([straight(r), straight(g), straight(b), alpha8])
    })
}

fn is_opaque(pixels: &RgbaImage) -> bool {
    pixels.pixels().all(|p| p[3] == u8::MAX)
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<SourceImage, BackendError> {
        let (width, height) = sniffed_reader(bytes)?
            .into_dimensions()
            .map_err(decode_error)?;
        if width == 0 || height == 0 {
            return Err(BackendError::Decode(format!(
                "image has zero dimension ({width}x{height})"
            )));
        }
        let max_dim = self.limits.max_image_dimension;
        if width > max_dim || height > max_dim {
            return Err(BackendError::ImageTooLarge {
                width,
                height,
                max_dim,
            });
        }

        let mut reader = sniffed_reader(bytes)?;
        let format = reader.format().ok_or(BackendError::UnsupportedFormat)?;
        reader.limits(self.decode_limits());
        let image = reader.decode().map_err(decode_error)?;

        Ok(SourceImage {
            has_alpha: image.color().has_alpha(),
            pixels: image.into_rgba8(),
            format,
        })
    }

    fn resample(
        &self,
        source: &SourceImage,
        size: Dimensions,
    ) -> Result<RgbaImage, BackendError> {
        if size.is_empty() || !self.limits.allows_output(size) {
            return Err(BackendError::InvalidGeometry {
                width: size.width,
                height: size.height,
            });
        }
        if source.dimensions() == size {
            return Ok(source.pixels.clone());
        }
        if source.has_alpha {
            Ok(resample_premultiplied(&source.pixels, size))
        } else {
            Ok(image::imageops::resize(
                &source.pixels,
                size.width,
                size.height,
                FilterType::Lanczos3,
            ))
        }
    }

    fn encode(&self, pixels: &RgbaImage) -> Result<Vec<u8>, BackendError> {
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(BackendError::Encode(format!(
                "cannot encode empty {width}x{height} buffer"
            )));
        }

        let mut out = Vec::new();
        let encoder =
            PngEncoder::new_with_quality(&mut out, CompressionType::Default, PngFilter::Adaptive);
        let written = if is_opaque(pixels) {
            let rgb: Vec<u8> = pixels.pixels().flat_map(|p| [p[0], p[1], p[2]]).collect();
            encoder.write_image(&rgb, width, height, ExtendedColorType::Rgb8)
        } else {
            encoder.write_image(pixels.as_raw(), width, height, ExtendedColorType::Rgba8)
        };
        written.map_err(|e| BackendError::Encode(format!("PNG encode failed: {e}")))?;
        Ok(out)
    }

    fn limits(&self) -> LimitsConfig {
        self.limits.clone()
    }
}
