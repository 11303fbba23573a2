//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three pixel operations every backend
//! must support: decode, resample, and encode. Geometry and compositing are
//! pure functions on top of these and live outside the trait.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate.

use super::params::Dimensions;
use crate::config::LimitsConfig;
use image::{ImageFormat, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("{0}")]
    Decode(String),
    #[error("unrecognized or unsupported image format")]
    UnsupportedFormat,
    #[error("image too large: {width}x{height} exceeds {max_dim}px")]
    ImageTooLarge { width: u32, height: u32, max_dim: u32 },
    #[error("cannot resample to {width}x{height}")]
    InvalidGeometry { width: u32, height: u32 },
    #[error("{0}")]
    Encode(String),
}

/// A decoded source image.
///
/// Pixels are always RGBA8. Sources without an alpha channel are expanded
/// with alpha = 255, so crop and pad logic never special-cases opaque input.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    pub pixels: RgbaImage,
    /// Whether the encoded source carried an alpha channel.
    pub has_alpha: bool,
    pub format: ImageFormat,
}

impl SourceImage {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.pixels.width(), self.pixels.height())
    }
}

/// Trait for image processing backends.
///
/// Implementations hold no per-call state and must be usable from many
/// threads at once.
pub trait ImageBackend: Sync {
    /// Parse encoded bytes of any supported format.
    fn decode(&self, bytes: &[u8]) -> Result<SourceImage, BackendError>;

    /// Resample `source` to exactly `size`. Same size returns an identical copy.
    fn resample(&self, source: &SourceImage, size: Dimensions)
    -> Result<RgbaImage, BackendError>;

    /// Serialize to the canonical output format.
    fn encode(&self, pixels: &RgbaImage) -> Result<Vec<u8>, BackendError>;

    /// Size limits the orchestrator enforces before asking for pixels.
    fn limits(&self) -> LimitsConfig {
        LimitsConfig::default()
    }
}
