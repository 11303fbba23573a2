//! Parameter types for image transforms.
//!
//! These structs describe *what* to produce, not *how* to produce it. They are
//! the interface between callers (the CLI, [`process`](crate::process), any
//! web-facing wrapper) and the [`operations`](super::operations) module that
//! drives the pixel work.
//!
//! ## Types
//!
//! - [`Dimensions`]: width × height in pixels.
//! - [`FitPolicy`]: how the source is fitted into the target box.
//! - [`FillColor`]: RGBA8 canvas color used by [`FitPolicy::PadToFit`]. Defaults to opaque white.
//! - [`TransformSpec`]: validated, strongly typed request consumed by the orchestrator.
//! - [`TransformRequest`]: loosely typed request as a wrapping layer receives it
//!   (signed dimensions, optional fields, color as a string).

use super::color::parse_color;
use super::error::TransformError;
use crate::config::DefaultsConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Image or canvas size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Pixel count. Widened so `u32::MAX` sides cannot overflow.
    pub fn area(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// How a source image is fitted into the target box.
///
/// One closed set of variants: a request cannot ask to crop and pad at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitPolicy {
    /// Resample straight to the target size, distorting if needed. With
    /// [`TransformSpec::preserve_aspect_ratio`] set it letterboxes instead,
    /// the same way [`FitPolicy::PadToFit`] does.
    #[default]
    Stretch,
    /// Scale to cover the target box, then center-crop the overflow.
    CropToFill,
    /// Scale to fit inside the target box, then letterbox with the fill color.
    PadToFit,
}

impl FitPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            FitPolicy::Stretch => "stretch",
            FitPolicy::CropToFill => "crop-to-fill",
            FitPolicy::PadToFit => "pad-to-fit",
        }
    }
}

impl fmt::Display for FitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FitPolicy {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "stretch" => Ok(FitPolicy::Stretch),
            "crop-to-fill" | "crop" | "fill" => Ok(FitPolicy::CropToFill),
            "pad-to-fit" | "pad" | "fit" => Ok(FitPolicy::PadToFit),
            other => Err(TransformError::Validation(format!(
                "unknown fit policy '{other}' (expected stretch, crop-to-fill or pad-to-fit)"
            ))),
        }
    }
}

/// Canvas color for padded output, straight (non-premultiplied) RGBA8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FillColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl FillColor {
    pub const WHITE: FillColor = FillColor::rgba(255, 255, 255, 255);
    pub const BLACK: FillColor = FillColor::rgba(0, 0, 0, 255);
    pub const TRANSPARENT: FillColor = FillColor::rgba(0, 0, 0, 0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_pixel(self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, self.a])
    }

    /// `#rrggbbaa`, the form written to transform records.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

impl Default for FillColor {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for FillColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for FillColor {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_color(s)
            .ok_or_else(|| TransformError::Validation(format!("invalid fill color '{s}'")))
    }
}

impl Serialize for FillColor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for FillColor {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A validated transform request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformSpec {
    pub target: Dimensions,
    pub policy: FitPolicy,
    /// Only meaningful for [`FitPolicy::Stretch`]: letterbox inside the target
    /// box instead of distorting. The output is still exactly the target size.
    /// The other policies always keep the aspect ratio.
    pub preserve_aspect_ratio: bool,
    /// Only used by [`FitPolicy::PadToFit`].
    pub fill_color: FillColor,
}

impl TransformSpec {
    pub fn new(width: u32, height: u32, policy: FitPolicy) -> Self {
        Self {
            target: Dimensions::new(width, height),
            policy,
            preserve_aspect_ratio: false,
            fill_color: FillColor::default(),
        }
    }

    pub fn with_fill_color(mut self, fill_color: FillColor) -> Self {
        self.fill_color = fill_color;
        self
    }

    pub fn preserving_aspect_ratio(mut self, preserve: bool) -> Self {
        self.preserve_aspect_ratio = preserve;
        self
    }

    /// Target dimensions must both be positive. Zero is rejected, never clamped.
    pub fn validate(&self) -> Result<(), TransformError> {
        if self.target.is_empty() {
            return Err(TransformError::Validation(format!(
                "target dimensions must be positive, got {}",
                self.target
            )));
        }
        Ok(())
    }
}

/// Transform request as received from outside the core.
///
/// Every field is optional and falls back to the configured
/// [`DefaultsConfig`]. Dimensions are signed so that negative input reaches
/// validation instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformRequest {
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub policy: Option<FitPolicy>,
    pub preserve_aspect_ratio: Option<bool>,
    pub fill_color: Option<String>,
}

impl TransformRequest {
    /// Fill unset fields from `defaults` and validate the result.
    pub fn resolve(&self, defaults: &DefaultsConfig) -> Result<TransformSpec, TransformError> {
        let width = positive_dimension("width", self.width.unwrap_or(defaults.width.into()))?;
        let height = positive_dimension("height", self.height.unwrap_or(defaults.height.into()))?;
        let fill_color = match &self.fill_color {
            Some(color) => color.parse()?,
            None => defaults.fill_color,
        };

        let spec = TransformSpec {
            target: Dimensions::new(width, height),
            policy: self.policy.unwrap_or(defaults.policy),
            preserve_aspect_ratio: self
                .preserve_aspect_ratio
                .unwrap_or(defaults.preserve_aspect_ratio),
            fill_color,
        };
        spec.validate()?;
        Ok(spec)
    }
}

fn positive_dimension(name: &str, value: i64) -> Result<u32, TransformError> {
    match u32::try_from(value) {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(TransformError::Validation(format!(
            "target {name} must be a positive integer, got {value}"
        ))),
    }
}
