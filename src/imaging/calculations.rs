//! Pure geometry for image transforms.
//!
//! All functions here are pure and testable without any I/O or images.
//! [`plan_geometry`] turns a source size and a [`TransformSpec`] into a
//! [`GeometryPlan`]: the size to resample to, and how the resampled buffer is
//! placed on the final canvas.
//!
//! Centering always floors toward the top-left, so an odd leftover pixel ends
//! up on the right or bottom edge.

use super::params::{Dimensions, FitPolicy, TransformSpec};

/// Window extracted from the resampled buffer by [`FitPolicy::CropToFill`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Margins around the resampled buffer for [`FitPolicy::PadToFit`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Padding {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

/// How the resampled buffer becomes the final canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The resampled buffer is the canvas.
    Direct,
    Crop(CropRect),
    Pad(Padding),
}

/// Derived once per transform, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryPlan {
    /// Size of the intermediate resampled buffer.
    pub scaled: Dimensions,
    /// Size of the final output.
    pub canvas: Dimensions,
    pub placement: Placement,
}

/// Compute the geometry for transforming a `source`-sized image per `spec`.
///
/// Both `source` and `spec.target` must be non-empty; the orchestrator
/// guarantees this through validation and decoding.
///
/// # Examples
/// ```
/// # use fitframe::imaging::{Dimensions, FitPolicy, Padding, Placement, TransformSpec, plan_geometry};
/// let spec = TransformSpec::new(1280, 720, FitPolicy::PadToFit);
/// let plan = plan_geometry(Dimensions::new(1000, 500), &spec);
/// assert_eq!(plan.scaled, Dimensions::new(1280, 640));
/// assert_eq!(
///     plan.placement,
///     Placement::Pad(Padding { left: 0, top: 40, right: 0, bottom: 40 })
/// );
/// ```
pub fn plan_geometry(source: Dimensions, spec: &TransformSpec) -> GeometryPlan {
    let target = spec.target;

    match spec.policy {
        FitPolicy::Stretch if !spec.preserve_aspect_ratio => GeometryPlan {
            scaled: target,
            canvas: target,
            placement: Placement::Direct,
        },
        FitPolicy::CropToFill => {
            let scaled = fill_dimensions(source, target);
            GeometryPlan {
                scaled,
                canvas: target,
                placement: Placement::Crop(centered_crop(scaled, target)),
            }
        }
        // Stretch without distortion letterboxes exactly like pad-to-fit.
        FitPolicy::Stretch | FitPolicy::PadToFit => {
            let scaled = fit_dimensions(source, target);
            GeometryPlan {
                scaled,
                canvas: target,
                placement: Placement::Pad(centered_padding(scaled, target)),
            }
        }
    }
}

/// Dimensions that completely cover `target` while keeping the source aspect
/// ratio: `scale = max(tw / sw, th / sh)`. One dimension matches the target,
/// the other matches or exceeds it.
pub fn fill_dimensions(source: Dimensions, target: Dimensions) -> Dimensions {
    let (sx, sy) = ratios(source, target);
    scale_dimensions(source, sx.max(sy))
}

/// Dimensions that fit entirely inside `target` while keeping the source
/// aspect ratio: `scale = min(tw / sw, th / sh)`. Never exceeds the target,
/// never collapses below 1px.
pub fn fit_dimensions(source: Dimensions, target: Dimensions) -> Dimensions {
    let (sx, sy) = ratios(source, target);
    let scaled = scale_dimensions(source, sx.min(sy));
    Dimensions::new(
        scaled.width.min(target.width),
        scaled.height.min(target.height),
    )
}

/// Offset that centers `inner` within `outer`, flooring toward zero.
/// Zero when `inner` does not fit.
pub fn centered_offset(outer: u32, inner: u32) -> u32 {
    outer.saturating_sub(inner) / 2
}

/// Target-size window centered in the scaled image, clamped to its bounds.
fn centered_crop(scaled: Dimensions, target: Dimensions) -> CropRect {
    CropRect {
        x: centered_offset(scaled.width, target.width),
        y: centered_offset(scaled.height, target.height),
        width: target.width.min(scaled.width),
        height: target.height.min(scaled.height),
    }
}

/// Margins centering `scaled` on a `target` canvas. Right and bottom absorb
/// the remainder so `left + scaled + right == target`.
fn centered_padding(scaled: Dimensions, target: Dimensions) -> Padding {
    let left = centered_offset(target.width, scaled.width);
    let top = centered_offset(target.height, scaled.height);
    Padding {
        left,
        top,
        right: target.width.saturating_sub(scaled.width + left),
        bottom: target.height.saturating_sub(scaled.height + top),
    }
}

fn ratios(source: Dimensions, target: Dimensions) -> (f64, f64) {
    (
        target.width as f64 / source.width as f64,
        target.height as f64 / source.height as f64,
    )
}

fn scale_dimensions(source: Dimensions, scale: f64) -> Dimensions {
    let w = (source.width as f64 * scale).round() as u32;
    let h = (source.height as f64 * scale).round() as u32;
    Dimensions::new(w.max(1), h.max(1))
}
