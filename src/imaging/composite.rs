//! Final canvas assembly: crop extraction, padding, or pass-through.

use super::calculations::{CropRect, GeometryPlan, Padding, Placement};
use super::error::TransformError;
use super::params::{Dimensions, FillColor};
use image::{GenericImageView, RgbaImage};

/// Apply the plan's placement to a buffer already resampled to `plan.scaled`.
pub fn composite(
    resampled: RgbaImage,
    plan: &GeometryPlan,
    fill: FillColor,
) -> Result<RgbaImage, TransformError> {
    match plan.placement {
        Placement::Direct => Ok(resampled),
        Placement::Crop(rect) => crop(&resampled, rect),
        Placement::Pad(padding) => pad(&resampled, plan.canvas, padding, fill),
    }
}

/// Copy the `rect` window out of `pixels`.
pub fn crop(pixels: &RgbaImage, rect: CropRect) -> Result<RgbaImage, TransformError> {
    let (width, height) = pixels.dimensions();
    let fits = rect.width > 0
        && rect.height > 0
        && rect.x.checked_add(rect.width).is_some_and(|right| right <= width)
        && rect.y.checked_add(rect.height).is_some_and(|bottom| bottom <= height);
    if !fits {
        return Err(TransformError::Geometry(format!(
            "crop window {}x{}+{}+{} outside {width}x{height} buffer",
            rect.width, rect.height, rect.x, rect.y
        )));
    }
    Ok(pixels
        .view(rect.x, rect.y, rect.width, rect.height)
        .to_image())
}

/// Place `pixels` at `(left, top)` on a `canvas`-sized buffer filled with
/// `fill`. Pixels are copied, not blended, so a translucent fill color stays
/// exactly as given around the image.
pub fn pad(
    pixels: &RgbaImage,
    canvas: Dimensions,
    padding: Padding,
    fill: FillColor,
) -> Result<RgbaImage, TransformError> {
    let (width, height) = pixels.dimensions();
    let expected = Dimensions::new(
        padding.left + width + padding.right,
        padding.top + height + padding.bottom,
    );
    if expected != canvas {
        return Err(TransformError::Geometry(format!(
            "{width}x{height} image with padding {padding:?} does not make a {canvas} canvas"
        )));
    }

    let mut out = RgbaImage::from_pixel(canvas.width, canvas.height, fill.to_pixel());
    image::imageops::replace(&mut out, pixels, padding.left.into(), padding.top.into());
    Ok(out)
}
