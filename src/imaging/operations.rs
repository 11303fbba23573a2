//! High-level transform operation.
//!
//! Combines validation, geometry planning, backend pixel work and compositing
//! into one synchronous call. Failures never escape as errors or panics from
//! [`transform`] / [`transform_with`]; they come back as
//! [`ResultImage::Failed`] carrying an [`ErrorKind`] and a readable reason.

use super::backend::ImageBackend;
use super::calculations::plan_geometry;
use super::composite::composite;
use super::error::{ErrorKind, TransformError};
use super::params::{Dimensions, TransformSpec};
use super::rust_backend::RustBackend;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Terminal status of a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Failed,
}

/// A successfully transformed image. Owned by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedImage {
    /// PNG-encoded output.
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// The final canvas the bytes were encoded from.
    pub pixels: RgbaImage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformFailure {
    pub kind: ErrorKind,
    pub reason: String,
}

/// Outcome of one transform.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultImage {
    Success(TransformedImage),
    Failed(TransformFailure),
}

impl ResultImage {
    pub fn status(&self) -> Status {
        match self {
            ResultImage::Success(_) => Status::Success,
            ResultImage::Failed(_) => Status::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResultImage::Success(_))
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ResultImage::Success(_) => None,
            ResultImage::Failed(failure) => Some(failure.kind),
        }
    }

    pub fn into_result(self) -> Result<TransformedImage, TransformFailure> {
        match self {
            ResultImage::Success(image) => Ok(image),
            ResultImage::Failed(failure) => Err(failure),
        }
    }
}

impl From<Result<TransformedImage, TransformError>> for ResultImage {
    fn from(result: Result<TransformedImage, TransformError>) -> Self {
        match result {
            Ok(image) => ResultImage::Success(image),
            Err(err) => ResultImage::Failed(TransformFailure {
                kind: err.kind(),
                reason: err.to_string(),
            }),
        }
    }
}

/// Transform `source` per `spec` with the default [`RustBackend`].
pub fn transform(source: &[u8], spec: &TransformSpec) -> ResultImage {
    transform_with(&RustBackend::new(), source, spec)
}

/// Transform `source` per `spec` using a specific backend (allows testing with mock).
pub fn transform_with(
    backend: &impl ImageBackend,
    source: &[u8],
    spec: &TransformSpec,
) -> ResultImage {
    let result = try_transform(backend, source, spec);
    if let Err(err) = &result {
        warn!(kind = %err.kind(), error = %err, "transform failed");
    }
    result.into()
}

/// The transform pipeline with `?` propagation. Validation runs before any
/// decoding is attempted.
pub fn try_transform(
    backend: &impl ImageBackend,
    source: &[u8],
    spec: &TransformSpec,
) -> Result<TransformedImage, TransformError> {
    spec.validate()?;
    let limits = backend.limits();
    if !limits.allows_output(spec.target) {
        return Err(TransformError::Validation(format!(
            "target {} exceeds the output limit of {}px per side and {} megapixels",
            spec.target, limits.max_output_dimension, limits.max_output_megapixels
        )));
    }

    let decoded = backend.decode(source)?;
    let source_dims = decoded.dimensions();
    debug!(
        source = %source_dims,
        format = ?decoded.format,
        has_alpha = decoded.has_alpha,
        "decoded source"
    );

    let plan = plan_geometry(source_dims, spec);
    debug!(
        policy = %spec.policy,
        scaled = %plan.scaled,
        canvas = %plan.canvas,
        placement = ?plan.placement,
        "planned geometry"
    );
    for (stage, size) in [("scaled image", plan.scaled), ("canvas", plan.canvas)] {
        if !limits.allows_output(size) {
            return Err(TransformError::Geometry(format!(
                "{stage} {size} for a {source_dims} source exceeds the output limits"
            )));
        }
    }

    let resampled = backend.resample(&decoded, plan.scaled)?;
    let canvas = composite(resampled, &plan, spec.fill_color)?;

    let actual = Dimensions::new(canvas.width(), canvas.height());
    if actual != plan.canvas {
        return Err(TransformError::Geometry(format!(
            "composited canvas is {actual}, expected {}",
            plan.canvas
        )));
    }

    let bytes = backend.encode(&canvas)?;
    debug!(output = %actual, bytes = bytes.len(), "encoded result");

    Ok(TransformedImage {
        bytes,
        width: actual.width,
        height: actual.height,
        pixels: canvas,
    })
}
