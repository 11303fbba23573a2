//! Image transforms in pure Rust, built on the `image` crate.
//!
//! | Stage | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (format sniffed from content) |
//! | **Plan** | [`plan_geometry`], pure dimension math |
//! | **Resample** | Lanczos3, premultiplied alpha |
//! | **Composite** | crop window / padded canvas |
//! | **Encode** | PNG, deterministic |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for geometry (unit testable)
//! - **Parameters**: Data structures describing a transform request
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Composite**: Crop and pad on top of a resampled buffer
//! - **Operations**: The [`transform`] orchestrator combining all of the above

pub mod backend;
mod calculations;
mod color;
pub mod composite;
mod error;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend, SourceImage};
pub use calculations::{
    CropRect, GeometryPlan, Padding, Placement, centered_offset, fill_dimensions, fit_dimensions,
    plan_geometry,
};
pub use error::{ErrorKind, TransformError};
pub use operations::{
    ResultImage, Status, TransformFailure, TransformedImage, transform, transform_with,
    try_transform,
};
pub use params::{Dimensions, FillColor, FitPolicy, TransformRequest, TransformSpec};
pub use rust_backend::RustBackend;
