//! Transform error taxonomy.
//!
//! Every failure inside the pipeline is one of four kinds. The orchestrator
//! never lets them escape as panics: they are folded into
//! [`ResultImage::Failed`](super::operations::ResultImage::Failed) so that a
//! wrapping layer can map them to a response without a catch-all.

use super::backend::BackendError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// Bad target dimensions or request fields. Raised before any decoding.
    #[error("Invalid transform request: {0}")]
    Validation(String),
    /// Source bytes could not be parsed.
    #[error("Decode failed: {0}")]
    Decode(String),
    /// Internal geometry invariant violated. Indicates a planner defect.
    #[error("Geometry error: {0}")]
    Geometry(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

impl TransformError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransformError::Validation(_) => ErrorKind::Validation,
            TransformError::Decode(_) => ErrorKind::Decode,
            TransformError::Geometry(_) => ErrorKind::Geometry,
            TransformError::Encode(_) => ErrorKind::Encode,
        }
    }
}

impl From<BackendError> for TransformError {
    fn from(err: BackendError) -> Self {
        let message = err.to_string();
        match err {
            BackendError::Decode(_)
            | BackendError::UnsupportedFormat
            | BackendError::ImageTooLarge { .. } => TransformError::Decode(message),
            BackendError::InvalidGeometry { .. } => TransformError::Geometry(message),
            BackendError::Encode(_) => TransformError::Encode(message),
        }
    }
}

/// Failure category carried by a failed result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Decode,
    Geometry,
    Encode,
}

impl ErrorKind {
    /// Whether the caller is at fault (bad request or bad source image).
    pub fn is_client_error(self) -> bool {
        matches!(self, ErrorKind::Validation | ErrorKind::Decode)
    }

    /// HTTP status a web-facing wrapper should answer with.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::Decode => 422,
            ErrorKind::Geometry | ErrorKind::Encode => 500,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Decode => "decode",
            ErrorKind::Geometry => "geometry",
            ErrorKind::Encode => "encode",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
