//! Error types for the interaction core.

use crate::geometry::AlignKind;
use crate::object::ObjectId;
use thiserror::Error;

/// Errors raised by canvas operations.
///
/// Out-of-range transform inputs are clamped and never show up here.
#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("Unknown object: {0}")]
    UnknownObject(ObjectId),
    #[error("Invalid geometry for object {id}: {width}x{height}")]
    InvalidGeometry { id: ObjectId, width: f64, height: f64 },
    #[error("Selection too small: {required} objects required, {actual} selected")]
    SelectionTooSmall { required: usize, actual: usize },
    #[error("Alignment {0:?} would overlap other objects")]
    AlignmentCollides(AlignKind),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for canvas operations.
pub type CanvasResult<T> = Result<T, CanvasError>;
