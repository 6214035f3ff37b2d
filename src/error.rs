use thiserror::Error;

use crate::geodesy::extent::GeographicExtent;

#[derive(Error, Debug)]
pub enum ProjError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Dimension mismatch in {operation}: expected {expected}, got {actual}")]
    Dimension {
        operation: String,
        expected: usize,
        actual: usize,
    },

    #[error("Coordinate {coord:?} is outside of the valid extent {extent}")]
    OutOfExtent {
        coord: Vec<f64>,
        extent: GeographicExtent,
    },

    #[error("Transform failed: {0}")]
    TransformFailed(String),

    #[error("Operation is not invertible: {0}")]
    NonInvertible(String),

    #[error("No operation available from {from} to {to}: {reason}")]
    NoPath {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Unknown {kind}: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("Grid error: {0}")]
    Grid(#[from] GridError),
}

impl ProjError {
    /// True for errors caused by the coordinate itself rather than by the
    /// way the operation chain was configured.
    pub fn is_domain_error(&self) -> bool {
        matches!(
            self,
            ProjError::OutOfExtent { .. } | ProjError::TransformFailed(_)
        )
    }
}

#[derive(Error, Debug)]
pub enum GridError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bad grid signature: expected {expected:?}, found {found:?}")]
    BadSignature { expected: String, found: String },

    #[error("Truncated grid stream: {0}")]
    Truncated(String),

    #[error("Invalid grid header: {0}")]
    InvalidHeader(String),

    #[error("Malformed grid data: {0}")]
    Format(String),

    #[error("Grid value {value} does not fit a scaled 32-bit integer (scale {scale})")]
    ValueOutOfRange { value: f64, scale: f64 },
}
