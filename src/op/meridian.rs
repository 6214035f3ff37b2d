use std::sync::Arc;

use crate::error::ProjError;
use crate::op::{check_dim, CoordinateOperation, OpRef};

/// Adds a constant to the longitude (first ordinate), e.g. Paris → Greenwich.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LongitudeRotation {
    /// Radians, added to the longitude.
    rotation: f64,
    dim: usize,
}

impl LongitudeRotation {
    pub fn new(rotation: f64, dim: usize) -> Self {
        Self { rotation, dim }
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }
}

impl CoordinateOperation for LongitudeRotation {
    fn name(&self) -> &str {
        "longitude rotation"
    }

    fn source_dim(&self) -> usize {
        self.dim
    }

    fn target_dim(&self) -> usize {
        self.dim
    }

    fn transform(&self, coord: &[f64]) -> Result<Vec<f64>, ProjError> {
        check_dim(self.name(), self.dim, coord)?;
        let mut out = coord.to_vec();
        out[0] += self.rotation;
        Ok(out)
    }

    fn inverse(&self) -> Result<OpRef, ProjError> {
        Ok(Arc::new(Self::new(-self.rotation, self.dim)))
    }

    fn precision(&self) -> f64 {
        1e-12
    }

    fn is_identity(&self) -> bool {
        self.rotation == 0.0
    }
}
