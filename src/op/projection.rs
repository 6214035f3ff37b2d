use std::sync::Arc;

use crate::error::ProjError;
use crate::op::{check_dim, CoordinateOperation, OpRef};
use crate::proj::Projection;

/// A map projection as a coordinate operation: geographic `[lon, lat(, h)]`
/// to projected `[E, N(, h)]`, or the reverse when `inverse` is set. Any
/// height is carried through.
#[derive(Clone, Debug)]
pub struct ProjectionOp {
    projection: Arc<dyn Projection>,
    inverse: bool,
    dim: usize,
}

impl ProjectionOp {
    /// Geographic to projected.
    pub fn new(projection: Arc<dyn Projection>, dim: usize) -> Result<Self, ProjError> {
        Self::build(projection, false, dim)
    }

    /// Projected to geographic.
    pub fn new_inverse(projection: Arc<dyn Projection>, dim: usize) -> Result<Self, ProjError> {
        Self::build(projection, true, dim)
    }

    fn build(
        projection: Arc<dyn Projection>,
        inverse: bool,
        dim: usize,
    ) -> Result<Self, ProjError> {
        if !(2..=3).contains(&dim) {
            return Err(ProjError::InvalidParameter(format!(
                "projection operations are 2D or 3D, got {dim}D"
            )));
        }
        Ok(Self {
            projection,
            inverse,
            dim,
        })
    }

    pub fn projection(&self) -> &Arc<dyn Projection> {
        &self.projection
    }

    pub fn is_inverse(&self) -> bool {
        self.inverse
    }
}

impl CoordinateOperation for ProjectionOp {
    fn name(&self) -> &str {
        self.projection.name()
    }

    fn source_dim(&self) -> usize {
        self.dim
    }

    fn target_dim(&self) -> usize {
        self.dim
    }

    fn transform(&self, coord: &[f64]) -> Result<Vec<f64>, ProjError> {
        check_dim(self.name(), self.dim, coord)?;
        let (a, b) = if self.inverse {
            self.projection.inverse(coord[0], coord[1])?
        } else {
            self.projection.forward(coord[0], coord[1])?
        };
        if !a.is_finite() || !b.is_finite() {
            return Err(ProjError::TransformFailed(format!(
                "{} produced a non-finite result for ({}, {})",
                self.name(),
                coord[0],
                coord[1]
            )));
        }
        let mut out = coord.to_vec();
        out[0] = a;
        out[1] = b;
        Ok(out)
    }

    fn inverse(&self) -> Result<OpRef, ProjError> {
        Ok(Arc::new(Self {
            projection: self.projection.clone(),
            inverse: !self.inverse,
            dim: self.dim,
        }))
    }

    fn precision(&self) -> f64 {
        1e-6
    }
}
