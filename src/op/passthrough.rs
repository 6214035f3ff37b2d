use std::sync::Arc;

use crate::error::ProjError;
use crate::op::{check_dim, CoordinateOperation, OpRef};

/// Runs a horizontal operation on the first two ordinates of a 3D coordinate
/// and carries the third (a gravity-related height) through untouched.
///
/// The inner operation sees `[a, b, 0]` when it is 3D and `[a, b]` when it
/// is 2D; its own height output is discarded.
#[derive(Clone, Debug)]
pub struct HorizontalOnly {
    inner: OpRef,
}

impl HorizontalOnly {
    pub fn new(inner: OpRef) -> Result<Self, ProjError> {
        let (src, dst) = (inner.source_dim(), inner.target_dim());
        if !(2..=3).contains(&src) || !(2..=3).contains(&dst) {
            return Err(ProjError::InvalidParameter(format!(
                "horizontal pass-through needs a 2D or 3D operation, got {src}D -> {dst}D"
            )));
        }
        Ok(Self { inner })
    }

    pub fn inner(&self) -> &OpRef {
        &self.inner
    }
}

impl CoordinateOperation for HorizontalOnly {
    fn name(&self) -> &str {
        "horizontal pass-through"
    }

    fn source_dim(&self) -> usize {
        3
    }

    fn target_dim(&self) -> usize {
        3
    }

    fn transform(&self, coord: &[f64]) -> Result<Vec<f64>, ProjError> {
        check_dim(self.name(), 3, coord)?;
        let mut input = vec![coord[0], coord[1], 0.0];
        input.truncate(self.inner.source_dim());
        let out = self.inner.transform(&input)?;
        Ok(vec![out[0], out[1], coord[2]])
    }

    fn inverse(&self) -> Result<OpRef, ProjError> {
        Ok(Arc::new(Self {
            inner: self.inner.inverse()?,
        }))
    }

    fn precision(&self) -> f64 {
        self.inner.precision()
    }

    fn is_identity(&self) -> bool {
        self.inner.is_identity()
    }
}
