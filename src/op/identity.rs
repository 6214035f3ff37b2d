use std::sync::Arc;

use crate::error::ProjError;
use crate::op::{check_dim, CoordinateOperation, OpRef};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Identity {
    dim: usize,
}

impl Identity {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    pub fn op(dim: usize) -> OpRef {
        Arc::new(Self::new(dim))
    }
}

impl CoordinateOperation for Identity {
    fn name(&self) -> &str {
        "identity"
    }

    fn source_dim(&self) -> usize {
        self.dim
    }

    fn target_dim(&self) -> usize {
        self.dim
    }

    fn transform(&self, coord: &[f64]) -> Result<Vec<f64>, ProjError> {
        check_dim(self.name(), self.dim, coord)?;
        Ok(coord.to_vec())
    }

    fn inverse(&self) -> Result<OpRef, ProjError> {
        Ok(Arc::new(*self))
    }

    fn precision(&self) -> f64 {
        0.0
    }

    fn is_identity(&self) -> bool {
        true
    }
}
