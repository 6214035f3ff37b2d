use std::sync::Arc;

use crate::error::ProjError;
use crate::op::{check_dim, CoordinateOperation, OpRef};
use crate::units::Unit;

/// Per-axis affine unit change: `out[i] = in[i] * scale[i] + offset[i]`.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitConversion {
    scale: Vec<f64>,
    offset: Vec<f64>,
}

impl UnitConversion {
    pub fn new(scale: &[f64], offset: &[f64]) -> Result<Self, ProjError> {
        if scale.len() != offset.len() || scale.is_empty() {
            return Err(ProjError::InvalidParameter(format!(
                "unit conversion needs one scale and one offset per axis ({} vs {})",
                scale.len(),
                offset.len()
            )));
        }
        let bad_scale = scale.iter().any(|s| !s.is_finite() || *s == 0.0);
        if bad_scale || offset.iter().any(|o| !o.is_finite()) {
            return Err(ProjError::InvalidParameter(format!(
                "unit conversion factors must be finite and non-zero: {scale:?} {offset:?}"
            )));
        }
        Ok(Self {
            scale: scale.to_vec(),
            offset: offset.to_vec(),
        })
    }

    pub fn scaling(scale: &[f64]) -> Result<Self, ProjError> {
        Self::new(scale, &vec![0.0; scale.len()])
    }

    /// Conversion from `from[i]` to `to[i]` on every axis.
    pub fn between(from: &[Unit], to: &[Unit]) -> Result<Self, ProjError> {
        if from.len() != to.len() {
            return Err(ProjError::InvalidParameter(format!(
                "unit lists differ in length: {} vs {}",
                from.len(),
                to.len()
            )));
        }
        let mut scale = Vec::with_capacity(from.len());
        let mut offset = Vec::with_capacity(from.len());
        for (f, t) in from.iter().zip(to) {
            // Validates that both units measure the same quantity.
            f.convert(0.0, t)?;
            scale.push(f.scale() / t.scale());
            offset.push((f.offset() - t.offset()) / t.scale());
        }
        Self::new(&scale, &offset)
    }
}

impl CoordinateOperation for UnitConversion {
    fn name(&self) -> &str {
        "unit conversion"
    }

    fn source_dim(&self) -> usize {
        self.scale.len()
    }

    fn target_dim(&self) -> usize {
        self.scale.len()
    }

    fn transform(&self, coord: &[f64]) -> Result<Vec<f64>, ProjError> {
        check_dim(self.name(), self.scale.len(), coord)?;
        Ok(coord
            .iter()
            .zip(self.scale.iter().zip(&self.offset))
            .map(|(v, (s, o))| v * s + o)
            .collect())
    }

    fn inverse(&self) -> Result<OpRef, ProjError> {
        let scale: Vec<f64> = self.scale.iter().map(|s| 1.0 / s).collect();
        let offset: Vec<f64> = self
            .offset
            .iter()
            .zip(&self.scale)
            .map(|(o, s)| -o / s)
            .collect();
        Ok(Arc::new(Self { scale, offset }))
    }

    fn precision(&self) -> f64 {
        1e-12
    }

    fn is_identity(&self) -> bool {
        self.scale.iter().all(|s| *s == 1.0) && self.offset.iter().all(|o| *o == 0.0)
    }
}
