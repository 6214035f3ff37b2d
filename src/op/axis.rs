//! Axis order, axis direction and dimension changes.

use std::sync::Arc;

use crate::error::ProjError;
use crate::op::{check_dim, CoordinateOperation, OpRef};

/// `out[k] = sign[k] * in[order[k]]`.
#[derive(Clone, Debug, PartialEq)]
pub struct AxisReorder {
    order: Vec<usize>,
    signs: Vec<f64>,
}

impl AxisReorder {
    pub fn new(order: &[usize], signs: &[f64]) -> Result<Self, ProjError> {
        if order.len() != signs.len() || order.is_empty() {
            return Err(ProjError::InvalidParameter(format!(
                "axis order {order:?} and signs {signs:?} differ in length"
            )));
        }
        let mut seen = vec![false; order.len()];
        for &i in order {
            if i >= order.len() || seen[i] {
                return Err(ProjError::InvalidParameter(format!(
                    "axis order {order:?} is not a permutation"
                )));
            }
            seen[i] = true;
        }
        if signs.iter().any(|s| *s != 1.0 && *s != -1.0) {
            return Err(ProjError::InvalidParameter(format!(
                "axis signs must be +1 or -1: {signs:?}"
            )));
        }
        Ok(Self {
            order: order.to_vec(),
            signs: signs.to_vec(),
        })
    }

    /// Swap the first two ordinates, leaving the rest in place.
    pub fn swap_xy(dim: usize) -> Result<Self, ProjError> {
        let mut order: Vec<usize> = (0..dim).collect();
        if dim < 2 {
            return Err(ProjError::InvalidParameter(format!(
                "cannot swap axes of a {dim}D coordinate"
            )));
        }
        order.swap(0, 1);
        Self::new(&order, &vec![1.0; dim])
    }
}

impl CoordinateOperation for AxisReorder {
    fn name(&self) -> &str {
        "axis reorder"
    }

    fn source_dim(&self) -> usize {
        self.order.len()
    }

    fn target_dim(&self) -> usize {
        self.order.len()
    }

    fn transform(&self, coord: &[f64]) -> Result<Vec<f64>, ProjError> {
        check_dim(self.name(), self.order.len(), coord)?;
        Ok(self
            .order
            .iter()
            .zip(&self.signs)
            .map(|(&i, s)| coord[i] * s)
            .collect())
    }

    fn inverse(&self) -> Result<OpRef, ProjError> {
        let mut order = vec![0; self.order.len()];
        let mut signs = vec![1.0; self.order.len()];
        for (k, &i) in self.order.iter().enumerate() {
            order[i] = k;
            signs[i] = self.signs[k];
        }
        Ok(Arc::new(Self { order, signs }))
    }

    fn precision(&self) -> f64 {
        0.0
    }

    fn is_identity(&self) -> bool {
        self.order.iter().enumerate().all(|(k, &i)| k == i) && self.signs.iter().all(|s| *s == 1.0)
    }
}

/// Pads with zeros or truncates trailing ordinates, typically 2D↔3D
/// geographic with `h = 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChangeDimension {
    from: usize,
    to: usize,
}

impl ChangeDimension {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    pub fn op(from: usize, to: usize) -> OpRef {
        Arc::new(Self::new(from, to))
    }
}

impl CoordinateOperation for ChangeDimension {
    fn name(&self) -> &str {
        if self.to > self.from {
            "height padding"
        } else {
            "height drop"
        }
    }

    fn source_dim(&self) -> usize {
        self.from
    }

    fn target_dim(&self) -> usize {
        self.to
    }

    fn transform(&self, coord: &[f64]) -> Result<Vec<f64>, ProjError> {
        check_dim(self.name(), self.from, coord)?;
        let mut out = coord.to_vec();
        out.resize(self.to, 0.0);
        Ok(out)
    }

    fn inverse(&self) -> Result<OpRef, ProjError> {
        Ok(Arc::new(Self::new(self.to, self.from)))
    }

    fn precision(&self) -> f64 {
        0.0
    }

    fn is_identity(&self) -> bool {
        self.from == self.to
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reorder_with_sign() {
        // (north, west, up) -> (east, north, up)
        let op = AxisReorder::new(&[1, 0, 2], &[-1.0, 1.0, 1.0]).unwrap();
        let out = op.transform(&[45.0, 3.0, 10.0]).unwrap();
        assert_eq!(out, vec![-3.0, 45.0, 10.0]);
        let back = op.inverse().unwrap().transform(&out).unwrap();
        assert_eq!(back, vec![45.0, 3.0, 10.0]);
    }

    #[test]
    fn test_cyclic_inverse() {
        let op = AxisReorder::new(&[2, 0, 1], &[1.0, -1.0, 1.0]).unwrap();
        let x = [1.0, 2.0, 3.0];
        let back = op.inverse().unwrap().transform(&op.transform(&x).unwrap()).unwrap();
        assert_eq!(back, x.to_vec());
    }

    #[test]
    fn test_invalid_permutation() {
        assert!(AxisReorder::new(&[0, 0], &[1.0, 1.0]).is_err());
        assert!(AxisReorder::new(&[0, 2], &[1.0, 1.0]).is_err());
        assert!(AxisReorder::new(&[1, 0], &[2.0, 1.0]).is_err());
        assert!(AxisReorder::swap_xy(1).is_err());
    }

    #[test]
    fn test_swap_xy_identity_checks() {
        assert!(!AxisReorder::swap_xy(3).unwrap().is_identity());
        assert!(AxisReorder::new(&[0, 1], &[1.0, 1.0]).unwrap().is_identity());
    }

    #[test]
    fn test_change_dimension() {
        let pad = ChangeDimension::new(2, 3);
        assert_eq!(pad.transform(&[1.0, 2.0]).unwrap(), vec![1.0, 2.0, 0.0]);
        let drop = pad.inverse().unwrap();
        assert_eq!(drop.transform(&[1.0, 2.0, 5.0]).unwrap(), vec![1.0, 2.0]);
        assert!(pad.transform(&[1.0, 2.0, 3.0]).is_err());
    }
}
