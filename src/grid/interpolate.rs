//! Bilinear lookup on grid nodes.

use ndarray::ArrayView3;
use num_traits::NumCast;

use crate::error::ProjError;
use crate::grid::Grid;

/// Node index and fractional weight of a grid coordinate, both taken from
/// the same quotient so they can never disagree.
///
/// The coordinate is clamped to `[0, n - 1]`; on the last node the weight is
/// zero.
pub fn split_index(q: f64, n: usize) -> (usize, f64) {
    let q = q.clamp(0.0, (n - 1) as f64);
    let base = q.floor();
    (base as usize, q - base)
}

/// Sample every value of a `(rows, cols, dim)` array at fractional
/// `(col, row)` with bilinear weights.
///
/// The next row and column clamp to the last node. Returns `None` if a
/// value cannot be represented as `f64`.
pub fn sample<T>(src: &ArrayView3<'_, T>, col: f64, row: f64, out: &mut [f64]) -> Option<()>
where
    T: Copy + NumCast,
{
    let (rows, cols, dim) = src.dim();
    let (i, fx) = split_index(col, cols);
    let (j, fy) = split_index(row, rows);
    let i1 = (i + 1).min(cols - 1);
    let j1 = (j + 1).min(rows - 1);

    for (k, slot) in out.iter_mut().enumerate().take(dim) {
        let v00: f64 = NumCast::from(src[(j, i, k)])?;
        let v01: f64 = NumCast::from(src[(j1, i, k)])?;
        let v10: f64 = NumCast::from(src[(j, i1, k)])?;
        let v11: f64 = NumCast::from(src[(j1, i1, k)])?;

        *slot = (1.0 - fx) * (1.0 - fy) * v00
            + (1.0 - fx) * fy * v01
            + fx * (1.0 - fy) * v10
            + fx * fy * v11;
    }
    Some(())
}

impl Grid {
    /// Interpolated values at `(lat, lon)` in degrees.
    pub fn interpolate(&self, lat: f64, lon: f64) -> Result<Vec<f64>, ProjError> {
        let mut out = vec![0.0; self.dim()];
        self.interpolate_into(lat, lon, &mut out)?;
        Ok(out)
    }

    /// Like [`Grid::interpolate`], writing into a caller-provided buffer of
    /// exactly `dim` values.
    pub fn interpolate_into(&self, lat: f64, lon: f64, out: &mut [f64]) -> Result<(), ProjError> {
        if out.len() != self.dim() {
            return Err(ProjError::Dimension {
                operation: format!("interpolation in {}", self.name()),
                expected: self.dim(),
                actual: out.len(),
            });
        }
        if !self.extent().contains(lat, lon) {
            return Err(ProjError::OutOfExtent {
                coord: vec![lon, lat],
                extent: self.extent().clone(),
            });
        }

        let lon = self.extent().wrap_longitude(lon);
        let col = (lon - self.x0()) / self.dx();
        let row = (lat - self.y0()) / self.dy();
        sample(&self.values(), col, row, out).ok_or_else(|| {
            ProjError::TransformFailed(format!("grid {}: value not representable", self.name()))
        })
    }
}
