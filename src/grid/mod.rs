//! Regular longitude/latitude grids of correction values.
//!
//! A grid is `rows × cols` nodes of `dim` values each. Column `i` sits at
//! longitude `x0 + i·dx`, row `j` at latitude `y0 + j·dy`, both in degrees.
//! Grids are immutable once built and are shared as `Arc<Grid>`.

pub mod bits;
pub mod codec;
pub mod interpolate;
pub mod ntv2;
pub mod shift;
pub mod text;

use std::fmt;

use ndarray::{Array3, ArrayView3};
use tracing::info;

use crate::error::GridError;
use crate::geodesy::extent::GeographicExtent;

pub use shift::{GeocentricGridTranslation, GeographicGridShift, GeoidHeight};

#[derive(Clone, Debug)]
pub struct Grid {
    name: String,
    x0: f64,
    y0: f64,
    dx: f64,
    dy: f64,
    extent: GeographicExtent,
    /// Quantisation factor used when the grid is stored as integers.
    scale: f64,
    values: Array3<f64>,
}

impl Grid {
    /// Grid with node `(row, col)` at `(x0 + col·dx, y0 + row·dy)`.
    ///
    /// `values` is shaped `(rows, cols, dim)`.
    pub fn new(
        name: &str,
        x0: f64,
        y0: f64,
        dx: f64,
        dy: f64,
        values: Array3<f64>,
    ) -> Result<Self, GridError> {
        let (rows, cols, dim) = values.dim();
        if rows < 2 || cols < 2 || dim == 0 {
            return Err(GridError::InvalidHeader(format!(
                "grid {name}: needs at least 2x2 nodes of one value, got {rows}x{cols}x{dim}"
            )));
        }
        if ![x0, y0, dx, dy].iter().all(|v| v.is_finite()) || dx == 0.0 || dy == 0.0 {
            return Err(GridError::InvalidHeader(format!(
                "grid {name}: invalid geometry origin ({x0}, {y0}) step ({dx}, {dy})"
            )));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(GridError::Format(format!("grid {name}: non-finite value {bad}")));
        }

        let x_last = x0 + (cols - 1) as f64 * dx;
        let y_last = y0 + (rows - 1) as f64 * dy;
        let extent =
            GeographicExtent::new(y0.min(y_last), y0.max(y_last), x0.min(x_last), x0.max(x_last))
                .map_err(|e| GridError::InvalidHeader(format!("grid {name}: {e}")))?;

        info!(grid = name, rows, cols, dim, %extent, "grid loaded");
        Ok(Self {
            name: name.to_string(),
            x0,
            y0,
            dx,
            dy,
            extent,
            scale: 1.0,
            values,
        })
    }

    /// Grid from row-major node values, `dim` consecutive values per node.
    #[allow(clippy::too_many_arguments)]
    pub fn from_vec(
        name: &str,
        x0: f64,
        y0: f64,
        dx: f64,
        dy: f64,
        rows: usize,
        cols: usize,
        dim: usize,
        data: Vec<f64>,
    ) -> Result<Self, GridError> {
        let values = Array3::from_shape_vec((rows, cols, dim), data)
            .map_err(|e| GridError::Format(format!("grid {name}: {e}")))?;
        Self::new(name, x0, y0, dx, dy, values)
    }

    pub fn with_scale(mut self, scale: f64) -> Result<Self, GridError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(GridError::InvalidHeader(format!("grid {}: scale {scale}", self.name)));
        }
        self.scale = scale;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> usize {
        self.values.dim().0
    }

    pub fn cols(&self) -> usize {
        self.values.dim().1
    }

    pub fn dim(&self) -> usize {
        self.values.dim().2
    }

    pub fn x0(&self) -> f64 {
        self.x0
    }

    pub fn y0(&self) -> f64 {
        self.y0
    }

    pub fn dx(&self) -> f64 {
        self.dx
    }

    pub fn dy(&self) -> f64 {
        self.dy
    }

    pub fn x_last(&self) -> f64 {
        self.x0 + (self.cols() - 1) as f64 * self.dx
    }

    pub fn y_last(&self) -> f64 {
        self.y0 + (self.rows() - 1) as f64 * self.dy
    }

    pub fn extent(&self) -> &GeographicExtent {
        &self.extent
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn values(&self) -> ArrayView3<'_, f64> {
        self.values.view()
    }

    /// Copy of the values at one node.
    pub fn node(&self, row: usize, col: usize) -> Option<Vec<f64>> {
        if row >= self.rows() || col >= self.cols() {
            return None;
        }
        Some(self.values.slice(ndarray::s![row, col, ..]).to_vec())
    }
}

impl PartialEq for Grid {
    fn eq(&self, other: &Self) -> bool {
        self.x0 == other.x0
            && self.y0 == other.y0
            && self.dx == other.dx
            && self.dy == other.dy
            && self.values == other.values
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}x{}x{} over {})",
            self.name,
            self.rows(),
            self.cols(),
            self.dim(),
            self.extent
        )
    }
}
