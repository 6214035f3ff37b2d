//! Operations driven by interpolated grid values.
//!
//! Grids are indexed in degrees while operations work on radians, so each
//! lookup converts the `[lon, lat]` it is handed. Coordinates outside a grid
//! fail with `OutOfExtent`; there is no fallback value.

use std::sync::Arc;

use tracing::trace;

use crate::error::ProjError;
use crate::geodesy::ellipsoid::Ellipsoid;
use crate::grid::Grid;
use crate::op::geocentric::geocentric_to_geographic;
use crate::op::{check_dim, CoordinateOperation, OpRef};

/// Declared precision of grid-based corrections, in metres.
pub const GRID_PRECISION: f64 = 0.05;

const MAX_ITERATIONS: usize = 10;
/// Angular convergence for inverse shifts, about 0.1 mm on the ground.
const ANGULAR_TOLERANCE: f64 = 1e-11;
const LINEAR_TOLERANCE: f64 = 1e-4;

fn require_dim(grid: &Grid, dim: usize, operation: &str) -> Result<(), ProjError> {
    if grid.dim() != dim {
        return Err(ProjError::InvalidParameter(format!(
            "{operation} needs a grid of {dim} values per node, {} has {}",
            grid.name(),
            grid.dim()
        )));
    }
    Ok(())
}

fn lookup(grid: &Grid, lon: f64, lat: f64, out: &mut [f64]) -> Result<(), ProjError> {
    grid.interpolate_into(lat.to_degrees(), lon.to_degrees(), out)
}

/// `lon += Δlon`, `lat += Δlat` from a grid of `(Δlat, Δlon)` in degrees.
#[derive(Clone, Debug)]
pub struct GeographicGridShift {
    grid: Arc<Grid>,
    inverse: bool,
    precision: f64,
}

impl GeographicGridShift {
    pub fn new(grid: Arc<Grid>) -> Result<Self, ProjError> {
        require_dim(&grid, 2, "geographic grid shift")?;
        Ok(Self {
            grid,
            inverse: false,
            precision: GRID_PRECISION,
        })
    }

    pub fn with_precision(mut self, precision: f64) -> Self {
        self.precision = precision;
        self
    }

    pub fn grid(&self) -> &Arc<Grid> {
        &self.grid
    }

    /// `(Δlon, Δlat)` in radians at a position in radians.
    fn shift_at(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjError> {
        let mut d = [0.0; 2];
        lookup(&self.grid, lon, lat, &mut d)?;
        Ok((d[1].to_radians(), d[0].to_radians()))
    }

    /// Solve `p + shift(p) = target` by fixed-point iteration.
    fn unshift(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjError> {
        let (dlon, dlat) = self.shift_at(lon, lat)?;
        let (mut x, mut y) = (lon - dlon, lat - dlat);
        for iteration in 0..MAX_ITERATIONS {
            let (dlon, dlat) = self.shift_at(x, y)?;
            let (nx, ny) = (lon - dlon, lat - dlat);
            let change = (nx - x).abs().max((ny - y).abs());
            x = nx;
            y = ny;
            if change < ANGULAR_TOLERANCE {
                trace!(grid = self.grid.name(), iteration, "inverse grid shift converged");
                return Ok((x, y));
            }
        }
        Err(ProjError::TransformFailed(format!(
            "inverse shift in {} did not converge at ({lon}, {lat})",
            self.grid.name()
        )))
    }
}

impl CoordinateOperation for GeographicGridShift {
    fn name(&self) -> &str {
        if self.inverse {
            "inverse geographic grid shift"
        } else {
            "geographic grid shift"
        }
    }

    fn source_dim(&self) -> usize {
        3
    }

    fn target_dim(&self) -> usize {
        3
    }

    fn transform(&self, coord: &[f64]) -> Result<Vec<f64>, ProjError> {
        check_dim(self.name(), 3, coord)?;
        let (lon, lat) = if self.inverse {
            self.unshift(coord[0], coord[1])?
        } else {
            let (dlon, dlat) = self.shift_at(coord[0], coord[1])?;
            (coord[0] + dlon, coord[1] + dlat)
        };
        Ok(vec![lon, lat, coord[2]])
    }

    fn inverse(&self) -> Result<OpRef, ProjError> {
        Ok(Arc::new(Self {
            grid: Arc::clone(&self.grid),
            inverse: !self.inverse,
            precision: self.precision,
        }))
    }

    fn precision(&self) -> f64 {
        self.precision
    }
}

/// `XYZ += T(lon, lat)` from a grid of geocentric translations in metres,
/// the position being computed on the source ellipsoid.
#[derive(Clone, Debug)]
pub struct GeocentricGridTranslation {
    grid: Arc<Grid>,
    ellipsoid: Ellipsoid,
    inverse: bool,
    precision: f64,
}

impl GeocentricGridTranslation {
    pub fn new(grid: Arc<Grid>, source_ellipsoid: Ellipsoid) -> Result<Self, ProjError> {
        require_dim(&grid, 3, "geocentric grid translation")?;
        Ok(Self {
            grid,
            ellipsoid: source_ellipsoid,
            inverse: false,
            precision: GRID_PRECISION,
        })
    }

    pub fn with_precision(mut self, precision: f64) -> Self {
        self.precision = precision;
        self
    }

    pub fn grid(&self) -> &Arc<Grid> {
        &self.grid
    }

    fn translation_at(&self, xyz: [f64; 3]) -> Result<[f64; 3], ProjError> {
        let [lon, lat, _] = geocentric_to_geographic(&self.ellipsoid, xyz[0], xyz[1], xyz[2]);
        let mut t = [0.0; 3];
        lookup(&self.grid, lon, lat, &mut t)?;
        Ok(t)
    }

    fn untranslate(&self, target: [f64; 3]) -> Result<[f64; 3], ProjError> {
        let t = self.translation_at(target)?;
        let mut p = [target[0] - t[0], target[1] - t[1], target[2] - t[2]];
        for iteration in 0..MAX_ITERATIONS {
            let t = self.translation_at(p)?;
            let next = [target[0] - t[0], target[1] - t[1], target[2] - t[2]];
            let change = (0..3).map(|k| (next[k] - p[k]).abs()).fold(0.0, f64::max);
            p = next;
            if change < LINEAR_TOLERANCE {
                trace!(grid = self.grid.name(), iteration, "inverse grid translation converged");
                return Ok(p);
            }
        }
        Err(ProjError::TransformFailed(format!(
            "inverse translation in {} did not converge at {target:?}",
            self.grid.name()
        )))
    }
}

impl CoordinateOperation for GeocentricGridTranslation {
    fn name(&self) -> &str {
        if self.inverse {
            "inverse geocentric grid translation"
        } else {
            "geocentric grid translation"
        }
    }

    fn source_dim(&self) -> usize {
        3
    }

    fn target_dim(&self) -> usize {
        3
    }

    fn transform(&self, coord: &[f64]) -> Result<Vec<f64>, ProjError> {
        check_dim(self.name(), 3, coord)?;
        let xyz = [coord[0], coord[1], coord[2]];
        let out = if self.inverse {
            self.untranslate(xyz)?
        } else {
            let t = self.translation_at(xyz)?;
            [xyz[0] + t[0], xyz[1] + t[1], xyz[2] + t[2]]
        };
        Ok(out.to_vec())
    }

    fn inverse(&self) -> Result<OpRef, ProjError> {
        Ok(Arc::new(Self {
            grid: Arc::clone(&self.grid),
            ellipsoid: self.ellipsoid.clone(),
            inverse: !self.inverse,
            precision: self.precision,
        }))
    }

    fn precision(&self) -> f64 {
        self.precision
    }
}

/// Ellipsoidal height from altitude: `h = H + N(lon, lat)`.
#[derive(Clone, Debug)]
pub struct GeoidHeight {
    grid: Arc<Grid>,
    inverse: bool,
    precision: f64,
}

impl GeoidHeight {
    pub fn new(grid: Arc<Grid>) -> Result<Self, ProjError> {
        require_dim(&grid, 1, "geoid height")?;
        Ok(Self {
            grid,
            inverse: false,
            precision: GRID_PRECISION,
        })
    }

    pub fn with_precision(mut self, precision: f64) -> Self {
        self.precision = precision;
        self
    }
}

impl CoordinateOperation for GeoidHeight {
    fn name(&self) -> &str {
        if self.inverse {
            "ellipsoidal height to altitude"
        } else {
            "altitude to ellipsoidal height"
        }
    }

    fn source_dim(&self) -> usize {
        3
    }

    fn target_dim(&self) -> usize {
        3
    }

    fn transform(&self, coord: &[f64]) -> Result<Vec<f64>, ProjError> {
        check_dim(self.name(), 3, coord)?;
        let mut n = [0.0];
        lookup(&self.grid, coord[0], coord[1], &mut n)?;
        let h = if self.inverse { coord[2] - n[0] } else { coord[2] + n[0] };
        Ok(vec![coord[0], coord[1], h])
    }

    fn inverse(&self) -> Result<OpRef, ProjError> {
        Ok(Arc::new(Self {
            grid: Arc::clone(&self.grid),
            inverse: !self.inverse,
            precision: self.precision,
        }))
    }

    fn precision(&self) -> f64 {
        self.precision
    }
}
