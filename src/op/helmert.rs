//! Bursa-Wolf (linearised 7-parameter Helmert) similarity between geocentric
//! frames, position-vector convention.

use std::sync::Arc;

use crate::error::ProjError;
use crate::op::{check_dim, CoordinateOperation, OpRef};
use crate::units::Unit;

/// Largest rotation magnitude for which negating the parameters is an
/// acceptable inverse: 20 arc-seconds.
pub const MAX_INVERTIBLE_ROTATION: f64 = 20.0 * std::f64::consts::PI / 648_000.0;

const THREE_PARAMETER_PRECISION: f64 = 5.0;
const SEVEN_PARAMETER_PRECISION: f64 = 1.0;

#[derive(Clone, Debug, PartialEq)]
pub struct BursaWolf {
    /// Translations (metres)
    tx: f64,
    ty: f64,
    tz: f64,
    /// Rotations (radians)
    rx: f64,
    ry: f64,
    rz: f64,
    /// Scale difference (unitless, `1 + ds` multiplies)
    ds: f64,
    precision: f64,
}

impl BursaWolf {
    /// Parameters in the units of a `towgs84` list: metres, arc-seconds, ppm.
    pub fn from_towgs84(values: &[f64]) -> Result<Self, ProjError> {
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ProjError::InvalidParameter(format!(
                "towgs84 values must be finite: {values:?}"
            )));
        }
        match *values {
            [tx, ty, tz] => Ok(Self::translation(tx, ty, tz)),
            [tx, ty, tz, rx, ry, rz, ds] => {
                Ok(Self::seven_parameter([tx, ty, tz], [rx, ry, rz], ds))
            }
            _ => Err(ProjError::InvalidParameter(format!(
                "towgs84 needs 3 or 7 values, got {}",
                values.len()
            ))),
        }
    }

    /// Translations in metres, rotations in arc-seconds, scale in ppm.
    pub fn seven_parameter(translation: [f64; 3], rotation: [f64; 3], scale_ppm: f64) -> Self {
        let sec = Unit::arc_second().scale();
        Self {
            tx: translation[0],
            ty: translation[1],
            tz: translation[2],
            rx: rotation[0] * sec,
            ry: rotation[1] * sec,
            rz: rotation[2] * sec,
            ds: scale_ppm * Unit::ppm().scale(),
            precision: SEVEN_PARAMETER_PRECISION,
        }
    }

    pub fn translation(tx: f64, ty: f64, tz: f64) -> Self {
        Self {
            tx,
            ty,
            tz,
            rx: 0.0,
            ry: 0.0,
            rz: 0.0,
            ds: 0.0,
            precision: THREE_PARAMETER_PRECISION,
        }
    }

    pub fn with_precision(mut self, precision: f64) -> Self {
        self.precision = precision;
        self
    }

    pub fn translations(&self) -> [f64; 3] {
        [self.tx, self.ty, self.tz]
    }

    /// Rotations in radians.
    pub fn rotations(&self) -> [f64; 3] {
        [self.rx, self.ry, self.rz]
    }

    pub fn scale_difference(&self) -> f64 {
        self.ds
    }

    pub fn rotation_magnitude(&self) -> f64 {
        (self.rx * self.rx + self.ry * self.ry + self.rz * self.rz).sqrt()
    }
}

impl CoordinateOperation for BursaWolf {
    fn name(&self) -> &str {
        "bursa-wolf"
    }

    fn source_dim(&self) -> usize {
        3
    }

    fn target_dim(&self) -> usize {
        3
    }

    fn transform(&self, coord: &[f64]) -> Result<Vec<f64>, ProjError> {
        check_dim(self.name(), 3, coord)?;
        let (x, y, z) = (coord[0], coord[1], coord[2]);
        let k = 1.0 + self.ds;
        Ok(vec![
            self.tx + k * (x - self.rz * y + self.ry * z),
            self.ty + k * (self.rz * x + y - self.rx * z),
            self.tz + k * (-self.ry * x + self.rx * y + z),
        ])
    }

    /// Negated parameters, valid only while the rotations stay small.
    fn inverse(&self) -> Result<OpRef, ProjError> {
        let magnitude = self.rotation_magnitude();
        if magnitude > MAX_INVERTIBLE_ROTATION {
            return Err(ProjError::NonInvertible(format!(
                "Bursa-Wolf rotation of {:.3}\" exceeds the 20\" linearisation limit",
                magnitude / Unit::arc_second().scale()
            )));
        }
        Ok(Arc::new(Self {
            tx: -self.tx,
            ty: -self.ty,
            tz: -self.tz,
            rx: -self.rx,
            ry: -self.ry,
            rz: -self.rz,
            ds: -self.ds,
            precision: self.precision,
        }))
    }

    fn precision(&self) -> f64 {
        self.precision
    }

    fn is_identity(&self) -> bool {
        [self.tx, self.ty, self.tz, self.rx, self.ry, self.rz, self.ds]
            .iter()
            .all(|v| *v == 0.0)
    }
}
