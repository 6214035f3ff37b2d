//! Geographic `[lon, lat, h]` ↔ geocentric `[X, Y, Z]` on an ellipsoid.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use std::sync::Arc;

use crate::error::ProjError;
use crate::geodesy::ellipsoid::Ellipsoid;
use crate::op::{check_dim, CoordinateOperation, OpRef};

const LATITUDE_EPSILON: f64 = 1e-14;
const MAX_ITERATIONS: usize = 30;

/// IGN ALG0009.
pub fn geographic_to_geocentric(ellipsoid: &Ellipsoid, lon: f64, lat: f64, h: f64) -> [f64; 3] {
    let n = ellipsoid.transverse_radius_of_curvature(lat);
    let e2 = ellipsoid.eccentricity_squared();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();
    [
        (n + h) * cos_lat * cos_lon,
        (n + h) * cos_lat * sin_lon,
        (n * (1.0 - e2) + h) * sin_lat,
    ]
}

/// IGN ALG0012, iterating on the latitude.
pub fn geocentric_to_geographic(ellipsoid: &Ellipsoid, x: f64, y: f64, z: f64) -> [f64; 3] {
    let a = ellipsoid.semi_major_axis();
    let e2 = ellipsoid.eccentricity_squared();
    let p = x.hypot(y);

    if p == 0.0 {
        // On the polar axis.
        let lat = if z >= 0.0 { FRAC_PI_2 } else { -FRAC_PI_2 };
        return [0.0, lat, z.abs() - ellipsoid.semi_minor_axis()];
    }

    let lon = y.atan2(x);
    let r = (p * p + z * z).sqrt();
    let mut lat = (z / (p * (1.0 - a * e2 / r))).atan();
    for _ in 0..MAX_ITERATIONS {
        let (sin_lat, cos_lat) = lat.sin_cos();
        let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let next = (z / p / (1.0 - e2 * n * cos_lat / p)).atan();
        let delta = (next - lat).abs();
        lat = next;
        if delta < LATITUDE_EPSILON {
            break;
        }
    }

    let n = ellipsoid.transverse_radius_of_curvature(lat);
    let h = if lat.abs() < FRAC_PI_4 {
        p / lat.cos() - n
    } else {
        z / lat.sin() - n * (1.0 - e2)
    };
    [lon, lat, h]
}

#[derive(Clone, Debug)]
pub struct GeographicToGeocentric {
    ellipsoid: Ellipsoid,
}

impl GeographicToGeocentric {
    pub fn new(ellipsoid: Ellipsoid) -> Self {
        Self { ellipsoid }
    }
}

impl CoordinateOperation for GeographicToGeocentric {
    fn name(&self) -> &str {
        "geographic to geocentric"
    }

    fn source_dim(&self) -> usize {
        3
    }

    fn target_dim(&self) -> usize {
        3
    }

    fn transform(&self, coord: &[f64]) -> Result<Vec<f64>, ProjError> {
        check_dim(self.name(), 3, coord)?;
        Ok(geographic_to_geocentric(&self.ellipsoid, coord[0], coord[1], coord[2]).to_vec())
    }

    fn inverse(&self) -> Result<OpRef, ProjError> {
        Ok(Arc::new(GeocentricToGeographic::new(self.ellipsoid.clone())))
    }

    fn precision(&self) -> f64 {
        1e-6
    }
}

#[derive(Clone, Debug)]
pub struct GeocentricToGeographic {
    ellipsoid: Ellipsoid,
}

impl GeocentricToGeographic {
    pub fn new(ellipsoid: Ellipsoid) -> Self {
        Self { ellipsoid }
    }
}

impl CoordinateOperation for GeocentricToGeographic {
    fn name(&self) -> &str {
        "geocentric to geographic"
    }

    fn source_dim(&self) -> usize {
        3
    }

    fn target_dim(&self) -> usize {
        3
    }

    fn transform(&self, coord: &[f64]) -> Result<Vec<f64>, ProjError> {
        check_dim(self.name(), 3, coord)?;
        Ok(geocentric_to_geographic(&self.ellipsoid, coord[0], coord[1], coord[2]).to_vec())
    }

    fn inverse(&self) -> Result<OpRef, ProjError> {
        Ok(Arc::new(GeographicToGeocentric::new(self.ellipsoid.clone())))
    }

    fn precision(&self) -> f64 {
        1e-6
    }
}
