//! Mercator projection, ellipsoidal, with an optional latitude of true scale.
//!
//!   forward: x = FE + a·k₀·(λ - λ₀), y = FN + a·k₀·L(φ)
//!   inverse: λ = λ₀ + (x - FE)/(a·k₀), φ = latitude((y - FN)/(a·k₀))
//!
//! `L` is the ellipsoid's isometric latitude. The poles project to infinity
//! and are rejected.

use std::f64::consts::FRAC_PI_2;

use crate::error::ProjError;
use crate::geodesy::ellipsoid::Ellipsoid;
use crate::proj::Projection;

#[derive(Clone, Debug)]
pub struct Mercator {
    ellipsoid: Ellipsoid,
    lon0: f64,
    k0: f64,
    false_easting: f64,
    false_northing: f64,
}

impl Mercator {
    pub fn new(
        ellipsoid: Ellipsoid,
        lon0: f64,
        k0: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Result<Self, ProjError> {
        if !k0.is_finite() || k0 <= 0.0 {
            return Err(ProjError::InvalidParameter(format!("mercator: scale factor {k0}")));
        }
        Ok(Self {
            ellipsoid,
            lon0,
            k0,
            false_easting,
            false_northing,
        })
    }

    /// Mercator scaled to be true along the parallel `lat_ts`.
    pub fn with_standard_parallel(
        ellipsoid: Ellipsoid,
        lon0: f64,
        lat_ts: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Result<Self, ProjError> {
        if !lat_ts.is_finite() || lat_ts.abs() >= FRAC_PI_2 {
            return Err(ProjError::InvalidParameter(format!(
                "mercator: latitude of true scale {lat_ts}"
            )));
        }
        let s = lat_ts.sin();
        let k0 = lat_ts.cos() / (1.0 - ellipsoid.eccentricity_squared() * s * s).sqrt();
        Self::new(ellipsoid, lon0, k0, false_easting, false_northing)
    }

    /// Spherical "web" Mercator on a sphere of the WGS84 semi-major axis.
    pub fn web() -> Result<Self, ProjError> {
        let sphere = Ellipsoid::sphere("WGS84 sphere", Ellipsoid::wgs84().semi_major_axis())?;
        Self::new(sphere, 0.0, 1.0, 0.0, 0.0)
    }

    pub fn scale_factor(&self) -> f64 {
        self.k0
    }

    fn radius(&self) -> f64 {
        self.ellipsoid.semi_major_axis() * self.k0
    }
}

impl Projection for Mercator {
    fn name(&self) -> &str {
        "mercator"
    }

    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjError> {
        if lat.is_nan() || lat.abs() >= FRAC_PI_2 {
            return Err(ProjError::TransformFailed(format!(
                "mercator: latitude {lat} is at or beyond a pole"
            )));
        }
        let x = self.radius() * (lon - self.lon0) + self.false_easting;
        let y = self.radius() * self.ellipsoid.isometric_latitude(lat) + self.false_northing;
        Ok((x, y))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), ProjError> {
        let lon = self.lon0 + (x - self.false_easting) / self.radius();
        let lat = self.ellipsoid.latitude((y - self.false_northing) / self.radius());
        Ok((lon, lat))
    }

    fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_web_mercator_reference() {
        // (180°, 0°) → (20037508.34, 0)
        let proj = Mercator::web().unwrap();
        let (x, y) = proj.forward(PI, 0.0).unwrap();
        assert_relative_eq!(x, 20_037_508.342_789_244, epsilon = 1e-6);
        assert_relative_eq!(y, 0.0, epsilon = 1e-9);

        // The square's corner latitude maps back onto x's extent.
        let (_, lat) = proj.inverse(0.0, 20_037_508.342_789_244).unwrap();
        assert_relative_eq!(lat.to_degrees(), 85.051_128_779_806_6, epsilon = 1e-9);
    }

    #[test]
    fn test_ellipsoidal_mercator_roundtrip() {
        let proj = Mercator::new(Ellipsoid::wgs84(), 0.0, 1.0, 0.0, 0.0).unwrap();
        let cases: &[(f64, f64)] = &[
            (0.0, 0.0),
            (10.0, 45.0),
            (-73.9857, 40.7484),
            (139.6917, 35.6895),
            (20.0, -84.0),
        ];
        for &(lon_deg, lat_deg) in cases {
            let lon = lon_deg.to_radians();
            let lat = lat_deg.to_radians();
            let (x, y) = proj.forward(lon, lat).unwrap();
            let (lon2, lat2) = proj.inverse(x, y).unwrap();
            assert_relative_eq!(lon2, lon, epsilon = 1e-12);
            assert_relative_eq!(lat2, lat, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_standard_parallel_scale() {
        let lat_ts = 30.0_f64.to_radians();
        let wgs84 = Ellipsoid::wgs84();
        let proj = Mercator::with_standard_parallel(wgs84.clone(), 0.0, lat_ts, 0.0, 0.0).unwrap();
        // k0 is the parallel radius over a.
        let parallel = wgs84.transverse_radius_of_curvature(lat_ts) * lat_ts.cos();
        let k0 = parallel / wgs84.semi_major_axis();
        assert_relative_eq!(proj.scale_factor(), k0, epsilon = 1e-15);
    }

    #[test]
    fn test_pole_rejected() {
        let proj = Mercator::new(Ellipsoid::wgs84(), 0.0, 1.0, 0.0, 0.0).unwrap();
        assert!(proj.forward(0.0, FRAC_PI_2).unwrap_err().is_domain_error());
        assert!(proj.forward(0.0, f64::NAN).is_err());
        assert!(Mercator::new(Ellipsoid::wgs84(), 0.0, 0.0, 0.0, 0.0).is_err());
    }
}
