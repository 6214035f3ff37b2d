//! Equidistant cylindrical projection on the ellipsoid.
//!
//! Parallels are spaced by true meridian arc length, so northings are
//! distances along the meridian from the origin latitude. Eastings are scaled
//! to be true along the latitude of true scale `lat_ts`.

use std::f64::consts::FRAC_PI_2;

use crate::error::ProjError;
use crate::geodesy::ellipsoid::Ellipsoid;
use crate::proj::Projection;

#[derive(Clone, Debug)]
pub struct Equirectangular {
    ellipsoid: Ellipsoid,
    lon0: f64,
    /// Metres of easting per radian of longitude.
    parallel_radius: f64,
    /// Meridian arc from the equator to the origin latitude.
    arc0: f64,
    false_easting: f64,
    false_northing: f64,
}

impl Equirectangular {
    pub fn new(
        ellipsoid: Ellipsoid,
        lon0: f64,
        lat0: f64,
        lat_ts: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Result<Self, ProjError> {
        if !lat_ts.is_finite() || lat_ts.abs() >= FRAC_PI_2 {
            return Err(ProjError::InvalidParameter(format!(
                "equirectangular: latitude of true scale {lat_ts}"
            )));
        }
        if !lat0.is_finite() || lat0.abs() > FRAC_PI_2 || !lon0.is_finite() {
            return Err(ProjError::InvalidParameter(format!(
                "equirectangular: origin ({lon0}, {lat0}) rad"
            )));
        }
        let parallel_radius = ellipsoid.transverse_radius_of_curvature(lat_ts) * lat_ts.cos();
        let arc0 = ellipsoid.arc_from_lat(lat0);
        Ok(Self {
            ellipsoid,
            lon0,
            parallel_radius,
            arc0,
            false_easting,
            false_northing,
        })
    }
}

impl Projection for Equirectangular {
    fn name(&self) -> &str {
        "equirectangular"
    }

    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjError> {
        if lat.abs() > FRAC_PI_2 {
            return Err(ProjError::TransformFailed(format!(
                "equirectangular: latitude {lat} rad is beyond a pole"
            )));
        }
        let x = self.false_easting + self.parallel_radius * (lon - self.lon0);
        let y = self.false_northing + self.ellipsoid.arc_from_lat(lat) - self.arc0;
        Ok((x, y))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), ProjError> {
        let arc = y - self.false_northing + self.arc0;
        if arc.abs() > self.ellipsoid.arc_from_lat(FRAC_PI_2) {
            return Err(ProjError::TransformFailed(format!(
                "equirectangular: northing {y} is beyond a pole"
            )));
        }
        let lon = self.lon0 + (x - self.false_easting) / self.parallel_radius;
        Ok((lon, self.ellipsoid.lat_from_arc(arc)))
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

    fn plate_carree(ellipsoid: Ellipsoid, lat_ts: f64) -> Equirectangular {
        Equirectangular::new(ellipsoid, 0.0, 0.0, lat_ts, 0.0, 0.0).unwrap()
    }

    #[test]
    fn test_sphere_is_linear() {
        let sphere = Ellipsoid::sphere("sphere", 6_371_000.0).unwrap();
        let proj = plate_carree(sphere, 0.0);
        let (x, y) = proj.forward(15f64.to_radians(), 52f64.to_radians()).unwrap();
        assert_relative_eq!(x, 6_371_000.0 * 15f64.to_radians(), epsilon = 1e-6);
        assert_relative_eq!(y, 6_371_000.0 * 52f64.to_radians(), epsilon = 1e-6);
    }

    #[test]
    fn test_northing_is_meridian_arc() {
        let proj = plate_carree(Ellipsoid::wgs84(), 0.0);
        // Equator to pole on WGS84.
        let (_, y) = proj.forward(0.0, FRAC_PI_2).unwrap();
        assert_relative_eq!(y, 10_001_965.729, epsilon = 1e-2);
    }

    #[test]
    fn test_roundtrip_with_origin() {
        let proj = Equirectangular::new(
            Ellipsoid::grs80(),
            3f64.to_radians(),
            46.5f64.to_radians(),
            30f64.to_radians(),
            500_000.0,
            200_000.0,
        )
        .unwrap();
        for (lon, lat) in [(-5.0_f64, 42.0_f64), (3.0, 46.5), (9.5, 51.2), (120.0, -70.0)] {
            let (x, y) = proj.forward(lon.to_radians(), lat.to_radians()).unwrap();
            let (lon2, lat2) = proj.inverse(x, y).unwrap();
            assert_relative_eq!(lon2, lon.to_radians(), epsilon = 1e-12);
            assert_relative_eq!(lat2, lat.to_radians(), epsilon = 1e-11);
        }
        let (x, y) = proj.forward(3f64.to_radians(), 46.5f64.to_radians()).unwrap();
        assert_relative_eq!(x, 500_000.0, epsilon = 1e-6);
        assert_relative_eq!(y, 200_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_true_scale_parallel() {
        let lat_ts = 30f64.to_radians();
        let ellipsoid = Ellipsoid::wgs84();
        let proj = plate_carree(ellipsoid.clone(), lat_ts);
        let (x, _) = proj.forward(1f64.to_radians(), 0.0).unwrap();
        let expected =
            ellipsoid.transverse_radius_of_curvature(lat_ts) * lat_ts.cos() * 1f64.to_radians();
        assert_relative_eq!(x, expected, epsilon = 1e-6);

        let (xe, _) = proj.forward(PI, 0.0).unwrap();
        let (xw, _) = proj.forward(-PI, 0.0).unwrap();
        assert_relative_eq!(xe, -xw, epsilon = 1e-6);
    }

    #[test]
    fn test_beyond_pole() {
        let proj = plate_carree(Ellipsoid::wgs84(), 0.0);
        assert!(proj.inverse(0.0, 10_100_000.0).unwrap_err().is_domain_error());
        assert!(Equirectangular::new(Ellipsoid::wgs84(), 0.0, 0.0, FRAC_PI_2, 0.0, 0.0).is_err());
    }
}
