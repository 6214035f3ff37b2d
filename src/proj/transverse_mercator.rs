//! Transverse Mercator projection (Krüger n-series, 4th order).
//!
//! The α/β coefficients are cached on the ellipsoid (`k_coeff`); the
//! conformal latitude comes from the isometric latitude, τ' = sinh ψ.
//! This is the projection underlying all UTM zones.

use crate::error::ProjError;
use crate::geodesy::ellipsoid::Ellipsoid;
use crate::proj::Projection;

#[derive(Clone, Debug)]
pub struct TransverseMercator {
    ellipsoid: Ellipsoid,
    lon0: f64,
    k0: f64,
    false_easting: f64,
    false_northing: f64,
    a_hat: f64, // rectifying radius
    xi0: f64,   // normalised meridional arc at lat0
}

impl TransverseMercator {
    pub fn new(
        ellipsoid: Ellipsoid,
        lon0: f64,
        lat0: f64,
        k0: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Result<Self, ProjError> {
        if !k0.is_finite() || k0 <= 0.0 {
            return Err(ProjError::InvalidParameter(format!(
                "transverse mercator: scale factor {k0}"
            )));
        }
        if !lat0.is_finite() || lat0.abs() > std::f64::consts::FRAC_PI_2 || !lon0.is_finite() {
            return Err(ProjError::InvalidParameter(format!(
                "transverse mercator: origin ({lon0}, {lat0}) rad"
            )));
        }
        let mut tm = Self {
            a_hat: ellipsoid.rectifying_radius(),
            ellipsoid,
            lon0,
            k0,
            false_easting,
            false_northing,
            xi0: 0.0,
        };
        tm.xi0 = tm.gauss_schreiber(0.0, lat0)?.0;
        Ok(tm)
    }

    /// Create a Transverse Mercator for a UTM zone (1..=60).
    pub fn utm_zone(ellipsoid: Ellipsoid, zone: u8, south: bool) -> Result<Self, ProjError> {
        if !(1..=60).contains(&zone) {
            return Err(ProjError::InvalidParameter(format!("UTM zone {zone} is not in 1..=60")));
        }
        let lon0 = (zone as f64 * 6.0 - 183.0).to_radians();
        let false_northing = if south { 10_000_000.0 } else { 0.0 };
        Self::new(ellipsoid, lon0, 0.0, 0.9996, 500_000.0, false_northing)
    }

    pub fn central_meridian(&self) -> f64 {
        self.lon0
    }

    /// Normalised (ξ, η) on the ellipsoid after the α series.
    fn gauss_schreiber(&self, dlam: f64, lat: f64) -> Result<(f64, f64), ProjError> {
        let tau_prime = self.ellipsoid.isometric_latitude(lat).sinh();
        let cos_dlam = dlam.cos();
        let radius = tau_prime.hypot(cos_dlam);
        // Equatorial points 90° from the central meridian map to infinity.
        if radius < 1e-12 || radius.is_nan() {
            return Err(ProjError::TransformFailed(format!(
                "transverse mercator: latitude {lat} is 90° from the central meridian"
            )));
        }
        let xi_prime = tau_prime.atan2(cos_dlam);
        let eta_prime = (dlam.sin() / radius).asinh();

        let alpha = &self.ellipsoid.k_coeff()[..4];
        let mut xi = xi_prime;
        let mut eta = eta_prime;
        for (j, &a) in alpha.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi += a * (k * xi_prime).sin() * (k * eta_prime).cosh();
            eta += a * (k * xi_prime).cos() * (k * eta_prime).sinh();
        }
        Ok((xi, eta))
    }
}

impl Projection for TransverseMercator {
    fn name(&self) -> &str {
        "transverse mercator"
    }

    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjError> {
        let (xi, eta) = self.gauss_schreiber(lon - self.lon0, lat)?;
        let x = self.k0 * self.a_hat * eta + self.false_easting;
        let y = self.k0 * self.a_hat * (xi - self.xi0) + self.false_northing;
        Ok((x, y))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), ProjError> {
        let eta = (x - self.false_easting) / (self.k0 * self.a_hat);
        let xi = (y - self.false_northing) / (self.k0 * self.a_hat) + self.xi0;

        // Apply β series (inverse)
        let beta = &self.ellipsoid.k_coeff()[4..];
        let mut xi_prime = xi;
        let mut eta_prime = eta;
        for (j, &b) in beta.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi_prime -= b * (k * xi).sin() * (k * eta).cosh();
            eta_prime -= b * (k * xi).cos() * (k * eta).sinh();
        }

        let sinh_eta = eta_prime.sinh();
        let cos_xi = xi_prime.cos();
        let tau_prime = xi_prime.sin() / sinh_eta.hypot(cos_xi);
        let lat = self.ellipsoid.latitude(tau_prime.asinh());
        let lon = self.lon0 + sinh_eta.atan2(cos_xi);
        if !lat.is_finite() || !lon.is_finite() {
            return Err(ProjError::TransformFailed(format!(
                "transverse mercator: ({x}, {y}) cannot be inverted"
            )));
        }
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

    fn utm(zone: u8, south: bool) -> TransverseMercator {
        TransverseMercator::utm_zone(Ellipsoid::wgs84(), zone, south).unwrap()
    }

    #[test]
    fn test_roundtrip_across_zone() {
        let tm = utm(31, false);
        let cases: &[(f64, f64)] = &[
            (3.0, 0.0),
            (0.0, 43.6),
            (6.0, 49.1),
            (2.35, 48.85),
            (4.5, 78.2),
            (-1.0, 36.0),
        ];
        for &(lon_deg, lat_deg) in cases {
            let lon = lon_deg.to_radians();
            let lat = lat_deg.to_radians();
            let (x, y) = tm.forward(lon, lat).unwrap();
            let (lon2, lat2) = tm.inverse(x, y).unwrap();
            assert_relative_eq!(lon2, lon, epsilon = 1e-11);
            assert_relative_eq!(lat2, lat, epsilon = 1e-11);
        }
    }

    #[test]
    fn test_utm_zone33n_known_point() {
        let tm = utm(33, false);
        let (e, n) = tm.forward(15.0_f64.to_radians(), 52.0_f64.to_radians()).unwrap();
        assert_relative_eq!(e, 500_000.0, epsilon = 1e-6);
        assert_relative_eq!(n, 5_761_038.213, epsilon = 1e-3);

        let (e, n) = tm.forward(12.0_f64.to_radians(), 50.0_f64.to_radians()).unwrap();
        assert_relative_eq!(e, 285_015.763, epsilon = 1e-3);
        assert_relative_eq!(n, 5_542_944.019, epsilon = 1e-3);
    }

    #[test]
    fn test_zone_symmetry() {
        let tm = utm(33, false);
        let (w, nw) = tm.forward(12.0_f64.to_radians(), 50.0_f64.to_radians()).unwrap();
        let (e, ne) = tm.forward(18.0_f64.to_radians(), 50.0_f64.to_radians()).unwrap();
        assert_relative_eq!(w + e, 1_000_000.0, epsilon = 1e-6);
        assert_relative_eq!(nw, ne, epsilon = 1e-6);
    }

    #[test]
    fn test_utm_zone_central_meridian() {
        for (zone, lon0) in [(1, -177.0_f64), (33, 15.0), (60, 177.0)] {
            let cm = utm(zone, false).central_meridian();
            assert_relative_eq!(cm, lon0.to_radians(), epsilon = 1e-12);
        }
        assert!(TransverseMercator::utm_zone(Ellipsoid::wgs84(), 0, false).is_err());
        assert!(TransverseMercator::utm_zone(Ellipsoid::wgs84(), 61, false).is_err());
    }

    #[test]
    fn test_southern_hemisphere() {
        let tm = utm(33, true);
        let lon = 15.0_f64.to_radians();
        let lat = (-30.0_f64).to_radians();
        let (x, y) = tm.forward(lon, lat).unwrap();
        assert!(y > 0.0, "Southing should be positive with FN=10M, got {y}");
        let (lon2, lat2) = tm.inverse(x, y).unwrap();
        assert_relative_eq!(lon2, lon, epsilon = 1e-11);
        assert_relative_eq!(lat2, lat, epsilon = 1e-11);
    }

    #[test]
    fn test_origin_maps_to_false_origin() {
        let tm = TransverseMercator::new(
            Ellipsoid::airy_1830(),
            (-2.0_f64).to_radians(),
            49.0_f64.to_radians(),
            0.999_601_271_7,
            400_000.0,
            -100_000.0,
        )
        .unwrap();
        let (x, y) = tm.forward((-2.0_f64).to_radians(), 49.0_f64.to_radians()).unwrap();
        assert_relative_eq!(x, 400_000.0, epsilon = 1e-6);
        assert_relative_eq!(y, -100_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_sphere_and_quadrant() {
        let wgs84 = Ellipsoid::wgs84();
        let tm = TransverseMercator::new(wgs84, 0.0, 0.0, 1.0, 0.0, 0.0).unwrap();
        let (_, y) = tm.forward(0.0, std::f64::consts::FRAC_PI_2).unwrap();
        assert_relative_eq!(y, 10_001_965.729, epsilon = 1e-3);

        let sphere = Ellipsoid::sphere("sphere", 6_371_000.0).unwrap();
        let tm = TransverseMercator::new(sphere, 0.0, 0.0, 1.0, 0.0, 0.0).unwrap();
        let (x, y) = tm.forward(0.1, 0.5).unwrap();
        let (lon, lat) = tm.inverse(x, y).unwrap();
        assert_relative_eq!(lon, 0.1, epsilon = 1e-12);
        assert_relative_eq!(lat, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_ninety_degrees_off_fails() {
        let tm = utm(31, false);
        let err = tm.forward(93.0_f64.to_radians(), 0.0).unwrap_err();
        assert!(err.is_domain_error());
    }
}
