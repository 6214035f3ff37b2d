//! Reference ellipsoids with their derived shape parameters and series.

use std::f64::consts::FRAC_PI_2;
use std::fmt;

use crate::error::ProjError;

/// Convergence threshold for the latitude iterations, in radians.
const LATITUDE_EPSILON: f64 = 1e-15;
const MAX_ITERATIONS: usize = 50;

/// Reference ellipsoid parameters.
///
/// Constructed from the semi-major axis and exactly one of semi-minor axis,
/// inverse flattening or eccentricity. Everything else is derived once here.
#[derive(Clone, Debug)]
pub struct Ellipsoid {
    name: String,
    /// Semi-major axis (metres)
    a: f64,
    /// Semi-minor axis (metres)
    b: f64,
    /// Flattening
    f: f64,
    /// First eccentricity
    e: f64,
    /// First eccentricity squared
    e2: f64,
    /// Second eccentricity squared: e² / (1 - e²)
    ep2: f64,
    /// Third flattening: f / (2 - f)
    n: f64,
    /// Meridian arc series, in powers of e².
    arc_coeff: [f64; 5],
    /// Krüger series: [0..4] forward (α₁..α₄), [4..8] inverse (β₁..β₄).
    k_coeff: [f64; 8],
}

impl Ellipsoid {
    /// Ellipsoid from semi-major axis and inverse flattening.
    ///
    /// An inverse flattening of `0` or `inf` denotes a sphere.
    pub fn from_inverse_flattening(name: &str, a: f64, rf: f64) -> Result<Self, ProjError> {
        if rf.is_nan() {
            return Err(ProjError::InvalidParameter(format!(
                "ellipsoid {name}: inverse flattening is NaN"
            )));
        }
        let f = if rf == 0.0 || rf.is_infinite() { 0.0 } else { 1.0 / rf };
        Self::from_flattening(name, a, f)
    }

    pub fn from_flattening(name: &str, a: f64, f: f64) -> Result<Self, ProjError> {
        if !a.is_finite() || a <= 0.0 {
            return Err(ProjError::InvalidParameter(format!(
                "ellipsoid {name}: semi-major axis must be positive, got {a}"
            )));
        }
        if !f.is_finite() || !(0.0..1.0).contains(&f) {
            return Err(ProjError::InvalidParameter(format!(
                "ellipsoid {name}: flattening must be in [0, 1), got {f}"
            )));
        }
        Ok(Self::build(name, a, f))
    }

    pub fn from_semi_minor_axis(name: &str, a: f64, b: f64) -> Result<Self, ProjError> {
        if !a.is_finite() || a <= 0.0 {
            return Err(ProjError::InvalidParameter(format!(
                "ellipsoid {name}: semi-major axis must be positive, got {a}"
            )));
        }
        Self::from_flattening(name, a, (a - b) / a)
    }

    pub fn from_eccentricity(name: &str, a: f64, e: f64) -> Result<Self, ProjError> {
        if !e.is_finite() || !(0.0..1.0).contains(&e) {
            return Err(ProjError::InvalidParameter(format!(
                "ellipsoid {name}: eccentricity must be in [0, 1), got {e}"
            )));
        }
        Self::from_flattening(name, a, 1.0 - (1.0 - e * e).sqrt())
    }

    pub fn sphere(name: &str, radius: f64) -> Result<Self, ProjError> {
        Self::from_flattening(name, radius, 0.0)
    }

    fn build(name: &str, a: f64, f: f64) -> Self {
        let b = a * (1.0 - f);
        let e2 = 2.0 * f - f * f;
        let e = e2.sqrt();
        let ep2 = e2 / (1.0 - e2);
        let n = f / (2.0 - f);
        let (arc_coeff, k_coeff) = if f == 0.0 {
            ([1.0, 0.0, 0.0, 0.0, 0.0], [0.0; 8])
        } else {
            (Self::arc_coefficients(e2), Self::kruger_coefficients(n))
        };
        Self {
            name: name.to_string(),
            a,
            b,
            f,
            e,
            e2,
            ep2,
            n,
            arc_coeff,
            k_coeff,
        }
    }

    /// Meridian arc coefficients (IGN ALG0025), truncated after e⁸.
    fn arc_coefficients(e2: f64) -> [f64; 5] {
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let e8 = e6 * e2;
        [
            1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0 - 175.0 * e8 / 16384.0,
            -3.0 * e2 / 8.0 - 3.0 * e4 / 32.0 - 45.0 * e6 / 1024.0 - 105.0 * e8 / 4096.0,
            15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0 + 525.0 * e8 / 16384.0,
            -35.0 * e6 / 3072.0 - 175.0 * e8 / 12288.0,
            315.0 * e8 / 131072.0,
        ]
    }

    /// Krüger coefficients, 4th order in the third flattening.
    fn kruger_coefficients(n: f64) -> [f64; 8] {
        let n2 = n * n;
        let n3 = n2 * n;
        let n4 = n3 * n;
        [
            n / 2.0 - 2.0 / 3.0 * n2 + 5.0 / 16.0 * n3 + 41.0 / 180.0 * n4,
            13.0 / 48.0 * n2 - 3.0 / 5.0 * n3 + 557.0 / 1440.0 * n4,
            61.0 / 240.0 * n3 - 103.0 / 140.0 * n4,
            49561.0 / 161280.0 * n4,
            n / 2.0 - 2.0 / 3.0 * n2 + 37.0 / 96.0 * n3 - 1.0 / 360.0 * n4,
            1.0 / 48.0 * n2 + 1.0 / 15.0 * n3 - 437.0 / 1440.0 * n4,
            17.0 / 480.0 * n3 - 37.0 / 840.0 * n4,
            4397.0 / 161280.0 * n4,
        ]
    }

    pub fn wgs84() -> Self {
        Self::build("WGS84", 6_378_137.0, 1.0 / 298.257_223_563)
    }

    pub fn grs80() -> Self {
        Self::build("GRS80", 6_378_137.0, 1.0 / 298.257_222_101)
    }

    /// Clarke 1880 as defined by IGN (NTF datum).
    pub fn clarke_1880_ign() -> Self {
        let a = 6_378_249.2;
        Self::build("clrk80ign", a, (a - 6_356_515.0) / a)
    }

    pub fn international_1924() -> Self {
        Self::build("intl", 6_378_388.0, 1.0 / 297.0)
    }

    pub fn bessel_1841() -> Self {
        Self::build("bessel", 6_377_397.155, 1.0 / 299.152_812_8)
    }

    pub fn clarke_1866() -> Self {
        let a = 6_378_206.4;
        Self::build("clrk66", a, (a - 6_356_583.8) / a)
    }

    pub fn airy_1830() -> Self {
        Self::build("airy", 6_377_563.396, 1.0 / 299.324_964_6)
    }

    pub fn krassowsky_1940() -> Self {
        Self::build("krass", 6_378_245.0, 1.0 / 298.3)
    }

    pub fn builtins() -> Vec<Ellipsoid> {
        vec![
            Self::wgs84(),
            Self::grs80(),
            Self::clarke_1880_ign(),
            Self::international_1924(),
            Self::bessel_1841(),
            Self::clarke_1866(),
            Self::airy_1830(),
            Self::krassowsky_1940(),
        ]
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn semi_major_axis(&self) -> f64 {
        self.a
    }

    pub fn semi_minor_axis(&self) -> f64 {
        self.b
    }

    pub fn flattening(&self) -> f64 {
        self.f
    }

    pub fn inverse_flattening(&self) -> f64 {
        if self.f == 0.0 {
            f64::INFINITY
        } else {
            1.0 / self.f
        }
    }

    pub fn eccentricity(&self) -> f64 {
        self.e
    }

    pub fn eccentricity_squared(&self) -> f64 {
        self.e2
    }

    pub fn second_eccentricity_squared(&self) -> f64 {
        self.ep2
    }

    pub fn third_flattening(&self) -> f64 {
        self.n
    }

    pub fn arc_coeff(&self) -> &[f64; 5] {
        &self.arc_coeff
    }

    pub fn k_coeff(&self) -> &[f64; 8] {
        &self.k_coeff
    }

    pub fn is_sphere(&self) -> bool {
        self.f == 0.0
    }

    /// Rectifying radius: the meridian quadrant is `A·π/2`.
    pub fn rectifying_radius(&self) -> f64 {
        let n2 = self.n * self.n;
        self.a / (1.0 + self.n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0)
    }

    /// Isometric latitude of a geodetic latitude (radians).
    ///
    /// The poles map to ±infinity.
    pub fn isometric_latitude(&self, lat: f64) -> f64 {
        if lat >= FRAC_PI_2 {
            return f64::INFINITY;
        }
        if lat <= -FRAC_PI_2 {
            return f64::NEG_INFINITY;
        }
        let conformal = lat.tan().asinh();
        if self.is_sphere() {
            conformal
        } else {
            conformal - self.e * (self.e * lat.sin()).atanh()
        }
    }

    /// Geodetic latitude from an isometric latitude (IGN ALG0002).
    pub fn latitude(&self, iso: f64) -> f64 {
        if iso == f64::INFINITY {
            return FRAC_PI_2;
        }
        if iso == f64::NEG_INFINITY {
            return -FRAC_PI_2;
        }
        let mut lat = iso.sinh().atan();
        if self.is_sphere() {
            return lat;
        }
        for _ in 0..MAX_ITERATIONS {
            let next = (iso + self.e * (self.e * lat.sin()).atanh()).sinh().atan();
            let delta = (next - lat).abs();
            lat = next;
            if delta < LATITUDE_EPSILON {
                break;
            }
        }
        lat
    }

    /// Radius of curvature in the prime vertical, N.
    pub fn transverse_radius_of_curvature(&self, lat: f64) -> f64 {
        let s = lat.sin();
        self.a / (1.0 - self.e2 * s * s).sqrt()
    }

    /// Radius of curvature in the meridian, M.
    pub fn meridional_radius_of_curvature(&self, lat: f64) -> f64 {
        let s = lat.sin();
        let w2 = 1.0 - self.e2 * s * s;
        self.a * (1.0 - self.e2) / (w2 * w2.sqrt())
    }

    /// Meridian arc length from the equator to `lat`.
    pub fn arc_from_lat(&self, lat: f64) -> f64 {
        let c = &self.arc_coeff;
        self.a
            * (c[0] * lat
                + c[1] * (2.0 * lat).sin()
                + c[2] * (4.0 * lat).sin()
                + c[3] * (6.0 * lat).sin()
                + c[4] * (8.0 * lat).sin())
    }

    /// Latitude whose meridian arc from the equator is `arc`.
    ///
    /// Newton iteration on the same series as [`Ellipsoid::arc_from_lat`], so
    /// the pair round-trips to machine precision.
    pub fn lat_from_arc(&self, arc: f64) -> f64 {
        let c = &self.arc_coeff;
        let mut lat = arc / (self.a * c[0]);
        if self.is_sphere() {
            return lat;
        }
        for _ in 0..MAX_ITERATIONS {
            let slope = self.a
                * (c[0]
                    + 2.0 * c[1] * (2.0 * lat).cos()
                    + 4.0 * c[2] * (4.0 * lat).cos()
                    + 6.0 * c[3] * (6.0 * lat).cos()
                    + 8.0 * c[4] * (8.0 * lat).cos());
            let step = (self.arc_from_lat(lat) - arc) / slope;
            lat -= step;
            if step.abs() < LATITUDE_EPSILON {
                break;
            }
        }
        lat
    }
}

impl PartialEq for Ellipsoid {
    fn eq(&self, other: &Self) -> bool {
        self.a == other.a && (self.f - other.f).abs() < 1e-15
    }
}

impl fmt::Display for Ellipsoid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (a={}, rf={})", self.name, self.a, self.inverse_flattening())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_latitudes() -> Vec<f64> {
        (-89..=89).map(|d| (d as f64 + 0.37).to_radians()).collect()
    }

    #[test]
    fn test_wgs84_constants() {
        let wgs84 = Ellipsoid::wgs84();
        assert_relative_eq!(wgs84.semi_major_axis(), 6_378_137.0);
        assert_relative_eq!(wgs84.semi_minor_axis(), 6_356_752.314_245_179, epsilon = 0.001);
        assert_relative_eq!(wgs84.eccentricity(), 0.081_819_190_842_622, epsilon = 1e-12);
        assert_relative_eq!(wgs84.third_flattening(), 0.001_679_220_386_383_705, epsilon = 1e-12);
    }

    #[test]
    fn test_clarke_ign_eccentricity() {
        // IGN publishes e = 0.08248325676 for Clarke 1880 IGN.
        let clarke = Ellipsoid::clarke_1880_ign();
        assert_relative_eq!(clarke.eccentricity(), 0.082_483_256_76, epsilon = 1e-10);
    }

    #[test]
    fn test_isometric_roundtrip() {
        for ellipsoid in Ellipsoid::builtins() {
            for lat in sample_latitudes() {
                let iso = ellipsoid.isometric_latitude(lat);
                assert_relative_eq!(ellipsoid.latitude(iso), lat, epsilon = 1e-11);
            }
        }
    }

    #[test]
    fn test_isometric_poles() {
        let e = Ellipsoid::grs80();
        assert_eq!(e.isometric_latitude(FRAC_PI_2), f64::INFINITY);
        assert_eq!(e.isometric_latitude(-FRAC_PI_2), f64::NEG_INFINITY);
        assert_eq!(e.latitude(f64::INFINITY), FRAC_PI_2);
        assert_eq!(e.latitude(f64::NEG_INFINITY), -FRAC_PI_2);
    }

    #[test]
    fn test_isometric_ign_fixture() {
        // IGN ALG0001 test values.
        let e = Ellipsoid::from_eccentricity("ign", 1.0, 0.081_991_889_98).unwrap();
        assert_relative_eq!(e.isometric_latitude(0.872_664_626), 1.005_526_536_48, epsilon = 1e-10);
        assert_relative_eq!(e.isometric_latitude(-0.3), -0.302_616_900_60, epsilon = 1e-10);
    }

    #[test]
    fn test_arc_roundtrip() {
        for ellipsoid in Ellipsoid::builtins() {
            for lat in sample_latitudes() {
                let arc = ellipsoid.arc_from_lat(lat);
                assert_relative_eq!(ellipsoid.lat_from_arc(arc), lat, epsilon = 1e-11);
            }
            let quadrant = ellipsoid.arc_from_lat(FRAC_PI_2);
            assert_relative_eq!(ellipsoid.lat_from_arc(quadrant), FRAC_PI_2, epsilon = 1e-11);
        }
    }

    #[test]
    fn test_arc_reference_values() {
        let wgs84 = Ellipsoid::wgs84();
        assert_relative_eq!(
            wgs84.arc_from_lat(std::f64::consts::FRAC_PI_4),
            4_984_944.378,
            epsilon = 1e-3
        );
        assert_relative_eq!(wgs84.arc_from_lat(FRAC_PI_2), 10_001_965.729, epsilon = 1e-3);
        // The quadrant also equals A·π/2.
        assert_relative_eq!(
            wgs84.arc_from_lat(FRAC_PI_2),
            wgs84.rectifying_radius() * FRAC_PI_2,
            epsilon = 1e-3
        );
    }

    #[test]
    fn test_radii_of_curvature() {
        let e = Ellipsoid::wgs84();
        let n_pole = e.transverse_radius_of_curvature(FRAC_PI_2);
        let m_pole = e.meridional_radius_of_curvature(FRAC_PI_2);
        assert_relative_eq!(n_pole, m_pole, epsilon = 1e-6);
        // Equator: N = a, M = a(1 - e²) = b²/a
        assert_relative_eq!(e.transverse_radius_of_curvature(0.0), e.semi_major_axis());
        assert_relative_eq!(
            e.meridional_radius_of_curvature(0.0),
            e.semi_minor_axis().powi(2) / e.semi_major_axis(),
            epsilon = 1e-6
        );
        assert!(e.meridional_radius_of_curvature(0.0) < e.meridional_radius_of_curvature(1.0));
    }

    #[test]
    fn test_sphere_closed_forms() {
        let s = Ellipsoid::sphere("sphere", 6_371_000.0).unwrap();
        assert_eq!(s.arc_coeff(), &[1.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(s.k_coeff(), &[0.0; 8]);
        assert_eq!(s.eccentricity(), 0.0);
        let lat = 0.7;
        assert_relative_eq!(s.arc_from_lat(lat), 6_371_000.0 * lat);
        assert_relative_eq!(s.latitude(s.isometric_latitude(lat)), lat, epsilon = 1e-14);
        assert!(s.inverse_flattening().is_infinite());
    }

    #[test]
    fn test_alternative_definitions_agree() {
        let from_rf = Ellipsoid::grs80();
        let from_b =
            Ellipsoid::from_semi_minor_axis("b", 6_378_137.0, from_rf.semi_minor_axis()).unwrap();
        let from_e =
            Ellipsoid::from_eccentricity("e", 6_378_137.0, from_rf.eccentricity()).unwrap();
        assert_relative_eq!(from_b.flattening(), from_rf.flattening(), epsilon = 1e-15);
        assert_relative_eq!(from_e.flattening(), from_rf.flattening(), epsilon = 1e-14);
    }

    #[test]
    fn test_invalid_shapes() {
        assert!(Ellipsoid::from_flattening("neg", 6e6, -0.1).is_err());
        assert!(Ellipsoid::from_flattening("one", 6e6, 1.0).is_err());
        assert!(Ellipsoid::from_inverse_flattening("rf<1", 6e6, 0.5).is_err());
        assert!(Ellipsoid::from_flattening("a", -1.0, 0.003).is_err());
        assert!(Ellipsoid::from_semi_minor_axis("b>a", 6e6, 7e6).is_err());
        assert!(Ellipsoid::from_eccentricity("e=1", 6e6, 1.0).is_err());
    }
}
