//! Lambert Conformal Conic projection, 1SP and 2SP variants.
//!
//! IGN formulation on the isometric latitude `L`:
//!   forward: R = c·exp(-n·L), γ = n·(λ - λc), X = xs + R·sin γ, Y = ys - R·cos γ
//!   inverse: R = hypot(X - xs, Y - ys), L = -ln(|R/c|)/n, λ = λc + γ/n
//!
//! Southern cones (n < 0) carry a negative `c`, so `R` is signed throughout.

use std::f64::consts::FRAC_PI_2;

use crate::error::ProjError;
use crate::geodesy::ellipsoid::Ellipsoid;
use crate::proj::Projection;

#[derive(Clone, Debug)]
pub struct LambertConformalConic {
    ellipsoid: Ellipsoid,
    lon0: f64,
    n: f64,  // cone constant
    c: f64,  // projection constant
    xs: f64, // pole easting
    ys: f64, // pole northing
}

impl LambertConformalConic {
    /// Create a Lambert Conformal Conic with two standard parallels (2SP).
    ///
    /// Equal parallels degrade to the tangent cone at `lat1` with unit scale.
    pub fn new_2sp(
        ellipsoid: Ellipsoid,
        lon0: f64,
        lat0: f64,
        lat1: f64,
        lat2: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Result<Self, ProjError> {
        check_latitude("lat_0", lat0)?;
        check_latitude("lat_1", lat1)?;
        check_latitude("lat_2", lat2)?;

        let l1 = ellipsoid.isometric_latitude(lat1);
        let rn1 = ellipsoid.transverse_radius_of_curvature(lat1) * lat1.cos();

        let (n, c) = if (lat1 - lat2).abs() > 1e-10 {
            let l2 = ellipsoid.isometric_latitude(lat2);
            let rn2 = ellipsoid.transverse_radius_of_curvature(lat2) * lat2.cos();
            let n = (rn2 / rn1).ln() / (l1 - l2);
            (n, rn1 / n * (n * l1).exp())
        } else {
            let n = lat1.sin();
            (n, rn1 / n * (n * l1).exp())
        };
        if !n.is_finite() || n.abs() < 1e-12 {
            return Err(ProjError::InvalidParameter(format!(
                "lambert: standard parallels {lat1} and {lat2} give a degenerate cone"
            )));
        }

        let ys = if (lat0.abs() - FRAC_PI_2).abs() < 1e-12 {
            false_northing
        } else {
            false_northing + c * (-n * ellipsoid.isometric_latitude(lat0)).exp()
        };
        Self::from_constants(ellipsoid, lon0, n, c, false_easting, ys)
    }

    /// Create a Lambert Conformal Conic with one standard parallel (1SP).
    pub fn new_1sp(
        ellipsoid: Ellipsoid,
        lon0: f64,
        lat0: f64,
        k0: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Result<Self, ProjError> {
        check_latitude("lat_0", lat0)?;
        if lat0.abs() < 1e-12 || (lat0.abs() - FRAC_PI_2).abs() < 1e-12 {
            return Err(ProjError::InvalidParameter(format!(
                "lambert 1SP: latitude of origin {lat0} gives a degenerate cone"
            )));
        }
        if !k0.is_finite() || k0 <= 0.0 {
            return Err(ProjError::InvalidParameter(format!("lambert 1SP: scale factor {k0}")));
        }

        let n = lat0.sin();
        let r0 = k0 * ellipsoid.transverse_radius_of_curvature(lat0) / lat0.tan();
        let c = r0 * (n * ellipsoid.isometric_latitude(lat0)).exp();
        Self::from_constants(ellipsoid, lon0, n, c, false_easting, false_northing + r0)
    }

    /// Projection from precomputed IGN constants (`n`, `c`, `xs`, `ys`).
    pub fn from_constants(
        ellipsoid: Ellipsoid,
        lon0: f64,
        n: f64,
        c: f64,
        xs: f64,
        ys: f64,
    ) -> Result<Self, ProjError> {
        if !n.is_finite() || n == 0.0 || !c.is_finite() || c == 0.0 {
            return Err(ProjError::InvalidParameter(format!(
                "lambert: invalid constants n = {n}, c = {c}"
            )));
        }
        if n.signum() != c.signum() {
            return Err(ProjError::InvalidParameter(format!(
                "lambert: n = {n} and c = {c} must share a sign"
            )));
        }
        if !lon0.is_finite() || !xs.is_finite() || !ys.is_finite() {
            return Err(ProjError::InvalidParameter(format!(
                "lambert: non-finite origin ({lon0}, {xs}, {ys})"
            )));
        }
        Ok(Self {
            ellipsoid,
            lon0,
            n,
            c,
            xs,
            ys,
        })
    }

    pub fn n(&self) -> f64 {
        self.n
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    pub fn xs(&self) -> f64 {
        self.xs
    }

    pub fn ys(&self) -> f64 {
        self.ys
    }
}

fn check_latitude(name: &str, lat: f64) -> Result<(), ProjError> {
    if !lat.is_finite() || lat.abs() > FRAC_PI_2 {
        return Err(ProjError::InvalidParameter(format!("lambert: {name} = {lat} rad")));
    }
    Ok(())
}

impl Projection for LambertConformalConic {
    fn name(&self) -> &str {
        "lambert conformal conic"
    }

    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjError> {
        let iso = self.ellipsoid.isometric_latitude(lat);
        let r = self.c * (-self.n * iso).exp();
        if !r.is_finite() {
            return Err(ProjError::TransformFailed(format!(
                "lambert: latitude {lat} is the pole opposite the cone apex"
            )));
        }
        let gamma = self.n * (lon - self.lon0);
        Ok((self.xs + r * gamma.sin(), self.ys - r * gamma.cos()))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), ProjError> {
        let dx = x - self.xs;
        let dy = y - self.ys;
        let r = dx.hypot(dy);
        if r == 0.0 {
            let lat = FRAC_PI_2.copysign(self.n);
            return Ok((self.lon0, lat));
        }

        // For n < 0, R is negative: flip signs before taking the angle
        let s = self.n.signum();
        let gamma = (s * dx).atan2(-s * dy);
        let iso = -(r / self.c.abs()).ln() / self.n;
        let lat = self.ellipsoid.latitude(iso);
        let lon = self.lon0 + gamma / self.n;
        Ok((lon, lat))
    }

    fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }
}
