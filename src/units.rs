//! Measurement units and scale/offset conversion between units of the same
//! quantity.
//!
//! Every unit is defined by its relation to the base unit of its quantity
//! (metre, radian, unity): `base = value * scale + offset`.

use std::f64::consts::PI;
use std::fmt;

use crate::error::ProjError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Quantity {
    Length,
    Angle,
    Scale,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Unit {
    name: String,
    quantity: Quantity,
    scale: f64,
    offset: f64,
}

impl Unit {
    pub fn new(name: &str, quantity: Quantity, scale: f64, offset: f64) -> Result<Self, ProjError> {
        if !scale.is_finite() || scale == 0.0 || !offset.is_finite() {
            return Err(ProjError::InvalidParameter(format!(
                "unit {name}: scale must be finite and non-zero, offset finite \
                 (scale={scale}, offset={offset})"
            )));
        }
        Ok(Self {
            name: name.to_string(),
            quantity,
            scale,
            offset,
        })
    }

    fn builtin(name: &str, quantity: Quantity, scale: f64) -> Self {
        Self {
            name: name.to_string(),
            quantity,
            scale,
            offset: 0.0,
        }
    }

    pub fn metre() -> Self {
        Self::builtin("metre", Quantity::Length, 1.0)
    }

    pub fn kilometre() -> Self {
        Self::builtin("kilometre", Quantity::Length, 1000.0)
    }

    pub fn foot() -> Self {
        Self::builtin("foot", Quantity::Length, 0.3048)
    }

    pub fn us_survey_foot() -> Self {
        Self::builtin("US survey foot", Quantity::Length, 1200.0 / 3937.0)
    }

    pub fn radian() -> Self {
        Self::builtin("radian", Quantity::Angle, 1.0)
    }

    pub fn degree() -> Self {
        Self::builtin("degree", Quantity::Angle, PI / 180.0)
    }

    pub fn grad() -> Self {
        Self::builtin("grad", Quantity::Angle, PI / 200.0)
    }

    pub fn arc_minute() -> Self {
        Self::builtin("arc-minute", Quantity::Angle, PI / 10_800.0)
    }

    pub fn arc_second() -> Self {
        Self::builtin("arc-second", Quantity::Angle, PI / 648_000.0)
    }

    pub fn microradian() -> Self {
        Self::builtin("microradian", Quantity::Angle, 1e-6)
    }

    pub fn unity() -> Self {
        Self::builtin("unity", Quantity::Scale, 1.0)
    }

    pub fn ppm() -> Self {
        Self::builtin("parts per million", Quantity::Scale, 1e-6)
    }

    /// All units known without any registration.
    pub fn builtins() -> Vec<Unit> {
        vec![
            Self::metre(),
            Self::kilometre(),
            Self::foot(),
            Self::us_survey_foot(),
            Self::radian(),
            Self::degree(),
            Self::grad(),
            Self::arc_minute(),
            Self::arc_second(),
            Self::microradian(),
            Self::unity(),
            Self::ppm(),
        ]
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn to_base(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }

    pub fn from_base(&self, value: f64) -> f64 {
        (value - self.offset) / self.scale
    }

    /// Convert `value` expressed in `self` to the unit `to`.
    pub fn convert(&self, value: f64, to: &Unit) -> Result<f64, ProjError> {
        if self.quantity != to.quantity {
            return Err(ProjError::InvalidParameter(format!(
                "cannot convert {:?} unit {} to {:?} unit {}",
                self.quantity, self.name, to.quantity, to.name
            )));
        }
        Ok(to.from_base(self.to_base(value)))
    }

    pub fn is_base(&self) -> bool {
        self.scale == 1.0 && self.offset == 0.0
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Split decimal degrees into sign, degrees, minutes and seconds.
pub fn to_dms(degrees: f64) -> (i8, u32, u32, f64) {
    let sign = if degrees < 0.0 { -1 } else { 1 };
    let abs = degrees.abs();
    let d = abs.trunc();
    let m = ((abs - d) * 60.0).trunc();
    let s = ((abs - d) * 60.0 - m) * 60.0;
    (sign, d as u32, m as u32, s)
}

/// Inverse of [`to_dms`].
pub fn from_dms(sign: i8, d: u32, m: u32, s: f64) -> f64 {
    let value = d as f64 + m as f64 / 60.0 + s / 3600.0;
    if sign < 0 {
        -value
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_degree_to_grad() {
        let v = Unit::degree().convert(90.0, &Unit::grad()).unwrap();
        assert_relative_eq!(v, 100.0, epsilon = 1e-12);
    }

    #[test]
    fn test_foot_to_metre() {
        let v = Unit::foot().convert(1000.0, &Unit::metre()).unwrap();
        assert_relative_eq!(v, 304.8, epsilon = 1e-9);
        let us = Unit::us_survey_foot().convert(3937.0, &Unit::metre()).unwrap();
        assert_relative_eq!(us, 1200.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cross_quantity_rejected() {
        assert!(Unit::metre().convert(1.0, &Unit::degree()).is_err());
    }

    #[test]
    fn test_offset_unit() {
        // Hypothetical unit with an origin shift.
        let u = Unit::new("offset metre", Quantity::Length, 2.0, 10.0).unwrap();
        assert_relative_eq!(u.to_base(1.0), 12.0);
        assert_relative_eq!(u.from_base(12.0), 1.0);
        assert!(Unit::new("broken", Quantity::Length, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_dms_paris() {
        // Paris meridian: 2°20'14.025"
        let (sign, d, m, s) = to_dms(2.337_229_166_666_667);
        assert_eq!((sign, d, m), (1, 2, 20));
        assert_relative_eq!(s, 14.025, epsilon = 1e-6);
        assert_relative_eq!(from_dms(sign, d, m, s), 2.337_229_166_666_667, epsilon = 1e-12);
    }
}
