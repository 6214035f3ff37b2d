//! Prime meridians, stored as a longitude offset from Greenwich in degrees.

use std::fmt;

use crate::units::{self, Unit};

const EQUALITY_EPSILON_RAD: f64 = 1e-11;

#[derive(Clone, Debug)]
pub struct PrimeMeridian {
    code: Option<String>,
    name: String,
    /// Longitude from Greenwich, decimal degrees, positive east.
    longitude: f64,
}

impl PrimeMeridian {
    pub fn new(name: &str, longitude_deg: f64) -> Self {
        Self {
            code: None,
            name: name.to_string(),
            longitude: longitude_deg,
        }
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(code.to_string());
        self
    }

    /// Build from a longitude expressed in an arbitrary angular unit.
    pub fn from_unit(
        name: &str,
        longitude: f64,
        unit: &Unit,
    ) -> Result<Self, crate::error::ProjError> {
        let deg = unit.convert(longitude, &Unit::degree())?;
        Ok(Self::new(name, deg))
    }

    pub fn greenwich() -> Self {
        Self::new("Greenwich", 0.0).with_code("EPSG:8901")
    }

    /// Paris, 2.5969213 grads (2°20'14.025").
    pub fn paris() -> Self {
        Self::new("Paris", 2.337_229_166_666_667).with_code("EPSG:8903")
    }

    pub fn lisbon() -> Self {
        Self::new("Lisbon", -9.131_906_111_111_11).with_code("EPSG:8902")
    }

    pub fn bogota() -> Self {
        Self::new("Bogota", -74.080_916_666_666_67).with_code("EPSG:8904")
    }

    pub fn madrid() -> Self {
        Self::new("Madrid", -3.687_938_888_888_889).with_code("EPSG:8905")
    }

    pub fn rome() -> Self {
        Self::new("Rome", 12.452_333_333_333_33).with_code("EPSG:8906")
    }

    pub fn bern() -> Self {
        Self::new("Bern", 7.439_583_333_333_333).with_code("EPSG:8907")
    }

    pub fn jakarta() -> Self {
        Self::new("Jakarta", 106.807_719_444_444_4).with_code("EPSG:8908")
    }

    pub fn ferro() -> Self {
        Self::new("Ferro", -17.666_666_666_666_67).with_code("EPSG:8909")
    }

    pub fn brussels() -> Self {
        Self::new("Brussels", 4.367_975).with_code("EPSG:8910")
    }

    pub fn stockholm() -> Self {
        Self::new("Stockholm", 18.058_277_777_777_78).with_code("EPSG:8911")
    }

    pub fn athens() -> Self {
        Self::new("Athens", 23.716_337_5).with_code("EPSG:8912")
    }

    pub fn oslo() -> Self {
        Self::new("Oslo", 10.722_916_666_666_67).with_code("EPSG:8913")
    }

    pub fn builtins() -> Vec<PrimeMeridian> {
        vec![
            Self::greenwich(),
            Self::paris(),
            Self::lisbon(),
            Self::bogota(),
            Self::madrid(),
            Self::rome(),
            Self::bern(),
            Self::jakarta(),
            Self::ferro(),
            Self::brussels(),
            Self::stockholm(),
            Self::athens(),
            Self::oslo(),
        ]
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn longitude_deg(&self) -> f64 {
        self.longitude
    }

    pub fn longitude_rad(&self) -> f64 {
        self.longitude.to_radians()
    }

    /// (sign, degrees, minutes, seconds)
    pub fn longitude_dms(&self) -> (i8, u32, u32, f64) {
        units::to_dms(self.longitude)
    }

    pub fn is_greenwich(&self) -> bool {
        self.longitude_rad().abs() < EQUALITY_EPSILON_RAD
    }
}

impl PartialEq for PrimeMeridian {
    fn eq(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (&self.code, &other.code) {
            if a == b {
                return true;
            }
        }
        self.name.eq_ignore_ascii_case(&other.name)
            || (self.longitude_rad() - other.longitude_rad()).abs() < EQUALITY_EPSILON_RAD
    }
}

impl fmt::Display for PrimeMeridian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (sign, d, m, s) = self.longitude_dms();
        let hemi = if sign < 0 { 'W' } else { 'E' };
        write!(f, "{} ({d}°{m}'{s:.3}\"{hemi})", self.name)
    }
}
