//! Geographic validity bounds with antimeridian-aware longitude containment.

use std::fmt;

use crate::error::ProjError;

#[derive(Clone, Debug, PartialEq)]
pub struct GeographicExtent {
    south: f64,
    north: f64,
    west: f64,
    east: f64,
    /// Longitude period, 360 for degrees.
    modulo: f64,
}

impl GeographicExtent {
    /// Bounds in degrees. An `east` lower than `west` crosses the antimeridian.
    pub fn new(south: f64, north: f64, west: f64, east: f64) -> Result<Self, ProjError> {
        Self::with_modulo(south, north, west, east, 360.0)
    }

    pub fn with_modulo(
        south: f64,
        north: f64,
        west: f64,
        east: f64,
        modulo: f64,
    ) -> Result<Self, ProjError> {
        let all_finite = [south, north, west, east, modulo].iter().all(|v| v.is_finite());
        if !all_finite || south > north || modulo <= 0.0 {
            return Err(ProjError::InvalidParameter(format!(
                "invalid extent: lat [{south}, {north}], lon [{west}, {east}], modulo {modulo}"
            )));
        }
        if (east - west) > modulo {
            return Err(ProjError::InvalidParameter(format!(
                "extent longitude span {} exceeds the modulo {modulo}",
                east - west
            )));
        }
        Ok(Self {
            south,
            north,
            west,
            east,
            modulo,
        })
    }

    pub fn world() -> Self {
        Self {
            south: -90.0,
            north: 90.0,
            west: -180.0,
            east: 180.0,
            modulo: 360.0,
        }
    }

    pub fn south(&self) -> f64 {
        self.south
    }

    pub fn north(&self) -> f64 {
        self.north
    }

    pub fn west(&self) -> f64 {
        self.west
    }

    pub fn east(&self) -> f64 {
        self.east
    }

    pub fn modulo(&self) -> f64 {
        self.modulo
    }

    /// Longitude width of the extent, wrapping across the antimeridian.
    pub fn span(&self) -> f64 {
        let span = self.east - self.west;
        if span < 0.0 {
            span + self.modulo
        } else {
            span
        }
    }

    /// Bring `lon` into `[west, west + modulo)` by adding one period when it
    /// lies west of the western bound.
    pub fn wrap_longitude(&self, lon: f64) -> f64 {
        if lon < self.west {
            lon + self.modulo
        } else {
            lon
        }
    }

    /// Longitudes accepted for wrapping: the canonical range
    /// `[-modulo/2, modulo/2]` together with the extent's own frame.
    fn accepts_frame(&self, lon: f64) -> bool {
        let half = self.modulo / 2.0;
        let low = self.west.min(-half);
        let high = (self.west + self.span()).max(half);
        lon >= low && lon <= high
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        if !(lat >= self.south && lat <= self.north) {
            return false;
        }
        if !self.accepts_frame(lon) {
            return false;
        }
        let lon = self.wrap_longitude(lon);
        lon >= self.west && lon <= self.west + self.span()
    }

    /// Smallest extent holding both, when neither crosses the antimeridian.
    pub fn intersection(&self, other: &GeographicExtent) -> Option<GeographicExtent> {
        if self.east < self.west || other.east < other.west {
            return None;
        }
        let south = self.south.max(other.south);
        let north = self.north.min(other.north);
        let west = self.west.max(other.west);
        let east = self.east.min(other.east);
        if south > north || west > east {
            return None;
        }
        Some(GeographicExtent {
            south,
            north,
            west,
            east,
            modulo: self.modulo,
        })
    }
}

impl fmt::Display for GeographicExtent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[lat {}..{}, lon {}..{} mod {}]",
            self.south, self.north, self.west, self.east, self.modulo
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_extent() {
        let world = GeographicExtent::world();
        assert!(world.contains(0.0, 179.999));
        assert!(world.contains(-90.0, -180.0));
        assert!(!world.contains(0.0, -200.0));
        // Once wrapped by the caller, the same meridian is accepted.
        assert!(world.contains(0.0, -200.0 + 360.0));
        assert!(!world.contains(90.5, 0.0));
        assert!(!world.contains(f64::NAN, 0.0));
    }

    #[test]
    fn test_antimeridian_extent() {
        // Fiji-like extent crossing 180°.
        let ext = GeographicExtent::new(-20.0, -12.0, 170.0, -170.0).unwrap();
        assert_eq!(ext.span(), 20.0);
        assert!(ext.contains(-15.0, 175.0));
        assert!(ext.contains(-15.0, -175.0));
        assert!(ext.contains(-15.0, 180.0));
        assert!(!ext.contains(-15.0, -160.0));
        assert!(!ext.contains(-15.0, 160.0));
    }

    #[test]
    fn test_zero_to_360_frame() {
        let ext = GeographicExtent::new(-90.0, 90.0, 0.0, 360.0).unwrap();
        assert!(ext.contains(10.0, -10.0));
        assert_eq!(ext.wrap_longitude(-10.0), 350.0);
        assert!(ext.contains(10.0, 359.0));
        assert!(!ext.contains(10.0, 361.0));
    }

    #[test]
    fn test_invalid_extent() {
        assert!(GeographicExtent::new(10.0, -10.0, 0.0, 1.0).is_err());
        assert!(GeographicExtent::new(0.0, 1.0, -200.0, 200.0).is_err());
        assert!(GeographicExtent::with_modulo(0.0, 1.0, 0.0, 1.0, 0.0).is_err());
    }

    #[test]
    fn test_intersection() {
        let france = GeographicExtent::new(41.0, 52.0, -5.5, 10.0).unwrap();
        let world = GeographicExtent::world();
        assert_eq!(france.intersection(&world), Some(france.clone()));
        let elsewhere = GeographicExtent::new(-10.0, 0.0, 20.0, 30.0).unwrap();
        assert_eq!(france.intersection(&elsewhere), None);
    }
}
