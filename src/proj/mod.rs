//! Map projections between geographic `(lon, lat)` radians and planar
//! `(easting, northing)` metres.

pub mod equirectangular;
pub mod lambert_conformal;
pub mod mercator;
pub mod transverse_mercator;

use std::fmt;

use crate::error::ProjError;
use crate::geodesy::ellipsoid::Ellipsoid;

pub use equirectangular::Equirectangular;
pub use lambert_conformal::LambertConformalConic;
pub use mercator::Mercator;
pub use transverse_mercator::TransverseMercator;

/// Trait for map projections supporting forward and inverse transforms.
///
/// Longitudes are relative to the datum's prime meridian; the projection
/// applies its own central meridian.
pub trait Projection: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Forward: (lon_rad, lat_rad) -> (easting, northing)
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjError>;

    /// Inverse: (easting, northing) -> (lon_rad, lat_rad)
    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), ProjError>;

    /// Batch forward transform.
    fn forward_batch(&self, coords: &mut [(f64, f64)]) -> Result<(), ProjError> {
        for c in coords.iter_mut() {
            *c = self.forward(c.0, c.1)?;
        }
        Ok(())
    }

    /// Batch inverse transform.
    fn inverse_batch(&self, coords: &mut [(f64, f64)]) -> Result<(), ProjError> {
        for c in coords.iter_mut() {
            *c = self.inverse(c.0, c.1)?;
        }
        Ok(())
    }

    fn ellipsoid(&self) -> &Ellipsoid;
}
