//! The coordinate operation contract and its elementary implementations.
//!
//! Every projection, datum shift and unit conversion is a
//! [`CoordinateOperation`]: a pure function over fixed-length `f64` vectors
//! with a declared inverse and a declared precision.
//!
//! Internal representations shared by the operations:
//! * geographic: `[lon, lat]` or `[lon, lat, h]`, radians and metres,
//!   longitudes relative to the datum's prime meridian until rotated;
//! * geocentric: `[X, Y, Z]` metres;
//! * projected: `[easting, northing]` (+ height) metres.

pub mod axis;
pub mod chain;
pub mod geocentric;
pub mod helmert;
pub mod identity;
pub mod meridian;
pub mod passthrough;
pub mod projection;
pub mod unit_conversion;

use std::fmt;
use std::sync::Arc;

use crate::error::ProjError;

pub use axis::{AxisReorder, ChangeDimension};
pub use chain::ChainedOperation;
pub use geocentric::{GeocentricToGeographic, GeographicToGeocentric};
pub use helmert::BursaWolf;
pub use identity::Identity;
pub use meridian::LongitudeRotation;
pub use passthrough::HorizontalOnly;
pub use projection::ProjectionOp;
pub use unit_conversion::UnitConversion;

/// Shared handle to an immutable operation.
pub type OpRef = Arc<dyn CoordinateOperation>;

/// A pure `coordinate -> coordinate` function with an inverse and a precision.
pub trait CoordinateOperation: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn source_dim(&self) -> usize;

    fn target_dim(&self) -> usize;

    /// Transform one coordinate. The input length must equal `source_dim`.
    fn transform(&self, coord: &[f64]) -> Result<Vec<f64>, ProjError>;

    /// The inverse operation, or `NonInvertible` when there is no safe one.
    fn inverse(&self) -> Result<OpRef, ProjError>;

    /// Expected numerical error bound, in metres (or the metre-equivalent).
    fn precision(&self) -> f64;

    fn is_identity(&self) -> bool {
        false
    }

    /// The elementary steps, for operations that are themselves chains.
    fn steps(&self) -> Option<&[OpRef]> {
        None
    }

    /// Transform a batch. Either every coordinate succeeds or nothing is
    /// returned.
    fn transform_all(&self, coords: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ProjError> {
        coords.iter().map(|c| self.transform(c)).collect()
    }
}

/// Fail with a dimension error unless `coord` has `expected` ordinates.
pub(crate) fn check_dim(operation: &str, expected: usize, coord: &[f64]) -> Result<(), ProjError> {
    if coord.len() != expected {
        return Err(ProjError::Dimension {
            operation: operation.to_string(),
            expected,
            actual: coord.len(),
        });
    }
    Ok(())
}

/// Transform a batch on the rayon thread pool.
#[cfg(feature = "parallel")]
pub fn par_transform(
    op: &dyn CoordinateOperation,
    coords: &[Vec<f64>],
) -> Result<Vec<Vec<f64>>, ProjError> {
    use rayon::prelude::*;

    coords.par_iter().map(|c| op.transform(c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_dim() {
        assert!(check_dim("test", 2, &[1.0, 2.0]).is_ok());
        let err = check_dim("test", 3, &[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            ProjError::Dimension {
                expected: 3,
                actual: 2,
                ..
            }
        ));
        assert!(!err.is_domain_error());
    }

    #[test]
    fn test_transform_all_is_atomic() {
        let op = LongitudeRotation::new(0.5, 2);
        let ok = op.transform_all(&[vec![0.0, 0.0], vec![1.0, 1.0]]).unwrap();
        assert_eq!(ok[1], vec![1.5, 1.0]);
        assert!(op.transform_all(&[vec![0.0, 0.0], vec![1.0]]).is_err());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_par_transform_matches_sequential() {
        let op = LongitudeRotation::new(0.25, 2);
        let coords: Vec<Vec<f64>> = (0..100).map(|i| vec![i as f64, 0.0]).collect();
        let seq = op.transform_all(&coords).unwrap();
        let par = par_transform(&op, &coords).unwrap();
        assert_eq!(seq, par);
    }
}
