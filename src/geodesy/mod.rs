//! Geodetic reference data: ellipsoids, prime meridians, validity extents
//! and datums.

pub mod datum;
pub mod ellipsoid;
pub mod extent;
pub mod prime_meridian;

pub use datum::{DatumShift, GeodeticDatum, ShiftFrame, VerticalDatum, VerticalKind, WGS84_ID};
pub use ellipsoid::Ellipsoid;
pub use extent::GeographicExtent;
pub use prime_meridian::PrimeMeridian;
