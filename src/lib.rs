//! Geodetic coordinate transformations.
//!
//! Coordinates move between reference systems through chains of
//! [`op::CoordinateOperation`]s: unit and axis changes, map projections,
//! Bursa-Wolf datum shifts and grid corrections. [`pipeline::Pipeline`]
//! resolves such a chain between two [`crs::Crs`] values.
//!
//! ```no_run
//! use geoshift::crs::Crs;
//! use geoshift::op::CoordinateOperation;
//! use geoshift::pipeline::Pipeline;
//!
//! let pipeline = Pipeline::new(&Crs::wgs84(), &Crs::lambert93()?)?;
//! let en = pipeline.transform(&[2.35, 48.85])?;
//! # Ok::<(), geoshift::error::ProjError>(())
//! ```

pub mod crs;
pub mod error;
pub mod geodesy;
pub mod grid;
pub mod op;
pub mod pipeline;
pub mod proj;
pub mod registry;
pub mod units;

pub use crs::{Crs, ParamMap};
pub use error::{GridError, ProjError};
pub use op::{CoordinateOperation, OpRef};
pub use pipeline::Pipeline;
pub use registry::Registry;
