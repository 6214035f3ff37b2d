//! CRS-to-CRS resolution into a single chained operation.
//!
//! A pipeline moves a coordinate through a fixed sequence of stages:
//!
//! 1. source coordinate system to internal units and order, inverse
//!    projection (or geocentric to geographic), prime meridian to Greenwich;
//! 2. source heights to ellipsoidal heights through the vertical datum;
//! 3. datum change, in geographic coordinates relative to Greenwich;
//! 4. height padding or dropping between 2D and 3D endpoints;
//! 5. the inverse of stages 2 and 1 for the target CRS.
//!
//! The datum search is bounded: a direct shift between the two datums, or
//! one hop to WGS84 and one hop back. It never recurses.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::crs::{Crs, CrsKind};
use crate::error::ProjError;
use crate::geodesy::datum::{GeodeticDatum, ShiftFrame, WGS84_ID};
use crate::op::{
    ChainedOperation, ChangeDimension, CoordinateOperation, GeocentricToGeographic,
    GeographicToGeocentric, HorizontalOnly, LongitudeRotation, OpRef, ProjectionOp,
};
use crate::registry::Registry;

/// A resolved transformation between two CRSs.
#[derive(Clone, Debug)]
pub struct Pipeline {
    name: String,
    op: OpRef,
}

impl Pipeline {
    pub fn new(source: &Crs, target: &Crs) -> Result<Self, ProjError> {
        let op = resolve(source, target)?;
        debug!(
            source = source.name(),
            target = target.name(),
            precision = op.precision(),
            steps = op.steps().map_or(1, <[OpRef]>::len),
            "pipeline resolved"
        );
        Ok(Self {
            name: format!("{} -> {}", source.name(), target.name()),
            op,
        })
    }

    /// Resolve between CRSs described by parameter maps.
    pub fn from_params(
        registry: &Registry,
        source: &crate::crs::ParamMap,
        target: &crate::crs::ParamMap,
    ) -> Result<Self, ProjError> {
        Self::new(&registry.crs_from_params(source)?, &registry.crs_from_params(target)?)
    }

    /// The underlying chain.
    pub fn operation(&self) -> &OpRef {
        &self.op
    }
}

impl CoordinateOperation for Pipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn source_dim(&self) -> usize {
        self.op.source_dim()
    }

    fn target_dim(&self) -> usize {
        self.op.target_dim()
    }

    fn transform(&self, coord: &[f64]) -> Result<Vec<f64>, ProjError> {
        self.op.transform(coord)
    }

    fn inverse(&self) -> Result<OpRef, ProjError> {
        let name = match self.name.split_once(" -> ") {
            Some((from, to)) => format!("{to} -> {from}"),
            None => format!("inverse {}", self.name),
        };
        Ok(Arc::new(Self {
            name,
            op: self.op.inverse()?,
        }))
    }

    fn precision(&self) -> f64 {
        self.op.precision()
    }

    fn is_identity(&self) -> bool {
        self.op.is_identity()
    }

    fn steps(&self) -> Option<&[OpRef]> {
        self.op.steps()
    }
}

/// Stage 1: user coordinates to Greenwich-relative `[lon, lat(, h)]` radians.
fn to_geographic(crs: &Crs) -> Result<OpRef, ProjError> {
    let dim = crs.dim();
    let mut steps = vec![crs.cs().to_internal()?];
    match crs.kind() {
        CrsKind::Geocentric => {
            steps.push(Arc::new(GeocentricToGeographic::new(crs.datum().ellipsoid().clone())));
            return ChainedOperation::compose(steps);
        }
        CrsKind::Projected(projection) => {
            steps.push(Arc::new(ProjectionOp::new_inverse(Arc::clone(projection), dim)?));
        }
        CrsKind::Geographic => {}
    }
    let pm = crs.datum().prime_meridian();
    if !pm.is_greenwich() {
        steps.push(Arc::new(LongitudeRotation::new(pm.longitude_rad(), dim)));
    }
    ChainedOperation::compose(steps)
}

/// Wrap a shift in the conversions its frame needs.
fn framed(
    from: &GeodeticDatum,
    to: &GeodeticDatum,
    frame: ShiftFrame,
    op: OpRef,
) -> Result<OpRef, ProjError> {
    match frame {
        ShiftFrame::Geographic => Ok(op),
        ShiftFrame::Geocentric => {
            let down: OpRef = Arc::new(GeographicToGeocentric::new(from.ellipsoid().clone()));
            let up: OpRef = Arc::new(GeocentricToGeographic::new(to.ellipsoid().clone()));
            ChainedOperation::compose(vec![down, op, up])
        }
    }
}

/// Most precise usable operation from `from` to `to`: a shift registered on
/// `from`, or the inverse of one registered on `to`.
fn best_edge(from: &GeodeticDatum, to: &GeodeticDatum) -> Result<Option<OpRef>, ProjError> {
    let mut candidates: Vec<(f64, bool, ShiftFrame, &OpRef)> = from
        .shifts_to(to.id())
        .into_iter()
        .map(|s| (s.precision(), false, s.frame(), s.op()))
        .chain(
            to.shifts_to(from.id())
                .into_iter()
                .map(|s| (s.precision(), true, s.frame(), s.op())),
        )
        .collect();
    candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    for (precision, inverted, frame, op) in candidates {
        let op = if inverted {
            match op.inverse() {
                Ok(inverse) => inverse,
                Err(e) => {
                    warn!(
                        from = from.id(),
                        to = to.id(),
                        op = op.name(),
                        error = %e,
                        "skipping shift that cannot be inverted"
                    );
                    continue;
                }
            }
        } else {
            Arc::clone(op)
        };
        debug!(
            from = from.id(),
            to = to.id(),
            op = op.name(),
            precision,
            inverted,
            "datum shift selected"
        );
        return framed(from, to, frame, op).map(Some);
    }
    Ok(None)
}

/// Stage 3 on 3D Greenwich-relative geographic coordinates.
fn datum_change(from: &GeodeticDatum, to: &GeodeticDatum) -> Result<Option<OpRef>, ProjError> {
    if from == to {
        return Ok(None);
    }
    if let Some(direct) = best_edge(from, to)? {
        return Ok(Some(direct));
    }

    debug!(from = from.id(), to = to.id(), "no direct shift, going through {WGS84_ID}");
    let hub = GeodeticDatum::wgs84();
    let hop = |a: &GeodeticDatum, b: &GeodeticDatum| -> Result<Option<OpRef>, ProjError> {
        if a.id() == b.id() {
            return Ok(None);
        }
        best_edge(a, b)?.map(Some).ok_or_else(|| ProjError::NoPath {
            from: from.id().to_string(),
            to: to.id().to_string(),
            reason: format!("no usable shift between {} and {}", a.id(), b.id()),
        })
    };
    let steps: Vec<OpRef> = [hop(from, &hub)?, hop(&hub, to)?].into_iter().flatten().collect();
    if steps.is_empty() {
        return Ok(None);
    }
    ChainedOperation::compose(steps).map(Some)
}

fn resolve(source: &Crs, target: &Crs) -> Result<OpRef, ProjError> {
    let source_3d = source.dim() == 3;
    let target_3d = target.dim() == 3;
    let heights = source_3d && target_3d;
    let shared_vertical = match (source.vertical(), target.vertical()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };

    let mut steps = vec![to_geographic(source)?];
    if !source_3d {
        steps.push(ChangeDimension::op(2, 3));
    }

    let convert_heights = heights && !shared_vertical;
    if convert_heights {
        if let Some(vertical) = source.vertical() {
            steps.push(vertical.to_ellipsoidal_op()?);
        }
    }

    if let Some(shift) = datum_change(source.datum(), target.datum())? {
        if convert_heights {
            steps.push(shift);
        } else {
            // Heights that are gravity-related on both sides, or absent on
            // one side, are not moved by the datum change.
            steps.push(Arc::new(HorizontalOnly::new(shift)?));
        }
    }

    if convert_heights {
        if let Some(vertical) = target.vertical() {
            steps.push(vertical.to_ellipsoidal_op()?.inverse()?);
        }
    }

    if !target_3d {
        steps.push(ChangeDimension::op(3, 2));
    }
    steps.push(to_geographic(target)?.inverse()?);
    ChainedOperation::compose(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::{CoordinateSystem, ParamMap};
    use crate::geodesy::datum::{DatumShift, VerticalDatum, VerticalKind};
    use crate::geodesy::ellipsoid::Ellipsoid;
    use crate::geodesy::prime_meridian::PrimeMeridian;
    use crate::grid::{GeoidHeight, Grid};
    use crate::op::BursaWolf;
    use crate::units::Unit;
    use approx::assert_relative_eq;

    fn geographic(datum: GeodeticDatum, with_height: bool) -> Crs {
        let cs = CoordinateSystem::lon_lat(Unit::degree(), with_height).unwrap();
        let name = datum.id().to_string();
        Crs::geographic(&name, datum, cs).unwrap()
    }

    #[test]
    fn test_same_crs_is_identity() {
        let crs = Crs::wgs84();
        let p = Pipeline::new(&crs, &crs).unwrap();
        assert!(p.is_identity());
        assert_eq!(p.transform(&[2.0, 48.0]).unwrap(), vec![2.0, 48.0]);
    }

    #[test]
    fn test_no_path_without_shift() {
        let local = GeodeticDatum::new(
            "LOCAL",
            "GRS80 without shift",
            Ellipsoid::grs80(),
            PrimeMeridian::greenwich(),
        );
        let err = Pipeline::new(&geographic(local, false), &Crs::wgs84()).unwrap_err();
        assert!(matches!(err, ProjError::NoPath { ref from, .. } if from == "LOCAL"));

        let registry = Registry::with_defaults();
        let params: ParamMap = [("proj", "longlat"), ("ellps", "GRS80")].into_iter().collect();
        let ntf: ParamMap = [("proj", "longlat"), ("datum", "NTF")].into_iter().collect();
        let err = Pipeline::from_params(&registry, &params, &ntf).unwrap_err();
        assert!(matches!(err, ProjError::NoPath { .. }));
    }

    #[test]
    fn test_hub_round_trip() {
        let ntf = geographic(GeodeticDatum::ntf(), false);
        let ed50 = geographic(GeodeticDatum::ed50(), false);
        let p = Pipeline::new(&ntf, &ed50).unwrap();
        // Two Bursa-Wolf hops of 5 m each.
        assert!(p.precision() >= 10.0);

        let q = p.transform(&[2.0, 48.0]).unwrap();
        assert!((q[0] - 2.0).abs() > 1e-6);
        let back = p.inverse().unwrap().transform(&q).unwrap();
        // The dropped intermediate height moves the horizontal result by a few mm.
        assert_relative_eq!(back[0], 2.0, epsilon = 1e-6);
        assert_relative_eq!(back[1], 48.0, epsilon = 1e-6);
        assert_eq!(p.inverse().unwrap().name(), "ED50 -> NTF");
    }

    #[test]
    fn test_direct_shift_preferred_over_hub() {
        // A direct NTF -> ED50 edge that does nothing, more precise than the hub route.
        let direct: OpRef = Arc::new(BursaWolf::translation(0.0, 0.0, 0.0).with_precision(0.1));
        let ntf = GeodeticDatum::ntf()
            .with_shift(DatumShift::new("ED50", ShiftFrame::Geocentric, direct).unwrap());
        let ed50 = geographic(GeodeticDatum::ed50(), true);
        let p = Pipeline::new(&geographic(ntf, true), &ed50).unwrap();
        assert!(p.precision() < 1.0);

        // Inverse edge registered on the target is found as well.
        let reverse: OpRef = Arc::new(BursaWolf::translation(1.0, 2.0, 3.0).with_precision(0.2));
        let ed50 = GeodeticDatum::ed50()
            .with_shift(DatumShift::new("NTF", ShiftFrame::Geocentric, reverse).unwrap());
        let ntf = geographic(GeodeticDatum::ntf(), true);
        let p = Pipeline::new(&ntf, &geographic(ed50, true)).unwrap();
        assert!((0.2..0.21).contains(&p.precision()));
    }

    #[test]
    fn test_non_invertible_candidate_skipped() {
        // A large-rotation edge registered on the target cannot be inverted,
        // so the hub route is used instead.
        let rotated: OpRef = Arc::new(
            BursaWolf::seven_parameter([0.0; 3], [30.0, 0.0, 0.0], 0.0).with_precision(0.01),
        );
        let ed50 = GeodeticDatum::ed50()
            .with_shift(DatumShift::new("NTF", ShiftFrame::Geocentric, rotated).unwrap());
        let ntf = geographic(GeodeticDatum::ntf(), false);
        let p = Pipeline::new(&ntf, &geographic(ed50, false)).unwrap();
        assert!(p.precision() >= 10.0);
    }

    #[test]
    fn test_two_and_three_dimensions() {
        let ntf_2d = geographic(GeodeticDatum::ntf(), false);
        let wgs84_3d = geographic(GeodeticDatum::wgs84(), true);
        let p = Pipeline::new(&ntf_2d, &wgs84_3d).unwrap();
        assert_eq!((p.source_dim(), p.target_dim()), (2, 3));
        // 2D input carries no height, so none is invented.
        assert_eq!(p.transform(&[2.0, 48.0]).unwrap()[2], 0.0);

        let p = Pipeline::new(&wgs84_3d, &ntf_2d).unwrap();
        assert_eq!(p.transform(&[2.0, 48.0, 100.0]).unwrap().len(), 2);
    }

    #[test]
    fn test_geocentric_endpoint() {
        let geocentric = Crs::geocentric("WGS84 geocentric", GeodeticDatum::wgs84());
        let p = Pipeline::new(&geocentric, &geographic(GeodeticDatum::wgs84(), true)).unwrap();
        let out = p.transform(&[6_378_137.0, 0.0, 0.0]).unwrap();
        assert_relative_eq!(out[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(out[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(out[2], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_vertical_stage() {
        let geoid = Grid::from_vec("geoid", 0.0, 40.0, 10.0, 10.0, 2, 2, 1, vec![45.0; 4]).unwrap();
        let geoid = Arc::new(geoid);
        let ngf = VerticalDatum::new("NGF", "NGF", VerticalKind::Geoidal)
            .with_model(Arc::new(GeoidHeight::new(geoid).unwrap()))
            .unwrap();
        let compound = geographic(GeodeticDatum::wgs84(), true).with_vertical(ngf.clone()).unwrap();
        let ellipsoidal = geographic(GeodeticDatum::wgs84(), true);

        let p = Pipeline::new(&compound, &ellipsoidal).unwrap();
        assert_relative_eq!(p.transform(&[2.0, 45.0, 100.0]).unwrap()[2], 145.0, epsilon = 1e-9);

        // A shared vertical datum keeps altitudes through a datum change.
        let ntf = geographic(GeodeticDatum::ntf(), true).with_vertical(ngf).unwrap();
        let p = Pipeline::new(&compound, &ntf).unwrap();
        assert_eq!(p.transform(&[2.0, 45.0, 100.0]).unwrap()[2], 100.0);

        let no_model = VerticalDatum::new("H", "no model", VerticalKind::Geoidal);
        let bare = geographic(GeodeticDatum::wgs84(), true).with_vertical(no_model).unwrap();
        assert!(matches!(Pipeline::new(&bare, &ellipsoidal), Err(ProjError::NoPath { .. })));
    }

    #[test]
    fn test_dimension_error_is_not_domain_error() {
        let p = Pipeline::new(&Crs::wgs84(), &Crs::lambert93().unwrap()).unwrap();
        let err = p.transform(&[2.0]).unwrap_err();
        assert!(matches!(err, ProjError::Dimension { .. }));
        assert!(!err.is_domain_error());
    }
}
