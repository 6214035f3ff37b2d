//! Geodetic and vertical datums together with the shifts registered on them.

use std::fmt;
use std::sync::Arc;

use crate::error::ProjError;
use crate::geodesy::ellipsoid::Ellipsoid;
use crate::geodesy::extent::GeographicExtent;
use crate::geodesy::prime_meridian::PrimeMeridian;
use crate::op::{AxisReorder, BursaWolf, ChainedOperation, CoordinateOperation, Identity, OpRef};

/// Identifier of the hub datum every shift graph is anchored on.
pub const WGS84_ID: &str = "WGS84";

/// Coordinate frame a registered shift operates in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShiftFrame {
    /// `[X, Y, Z]` metres, source ellipsoid in, target ellipsoid out.
    Geocentric,
    /// `[lon, lat, h]` radians/metres, longitudes relative to Greenwich.
    Geographic,
}

/// A shift from the datum it is registered on to `target`.
#[derive(Clone, Debug)]
pub struct DatumShift {
    target: String,
    frame: ShiftFrame,
    op: OpRef,
}

impl DatumShift {
    pub fn new(target: &str, frame: ShiftFrame, op: OpRef) -> Result<Self, ProjError> {
        if op.source_dim() != 3 || op.target_dim() != 3 {
            return Err(ProjError::InvalidParameter(format!(
                "datum shift to {target} must be 3D, got {}D -> {}D",
                op.source_dim(),
                op.target_dim()
            )));
        }
        Ok(Self {
            target: target.to_string(),
            frame,
            op,
        })
    }

    fn helmert(target: &str, op: BursaWolf) -> Self {
        Self {
            target: target.to_string(),
            frame: ShiftFrame::Geocentric,
            op: Arc::new(op),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn frame(&self) -> ShiftFrame {
        self.frame
    }

    pub fn op(&self) -> &OpRef {
        &self.op
    }

    pub fn precision(&self) -> f64 {
        self.op.precision()
    }
}

/// A horizontal datum: ellipsoid, prime meridian and the shifts it knows.
///
/// A datum without any shift is legal; it simply cannot be related to any
/// other datum.
#[derive(Clone, Debug)]
pub struct GeodeticDatum {
    id: String,
    name: String,
    prime_meridian: PrimeMeridian,
    ellipsoid: Ellipsoid,
    extent: Option<GeographicExtent>,
    shifts: Vec<DatumShift>,
}

impl GeodeticDatum {
    pub fn new(id: &str, name: &str, ellipsoid: Ellipsoid, prime_meridian: PrimeMeridian) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            prime_meridian,
            ellipsoid,
            extent: None,
            shifts: Vec::new(),
        }
    }

    pub fn with_extent(mut self, extent: GeographicExtent) -> Self {
        self.extent = Some(extent);
        self
    }

    pub fn with_shift(mut self, shift: DatumShift) -> Self {
        self.shifts.push(shift);
        self
    }

    /// Registers a Bursa-Wolf shift to WGS84 from `towgs84` values
    /// (metres, arc-seconds, ppm).
    pub fn with_towgs84(self, values: &[f64]) -> Result<Self, ProjError> {
        let op = BursaWolf::from_towgs84(values)?;
        Ok(self.with_shift(DatumShift::helmert(WGS84_ID, op)))
    }

    /// Replace every shift to WGS84 with one Bursa-Wolf shift from
    /// `towgs84` values. The result is a distinct datum with a derived id.
    pub fn with_replaced_towgs84(mut self, values: &[f64]) -> Result<Self, ProjError> {
        let op = BursaWolf::from_towgs84(values)?;
        self.id = format!("{};towgs84={values:?}", self.id);
        self.shifts.retain(|s| s.target != WGS84_ID);
        Ok(self.with_shift(DatumShift::helmert(WGS84_ID, op)))
    }

    fn area(mut self, south: f64, north: f64, west: f64, east: f64) -> Self {
        self.extent = GeographicExtent::new(south, north, west, east).ok();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prime_meridian(&self) -> &PrimeMeridian {
        &self.prime_meridian
    }

    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    pub fn extent(&self) -> Option<&GeographicExtent> {
        self.extent.as_ref()
    }

    pub fn shifts(&self) -> &[DatumShift] {
        &self.shifts
    }

    pub fn is_wgs84(&self) -> bool {
        self.id == WGS84_ID
    }

    /// Shifts registered towards `target`, best (smallest precision) first.
    pub fn shifts_to(&self, target: &str) -> Vec<&DatumShift> {
        let mut found: Vec<&DatumShift> =
            self.shifts.iter().filter(|s| s.target == target).collect();
        found.sort_by(|a, b| a.precision().total_cmp(&b.precision()));
        found
    }

    pub fn wgs84() -> Self {
        Self::new(
            WGS84_ID,
            "World Geodetic System 1984",
            Ellipsoid::wgs84(),
            PrimeMeridian::greenwich(),
        )
    }

    pub fn rgf93() -> Self {
        Self::new(
            "RGF93",
            "Reseau Geodesique Francais 1993",
            Ellipsoid::grs80(),
            PrimeMeridian::greenwich(),
        )
        .area(41.15, 51.56, -9.86, 10.38)
        .with_shift(DatumShift::helmert(
            WGS84_ID,
            BursaWolf::translation(0.0, 0.0, 0.0).with_precision(1.0),
        ))
    }

    /// Nouvelle Triangulation Française, Paris meridian.
    pub fn ntf() -> Self {
        Self::new(
            "NTF",
            "Nouvelle Triangulation Francaise",
            Ellipsoid::clarke_1880_ign(),
            PrimeMeridian::paris(),
        )
        .area(41.15, 51.56, -5.87, 10.38)
        .with_shift(DatumShift::helmert(
            WGS84_ID,
            BursaWolf::translation(-168.0, -60.0, 320.0),
        ))
    }

    pub fn ed50() -> Self {
        Self::new(
            "ED50",
            "European Datum 1950",
            Ellipsoid::international_1924(),
            PrimeMeridian::greenwich(),
        )
        .area(34.88, 84.73, -10.56, 39.65)
        .with_shift(DatumShift::helmert(
            WGS84_ID,
            BursaWolf::translation(-87.0, -98.0, -121.0),
        ))
    }

    pub fn osgb36() -> Self {
        Self::new(
            "OSGB36",
            "Ordnance Survey of Great Britain 1936",
            Ellipsoid::airy_1830(),
            PrimeMeridian::greenwich(),
        )
        .area(49.75, 61.01, -9.01, 2.01)
        .with_shift(DatumShift::helmert(
            WGS84_ID,
            BursaWolf::seven_parameter([446.448, -125.157, 542.06], [0.15, 0.247, 0.842], -20.489),
        ))
    }

    pub fn dhdn() -> Self {
        Self::new(
            "DHDN",
            "Deutsches Hauptdreiecksnetz",
            Ellipsoid::bessel_1841(),
            PrimeMeridian::greenwich(),
        )
        .area(47.27, 55.09, 5.87, 13.84)
        .with_shift(DatumShift::helmert(
            WGS84_ID,
            BursaWolf::seven_parameter([598.1, 73.7, 418.2], [0.202, 0.045, -2.455], 6.7),
        ))
    }

    pub fn nad27() -> Self {
        Self::new(
            "NAD27",
            "North American Datum 1927",
            Ellipsoid::clarke_1866(),
            PrimeMeridian::greenwich(),
        )
        .area(7.15, 83.17, -172.54, -47.74)
        .with_shift(DatumShift::helmert(
            WGS84_ID,
            BursaWolf::translation(-8.0, 160.0, 176.0),
        ))
    }

    pub fn builtins() -> Vec<GeodeticDatum> {
        vec![
            Self::wgs84(),
            Self::rgf93(),
            Self::ntf(),
            Self::ed50(),
            Self::osgb36(),
            Self::dhdn(),
            Self::nad27(),
        ]
    }
}

impl PartialEq for GeodeticDatum {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Display for GeodeticDatum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {})",
            self.id,
            self.ellipsoid.name(),
            self.prime_meridian.name()
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerticalKind {
    /// Heights above the ellipsoid of the horizontal datum.
    Ellipsoidal,
    /// Gravity-related altitudes above a geoid model.
    Geoidal,
    /// Positive-down depths.
    Depth,
}

/// A vertical reference, optionally carrying the model that turns its
/// heights into ellipsoidal heights.
#[derive(Clone, Debug)]
pub struct VerticalDatum {
    id: String,
    name: String,
    kind: VerticalKind,
    to_ellipsoidal: Option<OpRef>,
}

impl VerticalDatum {
    pub fn new(id: &str, name: &str, kind: VerticalKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            to_ellipsoidal: None,
        }
    }

    /// Attach the `[lon, lat, H] -> [lon, lat, h]` model (e.g. a geoid grid).
    pub fn with_model(mut self, op: OpRef) -> Result<Self, ProjError> {
        if op.source_dim() != 3 || op.target_dim() != 3 {
            return Err(ProjError::InvalidParameter(format!(
                "vertical datum {}: height model must be 3D",
                self.id
            )));
        }
        self.to_ellipsoidal = Some(op);
        Ok(self)
    }

    pub fn ellipsoidal() -> Self {
        Self::new("ellipsoidal", "Ellipsoidal height", VerticalKind::Ellipsoidal)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> VerticalKind {
        self.kind
    }

    pub fn model(&self) -> Option<&OpRef> {
        self.to_ellipsoidal.as_ref()
    }

    /// Operation from heights in this datum to ellipsoidal heights, on
    /// Greenwich-relative `[lon, lat, H]`.
    ///
    /// Depths are negated first; a depth datum without a model is taken to
    /// be measured from the ellipsoid.
    pub fn to_ellipsoidal_op(&self) -> Result<OpRef, ProjError> {
        match (self.kind, &self.to_ellipsoidal) {
            (VerticalKind::Ellipsoidal, _) => Ok(Identity::op(3)),
            (VerticalKind::Geoidal, Some(op)) => Ok(op.clone()),
            (VerticalKind::Geoidal, None) => Err(ProjError::NoPath {
                from: self.id.clone(),
                to: "ellipsoidal height".to_string(),
                reason: "the vertical datum has no geoid model".to_string(),
            }),
            (VerticalKind::Depth, model) => {
                let flip: OpRef = Arc::new(AxisReorder::new(&[0, 1, 2], &[1.0, 1.0, -1.0])?);
                let mut steps = vec![flip];
                steps.extend(model.iter().cloned());
                ChainedOperation::compose(steps)
            }
        }
    }
}

impl PartialEq for VerticalDatum {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
