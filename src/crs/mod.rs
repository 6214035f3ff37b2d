//! Coordinate systems and coordinate reference systems.
//!
//! A [`CoordinateSystem`] says how the user writes a coordinate (axis order,
//! direction, units); [`CoordinateSystem::to_internal`] maps that onto the
//! engine's representation. A [`Crs`] ties a coordinate system to a datum
//! and, when projected, to a map projection.

pub mod params;

use std::fmt;
use std::sync::Arc;

use crate::error::ProjError;
use crate::geodesy::datum::{GeodeticDatum, VerticalDatum};
use crate::op::{AxisReorder, ChainedOperation, OpRef, UnitConversion};
use crate::proj::{LambertConformalConic, Projection};
use crate::units::{Quantity, Unit};

pub use params::{crs_from_params, ParamMap};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AxisDirection {
    East,
    West,
    North,
    South,
    Up,
    Down,
    GeocentricX,
    GeocentricY,
    GeocentricZ,
}

impl AxisDirection {
    /// Internal slot and sign: `East` and `West` both land in slot 0.
    fn slot(self) -> (usize, f64) {
        match self {
            AxisDirection::East => (0, 1.0),
            AxisDirection::West => (0, -1.0),
            AxisDirection::North => (1, 1.0),
            AxisDirection::South => (1, -1.0),
            AxisDirection::Up => (2, 1.0),
            AxisDirection::Down => (2, -1.0),
            AxisDirection::GeocentricX => (0, 1.0),
            AxisDirection::GeocentricY => (1, 1.0),
            AxisDirection::GeocentricZ => (2, 1.0),
        }
    }

    fn is_geocentric(self) -> bool {
        matches!(
            self,
            AxisDirection::GeocentricX | AxisDirection::GeocentricY | AxisDirection::GeocentricZ
        )
    }

    fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'e' => Some(AxisDirection::East),
            'w' => Some(AxisDirection::West),
            'n' => Some(AxisDirection::North),
            's' => Some(AxisDirection::South),
            'u' => Some(AxisDirection::Up),
            'd' => Some(AxisDirection::Down),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Axis {
    name: String,
    direction: AxisDirection,
    unit: Unit,
}

impl Axis {
    pub fn new(name: &str, direction: AxisDirection, unit: Unit) -> Self {
        Self {
            name: name.to_string(),
            direction,
            unit,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> AxisDirection {
        self.direction
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CsKind {
    /// Longitude, latitude and optional height.
    Ellipsoidal,
    /// Easting, northing and optional height.
    Cartesian,
    /// Earth-centred X, Y, Z.
    Geocentric,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CoordinateSystem {
    kind: CsKind,
    axes: Vec<Axis>,
}

impl CoordinateSystem {
    pub fn new(kind: CsKind, axes: Vec<Axis>) -> Result<Self, ProjError> {
        let invalid =
            |why: &str| ProjError::InvalidParameter(format!("{kind:?} coordinate system: {why}"));

        let dims = if kind == CsKind::Geocentric { 3..=3 } else { 2..=3 };
        if !dims.contains(&axes.len()) {
            return Err(invalid(&format!("{} axes", axes.len())));
        }
        let mut seen = [false; 3];
        for axis in &axes {
            if axis.direction.is_geocentric() != (kind == CsKind::Geocentric) {
                return Err(invalid(&format!("axis {} points {:?}", axis.name, axis.direction)));
            }
            let (slot, _) = axis.direction.slot();
            if std::mem::replace(&mut seen[slot], true) {
                return Err(invalid(&format!("two axes along slot {slot}")));
            }
            let expected = if kind == CsKind::Ellipsoidal && slot < 2 {
                Quantity::Angle
            } else {
                Quantity::Length
            };
            if axis.unit.quantity() != expected {
                return Err(invalid(&format!(
                    "axis {} measured in {}",
                    axis.name,
                    axis.unit.name()
                )));
            }
        }
        if !(seen[0] && seen[1]) {
            return Err(invalid("missing a horizontal axis"));
        }
        Ok(Self { kind, axes })
    }

    /// Longitude, latitude (and ellipsoidal height in metres).
    pub fn lon_lat(angle: Unit, with_height: bool) -> Result<Self, ProjError> {
        let mut axes = vec![
            Axis::new("Longitude", AxisDirection::East, angle.clone()),
            Axis::new("Latitude", AxisDirection::North, angle),
        ];
        if with_height {
            axes.push(Axis::new("Height", AxisDirection::Up, Unit::metre()));
        }
        Self::new(CsKind::Ellipsoidal, axes)
    }

    /// Latitude first, the authority order of most geographic CRSs.
    pub fn lat_lon(angle: Unit, with_height: bool) -> Result<Self, ProjError> {
        let mut axes = vec![
            Axis::new("Latitude", AxisDirection::North, angle.clone()),
            Axis::new("Longitude", AxisDirection::East, angle),
        ];
        if with_height {
            axes.push(Axis::new("Height", AxisDirection::Up, Unit::metre()));
        }
        Self::new(CsKind::Ellipsoidal, axes)
    }

    pub fn projected(unit: Unit, with_height: bool) -> Result<Self, ProjError> {
        let dim = if with_height { 3 } else { 2 };
        Self::from_axis_letters(CsKind::Cartesian, "enu", &unit, &Unit::metre(), dim)
    }

    pub fn geocentric() -> Self {
        Self {
            kind: CsKind::Geocentric,
            axes: vec![
                Axis::new("X", AxisDirection::GeocentricX, Unit::metre()),
                Axis::new("Y", AxisDirection::GeocentricY, Unit::metre()),
                Axis::new("Z", AxisDirection::GeocentricZ, Unit::metre()),
            ],
        }
    }

    /// Axes from a three-letter `enu`/`neu`/`wsu`... code, keeping the first
    /// `dim` letters. `horizontal` applies to the first two axes, `vertical`
    /// to the third.
    pub fn from_axis_letters(
        kind: CsKind,
        letters: &str,
        horizontal: &Unit,
        vertical: &Unit,
        dim: usize,
    ) -> Result<Self, ProjError> {
        if letters.chars().count() != 3 || dim > 3 {
            return Err(ProjError::InvalidParameter(format!("axis code {letters:?}")));
        }
        let mut axes = Vec::with_capacity(dim);
        for letter in letters.chars().take(dim) {
            let direction = AxisDirection::from_letter(letter)
                .ok_or_else(|| ProjError::InvalidParameter(format!("axis code {letters:?}")))?;
            let (slot, _) = direction.slot();
            let (name, unit) = match (kind, slot) {
                (CsKind::Ellipsoidal, 0) => ("Longitude", horizontal),
                (CsKind::Ellipsoidal, 1) => ("Latitude", horizontal),
                (_, 0) => ("Easting", horizontal),
                (_, 1) => ("Northing", horizontal),
                _ => ("Height", vertical),
            };
            axes.push(Axis::new(name, direction, unit.clone()));
        }
        Self::new(kind, axes)
    }

    pub fn kind(&self) -> CsKind {
        self.kind
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn dim(&self) -> usize {
        self.axes.len()
    }

    /// Operation from coordinates written in this system to the engine's
    /// representation: `[lon, lat(, h)]` radians/metres, `[E, N(, h)]`
    /// metres or `[X, Y, Z]` metres.
    pub fn to_internal(&self) -> Result<OpRef, ProjError> {
        let from: Vec<Unit> = self.axes.iter().map(|a| a.unit.clone()).collect();
        let to: Vec<Unit> = from
            .iter()
            .map(|u| match u.quantity() {
                Quantity::Angle => Unit::radian(),
                _ => Unit::metre(),
            })
            .collect();
        let units: OpRef = Arc::new(UnitConversion::between(&from, &to)?);

        let dim = self.dim();
        let mut order = vec![0; dim];
        let mut signs = vec![1.0; dim];
        for (i, axis) in self.axes.iter().enumerate() {
            let (slot, sign) = axis.direction.slot();
            if slot >= dim {
                return Err(ProjError::InvalidParameter(format!(
                    "a {dim}D coordinate system cannot carry axis {}",
                    axis.name
                )));
            }
            order[slot] = i;
            signs[slot] = sign;
        }
        let reorder: OpRef = Arc::new(AxisReorder::new(&order, &signs)?);
        ChainedOperation::compose(vec![units, reorder])
    }
}

#[derive(Clone, Debug)]
pub enum CrsKind {
    Geographic,
    Geocentric,
    Projected(Arc<dyn Projection>),
}

/// A coordinate reference system, compound when it carries a vertical datum.
#[derive(Clone, Debug)]
pub struct Crs {
    name: String,
    datum: GeodeticDatum,
    kind: CrsKind,
    cs: CoordinateSystem,
    vertical: Option<VerticalDatum>,
}

impl Crs {
    pub fn geographic(
        name: &str,
        datum: GeodeticDatum,
        cs: CoordinateSystem,
    ) -> Result<Self, ProjError> {
        if cs.kind() != CsKind::Ellipsoidal {
            return Err(ProjError::InvalidParameter(format!(
                "geographic CRS {name} needs an ellipsoidal coordinate system"
            )));
        }
        Ok(Self {
            name: name.to_string(),
            datum,
            kind: CrsKind::Geographic,
            cs,
            vertical: None,
        })
    }

    pub fn geocentric(name: &str, datum: GeodeticDatum) -> Self {
        Self {
            name: name.to_string(),
            datum,
            kind: CrsKind::Geocentric,
            cs: CoordinateSystem::geocentric(),
            vertical: None,
        }
    }

    pub fn projected(
        name: &str,
        datum: GeodeticDatum,
        projection: Arc<dyn Projection>,
        cs: CoordinateSystem,
    ) -> Result<Self, ProjError> {
        if cs.kind() != CsKind::Cartesian {
            return Err(ProjError::InvalidParameter(format!(
                "projected CRS {name} needs a cartesian coordinate system"
            )));
        }
        Ok(Self {
            name: name.to_string(),
            datum,
            kind: CrsKind::Projected(projection),
            cs,
            vertical: None,
        })
    }

    /// Make this a compound CRS whose third ordinate is a height in `vertical`.
    pub fn with_vertical(mut self, vertical: VerticalDatum) -> Result<Self, ProjError> {
        if self.cs.dim() != 3 || matches!(self.kind, CrsKind::Geocentric) {
            return Err(ProjError::InvalidParameter(format!(
                "CRS {} has no height axis for vertical datum {}",
                self.name,
                vertical.id()
            )));
        }
        self.vertical = Some(vertical);
        Ok(self)
    }

    /// WGS 84 longitude/latitude in degrees.
    pub fn wgs84() -> Self {
        Self {
            name: "WGS 84".to_string(),
            datum: GeodeticDatum::wgs84(),
            kind: CrsKind::Geographic,
            cs: CoordinateSystem {
                kind: CsKind::Ellipsoidal,
                axes: vec![
                    Axis::new("Longitude", AxisDirection::East, Unit::degree()),
                    Axis::new("Latitude", AxisDirection::North, Unit::degree()),
                ],
            },
            vertical: None,
        }
    }

    /// RGF93 / Lambert-93.
    pub fn lambert93() -> Result<Self, ProjError> {
        let datum = GeodeticDatum::rgf93();
        let lcc = LambertConformalConic::new_2sp(
            datum.ellipsoid().clone(),
            3f64.to_radians(),
            46.5f64.to_radians(),
            44f64.to_radians(),
            49f64.to_radians(),
            700_000.0,
            6_600_000.0,
        )?;
        let cs = CoordinateSystem::projected(Unit::metre(), false)?;
        Self::projected("RGF93 / Lambert-93", datum, Arc::new(lcc), cs)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn datum(&self) -> &GeodeticDatum {
        &self.datum
    }

    pub fn kind(&self) -> &CrsKind {
        &self.kind
    }

    pub fn cs(&self) -> &CoordinateSystem {
        &self.cs
    }

    pub fn vertical(&self) -> Option<&VerticalDatum> {
        self.vertical.as_ref()
    }

    pub fn dim(&self) -> usize {
        self.cs.dim()
    }

    pub fn is_compound(&self) -> bool {
        self.vertical.is_some()
    }

    pub fn projection(&self) -> Option<&Arc<dyn Projection>> {
        match &self.kind {
            CrsKind::Projected(p) => Some(p),
            _ => None,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            CrsKind::Geographic => "geographic",
            CrsKind::Geocentric => "geocentric",
            CrsKind::Projected(p) => p.name(),
        };
        write!(f, "{} ({kind}, {}D, datum {})", self.name, self.dim(), self.datum.id())?;
        if let Some(v) = &self.vertical {
            write!(f, " + {}", v.id())?;
        }
        Ok(())
    }
}
