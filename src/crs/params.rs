//! CRS construction from a flat `key -> value` parameter map.
//!
//! Keys are lower-case ASCII; values are strings holding a name, a number,
//! or a comma-separated list of numbers. Angles are decimal degrees.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::crs::{CoordinateSystem, Crs, CsKind};
use crate::error::ProjError;
use crate::geodesy::datum::{
    DatumShift, GeodeticDatum, ShiftFrame, VerticalDatum, VerticalKind, WGS84_ID,
};
use crate::geodesy::ellipsoid::Ellipsoid;
use crate::geodesy::prime_meridian::PrimeMeridian;
use crate::grid::{GeocentricGridTranslation, GeographicGridShift, GeoidHeight, Grid};
use crate::op::OpRef;
use crate::proj::{Equirectangular, LambertConformalConic, Mercator, Projection, TransverseMercator};
use crate::registry::Registry;
use crate::units::{Quantity, Unit};

/// Keys accepted without effect.
const IGNORED: &[&str] = &["no_defs", "wktext", "type"];

const KNOWN: &[&str] = &[
    "proj", "datum", "ellps", "a", "b", "rf", "f", "e", "r", "towgs84", "pm", "units", "to_meter",
    "x_0", "y_0", "lon_0", "lat_0", "lat_1", "lat_2", "lat_ts", "k_0", "k", "zone", "south", "axis",
    "nadgrids", "geoidgrids", "vunits",
];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamMap {
    entries: HashMap<String, String>,
}

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: &str) -> &mut Self {
        self.entries.insert(key.to_ascii_lowercase(), value.trim().to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn number(&self, key: &str) -> Result<Option<f64>, ProjError> {
        self.get(key)
            .map(|v| {
                v.parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .ok_or_else(|| {
                        ProjError::InvalidParameter(format!("{key}={v} is not a number"))
                    })
            })
            .transpose()
    }

    pub fn number_or(&self, key: &str, default: f64) -> Result<f64, ProjError> {
        Ok(self.number(key)?.unwrap_or(default))
    }

    /// Decimal degrees converted to radians.
    pub fn angle(&self, key: &str) -> Result<Option<f64>, ProjError> {
        Ok(self.number(key)?.map(f64::to_radians))
    }

    pub fn numbers(&self, key: &str) -> Result<Option<Vec<f64>>, ProjError> {
        self.get(key)
            .map(|v| {
                v.split(',')
                    .map(|part| {
                        part.trim()
                            .parse::<f64>()
                            .ok()
                            .filter(|n| n.is_finite())
                            .ok_or_else(|| {
                                ProjError::InvalidParameter(format!(
                                    "{key}={v}: bad number {part:?}"
                                ))
                            })
                    })
                    .collect::<Result<Vec<f64>, ProjError>>()
            })
            .transpose()
    }

    /// A key present without a value, or with `true`/`yes`/`1`.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some("" | "true" | "yes" | "1"))
    }

    fn required(&self, key: &str) -> Result<&str, ProjError> {
        self.get(key)
            .ok_or_else(|| ProjError::InvalidParameter(format!("missing parameter {key}")))
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for ParamMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ParamMap::new();
        for (k, v) in iter {
            map.insert(k.as_ref(), v.as_ref());
        }
        map
    }
}

fn ellipsoid(registry: &Registry, params: &ParamMap) -> Result<Option<Ellipsoid>, ProjError> {
    if let Some(radius) = params.number("r")? {
        return Ellipsoid::sphere("sphere", radius).map(Some);
    }
    if let Some(a) = params.number("a")? {
        let defined = if let Some(b) = params.number("b")? {
            Ellipsoid::from_semi_minor_axis("custom", a, b)?
        } else if let Some(rf) = params.number("rf")? {
            Ellipsoid::from_inverse_flattening("custom", a, rf)?
        } else if let Some(f) = params.number("f")? {
            Ellipsoid::from_flattening("custom", a, f)?
        } else if let Some(e) = params.number("e")? {
            Ellipsoid::from_eccentricity("custom", a, e)?
        } else {
            Ellipsoid::sphere("sphere", a)?
        };
        return Ok(Some(defined));
    }
    params.get("ellps").map(|name| registry.ellipsoid(name)).transpose()
}

fn prime_meridian(
    registry: &Registry,
    params: &ParamMap,
) -> Result<Option<PrimeMeridian>, ProjError> {
    let Some(value) = params.get("pm") else {
        return Ok(None);
    };
    match value.parse::<f64>() {
        Ok(deg) if deg.is_finite() => Ok(Some(PrimeMeridian::new(&format!("{deg}"), deg))),
        _ => registry.prime_meridian(value).map(Some),
    }
}

/// Shift from a named grid: two values per node shift longitude and
/// latitude, three translate geocentric coordinates.
fn grid_shift(grid: Arc<Grid>, source: &Ellipsoid) -> Result<DatumShift, ProjError> {
    match grid.dim() {
        2 => {
            let op: OpRef = Arc::new(GeographicGridShift::new(grid)?);
            DatumShift::new(WGS84_ID, ShiftFrame::Geographic, op)
        }
        3 => {
            let op: OpRef = Arc::new(GeocentricGridTranslation::new(grid, source.clone())?);
            DatumShift::new(WGS84_ID, ShiftFrame::Geocentric, op)
        }
        dim => Err(ProjError::InvalidParameter(format!(
            "nadgrids: {} carries {dim} values per node",
            grid.name()
        ))),
    }
}

/// Grid names from a `nadgrids`/`geoidgrids` list. A leading `@` marks an
/// optional grid that is skipped when not registered; `null` is no grid.
fn grids(registry: &Registry, list: &str) -> Result<Vec<Arc<Grid>>, ProjError> {
    let mut out = Vec::new();
    for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let (optional, name) = match name.strip_prefix('@') {
            Some(rest) => (true, rest),
            None => (false, name),
        };
        if name.eq_ignore_ascii_case("null") {
            continue;
        }
        match registry.grid(name) {
            Ok(grid) => out.push(grid),
            Err(_) if optional => debug!(grid = name, "optional grid not registered"),
            Err(e) => return Err(e),
        }
    }
    Ok(out)
}

fn datum(registry: &Registry, params: &ParamMap) -> Result<GeodeticDatum, ProjError> {
    let towgs84 = params.numbers("towgs84")?;
    let grid_list = params.get("nadgrids").map(|list| grids(registry, list)).transpose()?;

    let mut datum = if let Some(id) = params.get("datum") {
        let mut named = registry.datum(id)?;
        if let Some(pm) = prime_meridian(registry, params)? {
            if pm != *named.prime_meridian() {
                return Err(ProjError::InvalidParameter(format!(
                    "pm={} conflicts with datum {}",
                    pm.name(),
                    named.id()
                )));
            }
        }
        if let Some(values) = &towgs84 {
            named = named.with_replaced_towgs84(values)?;
        }
        named
    } else {
        let ellipsoid = ellipsoid(registry, params)?.unwrap_or_else(Ellipsoid::wgs84);
        let pm = prime_meridian(registry, params)?.unwrap_or_else(PrimeMeridian::greenwich);

        let plain_wgs84 =
            ellipsoid == Ellipsoid::wgs84() && pm.is_greenwich() && grid_list.is_none();
        match &towgs84 {
            None if plain_wgs84 => GeodeticDatum::wgs84(),
            Some(values) if plain_wgs84 && values.iter().all(|v| *v == 0.0) => {
                GeodeticDatum::wgs84()
            }
            _ => {
                let mut id = format!("ellps={};pm={}", ellipsoid.name(), pm.longitude_deg());
                if let Some(values) = &towgs84 {
                    id.push_str(&format!(";towgs84={values:?}"));
                }
                if let Some(list) = params.get("nadgrids") {
                    id.push_str(&format!(";nadgrids={list}"));
                }
                let custom = GeodeticDatum::new(&id, "custom datum", ellipsoid, pm);
                match &towgs84 {
                    Some(values) => custom.with_towgs84(values)?,
                    None => custom,
                }
            }
        }
    };

    for grid in grid_list.unwrap_or_default() {
        let shift = grid_shift(grid, datum.ellipsoid())?;
        datum = datum.with_shift(shift);
    }
    Ok(datum)
}

fn length_unit(
    registry: &Registry,
    params: &ParamMap,
    name_key: &str,
    factor_key: Option<&str>,
) -> Result<Unit, ProjError> {
    if let Some(factor) = factor_key.map(|k| params.number(k)).transpose()?.flatten() {
        return Unit::new("custom length", Quantity::Length, factor, 0.0);
    }
    match params.get(name_key) {
        Some(name) => {
            let unit = registry.unit(name)?;
            if unit.quantity() != Quantity::Length {
                return Err(ProjError::InvalidParameter(format!(
                    "{name_key}={name} is not a length"
                )));
            }
            Ok(unit)
        }
        None => Ok(Unit::metre()),
    }
}

fn projection(
    params: &ParamMap,
    kind: &str,
    ellipsoid: Ellipsoid,
) -> Result<Arc<dyn Projection>, ProjError> {
    let lon0 = params.angle("lon_0")?.unwrap_or(0.0);
    let x0 = params.number_or("x_0", 0.0)?;
    let y0 = params.number_or("y_0", 0.0)?;
    let k0 = match params.number("k_0")? {
        Some(k) => Some(k),
        None => params.number("k")?,
    };

    let projection: Arc<dyn Projection> = match kind {
        "lcc" => {
            let lat1 = params
                .angle("lat_1")?
                .ok_or_else(|| ProjError::InvalidParameter("lcc needs lat_1".into()))?;
            let lat0 = params.angle("lat_0")?.unwrap_or(lat1);
            match (params.angle("lat_2")?, k0) {
                (None, Some(k0)) => {
                    if (lat0 - lat1).abs() > 1e-12 {
                        return Err(ProjError::InvalidParameter(
                            "lcc with k_0 needs lat_0 equal to lat_1".into(),
                        ));
                    }
                    Arc::new(LambertConformalConic::new_1sp(ellipsoid, lon0, lat1, k0, x0, y0)?)
                }
                (lat2, _) => Arc::new(LambertConformalConic::new_2sp(
                    ellipsoid,
                    lon0,
                    lat0,
                    lat1,
                    lat2.unwrap_or(lat1),
                    x0,
                    y0,
                )?),
            }
        }
        "tmerc" => Arc::new(TransverseMercator::new(
            ellipsoid,
            lon0,
            params.angle("lat_0")?.unwrap_or(0.0),
            k0.unwrap_or(1.0),
            x0,
            y0,
        )?),
        "utm" => {
            let zone = params.required("zone")?;
            let zone: u8 = zone
                .parse()
                .map_err(|_| ProjError::InvalidParameter(format!("zone={zone}")))?;
            Arc::new(TransverseMercator::utm_zone(ellipsoid, zone, params.flag("south"))?)
        }
        "merc" => match params.angle("lat_ts")? {
            Some(lat_ts) => {
                Arc::new(Mercator::with_standard_parallel(ellipsoid, lon0, lat_ts, x0, y0)?)
            }
            None => Arc::new(Mercator::new(ellipsoid, lon0, k0.unwrap_or(1.0), x0, y0)?),
        },
        "eqc" => Arc::new(Equirectangular::new(
            ellipsoid,
            lon0,
            params.angle("lat_0")?.unwrap_or(0.0),
            params.angle("lat_ts")?.unwrap_or(0.0),
            x0,
            y0,
        )?),
        other => {
            return Err(ProjError::InvalidParameter(format!("unsupported projection {other}")));
        }
    };
    Ok(projection)
}

/// Build a [`Crs`] from parameters, resolving names through `registry`.
pub fn crs_from_params(registry: &Registry, params: &ParamMap) -> Result<Crs, ProjError> {
    for key in params.keys() {
        if !KNOWN.contains(&key) && !IGNORED.contains(&key) {
            debug!(key, "unrecognised CRS parameter ignored");
        }
    }

    let kind = params.required("proj")?;
    let datum = datum(registry, params)?;

    let vertical_unit = length_unit(registry, params, "vunits", None)?;
    let geoid_grids = params.get("geoidgrids").map(|list| grids(registry, list)).transpose()?;
    let dim = if geoid_grids.is_some() || params.contains("vunits") { 3 } else { 2 };
    let axis = params.get("axis").unwrap_or("enu");
    let name = format!("{kind} on {}", datum.id());

    let crs = match kind {
        "longlat" | "latlong" => {
            let cs = CoordinateSystem::from_axis_letters(
                CsKind::Ellipsoidal,
                axis,
                &Unit::degree(),
                &vertical_unit,
                dim,
            )?;
            Crs::geographic(&name, datum, cs)?
        }
        "geocent" => return Ok(Crs::geocentric(&name, datum)),
        _ => {
            let unit = length_unit(registry, params, "units", Some("to_meter"))?;
            let projection = projection(params, kind, datum.ellipsoid().clone())?;
            let cs = CoordinateSystem::from_axis_letters(
                CsKind::Cartesian,
                axis,
                &unit,
                &vertical_unit,
                dim,
            )?;
            Crs::projected(&name, datum, projection, cs)?
        }
    };

    match geoid_grids {
        Some(list) => {
            let [grid] = <[Arc<Grid>; 1]>::try_from(list).map_err(|list| {
                ProjError::InvalidParameter(format!(
                    "geoidgrids must name one grid, got {}",
                    list.len()
                ))
            })?;
            let id = format!("geoid:{}", grid.name());
            let vertical = VerticalDatum::new(&id, grid.name(), VerticalKind::Geoidal)
                .with_model(Arc::new(GeoidHeight::new(grid)?))?;
            crs.with_vertical(vertical)
        }
        None => Ok(crs),
    }
}
