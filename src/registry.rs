//! Named units, meridians, ellipsoids, datums and grids.
//!
//! Lookups are case-insensitive. Each table sits behind its own lock so a
//! grid can be registered while transformations read datums.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::debug;

use crate::crs::{params, Crs, ParamMap};
use crate::error::ProjError;
use crate::geodesy::datum::{GeodeticDatum, VerticalDatum, VerticalKind};
use crate::geodesy::ellipsoid::Ellipsoid;
use crate::geodesy::prime_meridian::PrimeMeridian;
use crate::grid::Grid;
use crate::units::Unit;

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::with_defaults);

/// Case-insensitive name table.
struct Table<T> {
    kind: &'static str,
    entries: RwLock<HashMap<String, T>>,
}

impl<T: Clone> Table<T> {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn insert(&self, name: &str, value: T) {
        let replaced = self.entries.write().insert(name.to_lowercase(), value).is_some();
        debug!(kind = self.kind, name, replaced, "registered");
    }

    fn get(&self, name: &str) -> Result<T, ProjError> {
        self.entries
            .read()
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| ProjError::NotFound {
                kind: self.kind,
                name: name.to_string(),
            })
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

pub struct Registry {
    units: Table<Unit>,
    prime_meridians: Table<PrimeMeridian>,
    ellipsoids: Table<Ellipsoid>,
    datums: Table<GeodeticDatum>,
    vertical_datums: Table<VerticalDatum>,
    grids: Table<Arc<Grid>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Registry {
    /// A registry with nothing in it.
    pub fn empty() -> Self {
        Self {
            units: Table::new("unit"),
            prime_meridians: Table::new("prime meridian"),
            ellipsoids: Table::new("ellipsoid"),
            datums: Table::new("datum"),
            vertical_datums: Table::new("vertical datum"),
            grids: Table::new("grid"),
        }
    }

    /// Built-in units, meridians, ellipsoids and datums, plus the short
    /// names used in parameter maps.
    pub fn with_defaults() -> Self {
        let registry = Self::empty();
        for unit in Unit::builtins() {
            registry.units.insert(&unit.name().to_string(), unit);
        }
        for (alias, unit) in [
            ("m", Unit::metre()),
            ("km", Unit::kilometre()),
            ("ft", Unit::foot()),
            ("us-ft", Unit::us_survey_foot()),
            ("deg", Unit::degree()),
            ("rad", Unit::radian()),
            ("grad", Unit::grad()),
        ] {
            registry.units.insert(alias, unit);
        }

        for pm in PrimeMeridian::builtins() {
            registry.prime_meridians.insert(&pm.name().to_string(), pm);
        }
        for ellipsoid in Ellipsoid::builtins() {
            registry.ellipsoids.insert(&ellipsoid.name().to_string(), ellipsoid);
        }
        for datum in GeodeticDatum::builtins() {
            registry.datums.insert(&datum.id().to_string(), datum);
        }
        registry.datums.insert("potsdam", GeodeticDatum::dhdn());

        for vertical in [
            VerticalDatum::ellipsoidal(),
            VerticalDatum::new("NGF-IGN69", "NGF IGN 1969", VerticalKind::Geoidal),
            VerticalDatum::new("EGM96", "EGM96 geoid", VerticalKind::Geoidal),
            VerticalDatum::new("depth", "Depth below the ellipsoid", VerticalKind::Depth),
        ] {
            registry.vertical_datums.insert(&vertical.id().to_string(), vertical);
        }
        registry
    }

    /// Process-wide registry, populated with defaults on first use.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    pub fn register_unit(&self, name: &str, unit: Unit) {
        self.units.insert(name, unit);
    }

    pub fn register_prime_meridian(&self, pm: PrimeMeridian) {
        self.prime_meridians.insert(&pm.name().to_string(), pm);
    }

    pub fn register_ellipsoid(&self, ellipsoid: Ellipsoid) {
        self.ellipsoids.insert(&ellipsoid.name().to_string(), ellipsoid);
    }

    /// Register or replace a datum under its id.
    pub fn register_datum(&self, datum: GeodeticDatum) {
        self.datums.insert(&datum.id().to_string(), datum);
    }

    pub fn register_vertical_datum(&self, datum: VerticalDatum) {
        self.vertical_datums.insert(&datum.id().to_string(), datum);
    }

    pub fn register_grid(&self, name: &str, grid: Arc<Grid>) {
        self.grids.insert(name, grid);
    }

    pub fn unit(&self, name: &str) -> Result<Unit, ProjError> {
        self.units.get(name)
    }

    pub fn prime_meridian(&self, name: &str) -> Result<PrimeMeridian, ProjError> {
        self.prime_meridians.get(name)
    }

    pub fn ellipsoid(&self, name: &str) -> Result<Ellipsoid, ProjError> {
        self.ellipsoids.get(name)
    }

    pub fn datum(&self, id: &str) -> Result<GeodeticDatum, ProjError> {
        self.datums.get(id)
    }

    pub fn vertical_datum(&self, id: &str) -> Result<VerticalDatum, ProjError> {
        self.vertical_datums.get(id)
    }

    pub fn grid(&self, name: &str) -> Result<Arc<Grid>, ProjError> {
        self.grids.get(name)
    }

    pub fn grid_count(&self) -> usize {
        self.grids.len()
    }

    /// Build a CRS from a flat `key=value` parameter map.
    pub fn crs_from_params(&self, params: &ParamMap) -> Result<Crs, ProjError> {
        params::crs_from_params(self, params)
    }
}
