#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Uniform lon/lat grid index.
//!
//! Maps WGS84 coordinates to integer base cells of roughly
//! [`BASE_CELL_METERS`] square, and rescales base cells to coarser square
//! cells. The degree steps are derived from a flat-earth approximation
//! around [`REFERENCE_LATITUDE`], which is accurate enough for a
//! metropolitan-sized region.
//!
//! Base cells are computed once per record at ingestion, so the constants
//! here must not change for an existing database without re-ingesting.

use std::path::Path;

use geo::{Coord, Rect};
use price_map_grid_models::{CellKey, CellScale};
use serde::{Deserialize, Serialize};

/// Latitude of the grid origin (south edge of row 0).
pub const ORIGIN_LATITUDE: f64 = 55.0;

/// Longitude of the grid origin (west edge of column 0).
pub const ORIGIN_LONGITUDE: f64 = 10.0;

/// Edge length of a base cell in meters.
pub const BASE_CELL_METERS: f64 = 100.0;

/// Meters spanned by one degree of latitude.
pub const METERS_PER_DEGREE_LATITUDE: f64 = 111_320.0;

/// Latitude at which one degree of longitude is measured (Stockholm).
pub const REFERENCE_LATITUDE: f64 = 59.33;

/// Environment variable naming an optional TOML grid config file.
pub const GRID_CONFIG_ENV: &str = "PRICE_MAP_GRID_CONFIG";

/// Errors that can occur while building a [`GridConfig`].
#[derive(Debug, thiserror::Error)]
pub enum GridConfigError {
    /// Config file could not be read.
    #[error("Failed to read grid config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for [`GridSettings`].
    #[error("Invalid grid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A setting is out of range.
    #[error("Invalid grid setting: {message}")]
    InvalidSetting {
        /// Description of what went wrong.
        message: String,
    },
}

/// User-facing grid settings, in meters and degrees.
///
/// Any key missing from a TOML file falls back to the named constant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridSettings {
    /// See [`ORIGIN_LATITUDE`].
    pub origin_latitude: f64,
    /// See [`ORIGIN_LONGITUDE`].
    pub origin_longitude: f64,
    /// See [`BASE_CELL_METERS`].
    pub cell_meters: f64,
    /// See [`REFERENCE_LATITUDE`].
    pub reference_latitude: f64,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            origin_latitude: ORIGIN_LATITUDE,
            origin_longitude: ORIGIN_LONGITUDE,
            cell_meters: BASE_CELL_METERS,
            reference_latitude: REFERENCE_LATITUDE,
        }
    }
}

/// Resolved grid: origin plus base cell step in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridConfig {
    origin_latitude: f64,
    origin_longitude: f64,
    lat_step: f64,
    lng_step: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        let settings = GridSettings::default();
        Self {
            origin_latitude: settings.origin_latitude,
            origin_longitude: settings.origin_longitude,
            lat_step: settings.cell_meters / METERS_PER_DEGREE_LATITUDE,
            lng_step: settings.cell_meters
                / (METERS_PER_DEGREE_LATITUDE * settings.reference_latitude.to_radians().cos()),
        }
    }
}

impl GridConfig {
    /// Resolves degree steps from meter-based settings.
    ///
    /// # Errors
    ///
    /// Returns [`GridConfigError::InvalidSetting`] if the cell size is not
    /// positive or the reference latitude is not strictly between the poles.
    pub fn from_settings(settings: &GridSettings) -> Result<Self, GridConfigError> {
        if !settings.cell_meters.is_finite() || settings.cell_meters <= 0.0 {
            return Err(GridConfigError::InvalidSetting {
                message: format!("cell_meters must be positive, got {}", settings.cell_meters),
            });
        }

        if !settings.reference_latitude.is_finite() || settings.reference_latitude.abs() >= 90.0 {
            return Err(GridConfigError::InvalidSetting {
                message: format!(
                    "reference_latitude must be within (-90, 90), got {}",
                    settings.reference_latitude
                ),
            });
        }

        if !settings.origin_latitude.is_finite() || !settings.origin_longitude.is_finite() {
            return Err(GridConfigError::InvalidSetting {
                message: "origin must be finite".to_string(),
            });
        }

        let lng_meters =
            METERS_PER_DEGREE_LATITUDE * settings.reference_latitude.to_radians().cos();

        Ok(Self {
            origin_latitude: settings.origin_latitude,
            origin_longitude: settings.origin_longitude,
            lat_step: settings.cell_meters / METERS_PER_DEGREE_LATITUDE,
            lng_step: settings.cell_meters / lng_meters,
        })
    }

    /// Parses [`GridSettings`] from TOML and resolves them.
    ///
    /// # Errors
    ///
    /// Returns [`GridConfigError`] if the TOML is malformed or a setting is
    /// out of range.
    pub fn from_toml_str(s: &str) -> Result<Self, GridConfigError> {
        let settings: GridSettings = toml::from_str(s)?;
        Self::from_settings(&settings)
    }

    /// Loads grid settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`GridConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, GridConfigError> {
        log::info!("Loading grid config from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Loads the file named by [`GRID_CONFIG_ENV`], or the defaults when the
    /// variable is unset.
    ///
    /// # Errors
    ///
    /// Returns [`GridConfigError`] if the named file cannot be loaded.
    pub fn from_env() -> Result<Self, GridConfigError> {
        match std::env::var(GRID_CONFIG_ENV) {
            Ok(path) if !path.is_empty() => Self::load(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    /// Base cell step in degrees latitude.
    #[must_use]
    pub const fn lat_step(&self) -> f64 {
        self.lat_step
    }

    /// Base cell step in degrees longitude.
    #[must_use]
    pub const fn lng_step(&self) -> f64 {
        self.lng_step
    }

    /// Maps a coordinate to its base cell.
    ///
    /// Uses floor division, so points on a cell's west or south edge belong
    /// to that cell and points west/south of the origin get negative keys.
    /// Returns `None` when the cell index does not fit an `i32`.
    #[must_use]
    pub fn base_cell(&self, latitude: f64, longitude: f64) -> Option<CellKey> {
        let x = cell_index((longitude - self.origin_longitude) / self.lng_step)?;
        let y = cell_index((latitude - self.origin_latitude) / self.lat_step)?;
        Some(CellKey::new(x, y))
    }

    /// Geographic extent of `key` at `scale`, as a lon/lat rectangle.
    #[must_use]
    pub fn cell_bounds(&self, key: CellKey, scale: CellScale) -> Rect<f64> {
        let span = f64::from(scale.value());
        let lng_span = self.lng_step * span;
        let lat_span = self.lat_step * span;

        let min = Coord {
            x: self.origin_longitude + f64::from(key.cell_x) * lng_span,
            y: self.origin_latitude + f64::from(key.cell_y) * lat_span,
        };
        let max = Coord {
            x: min.x + lng_span,
            y: min.y + lat_span,
        };

        Rect::new(min, max)
    }
}

/// Floors `steps` to a cell index, or `None` if it is out of `i32` range or
/// not a number.
#[allow(clippy::cast_possible_truncation)]
fn cell_index(steps: f64) -> Option<i32> {
    let index = steps.floor();
    (index >= f64::from(i32::MIN) && index <= f64::from(i32::MAX)).then(|| index as i32)
}

/// Rescales a base cell to the cell containing it at `scale`.
///
/// Floor division: every rescaled cell covers exactly `scale × scale` base
/// cells, including cells south/west of the origin.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub const fn rescale(base: CellKey, scale: CellScale) -> CellKey {
    let divisor = scale.value() as i32;
    CellKey::new(
        base.cell_x.div_euclid(divisor),
        base.cell_y.div_euclid(divisor),
    )
}

#[cfg(test)]
mod tests {
    use geo::Intersects;

    use super::*;

    fn scale(value: i64) -> CellScale {
        CellScale::new(value).unwrap()
    }

    #[test]
    fn default_steps_match_constants() {
        let grid = GridConfig::default();
        assert!((grid.lat_step() - 100.0 / 111_320.0).abs() < 1e-12);
        // Longitude degrees are shorter than latitude degrees this far north.
        assert!(grid.lng_step() > grid.lat_step() * 1.9);
        assert!(grid.lng_step() < grid.lat_step() * 2.0);
    }

    #[test]
    fn origin_is_cell_zero() {
        let grid = GridConfig::default();
        assert_eq!(
            grid.base_cell(ORIGIN_LATITUDE, ORIGIN_LONGITUDE),
            Some(CellKey::new(0, 0))
        );
    }

    #[test]
    fn points_south_west_of_origin_floor_to_negative_cells() {
        let grid = GridConfig::default();
        let key = grid.base_cell(
            ORIGIN_LATITUDE - grid.lat_step() / 2.0,
            ORIGIN_LONGITUDE - grid.lng_step() / 2.0,
        );
        assert_eq!(key, Some(CellKey::new(-1, -1)));
    }

    #[test]
    fn base_cell_is_deterministic() {
        let grid = GridConfig::default();
        let a = grid.base_cell(59.3293, 18.0686).unwrap();
        let b = grid.base_cell(59.3293, 18.0686).unwrap();
        assert_eq!(a, b);
        assert!(a.cell_x > 0 && a.cell_y > 0);
    }

    #[test]
    fn whole_globe_fits_default_grid() {
        let grid = GridConfig::default();
        for (lat, lng) in [(90.0, 180.0), (-90.0, -180.0), (-90.0, 180.0)] {
            assert!(grid.base_cell(lat, lng).is_some(), "({lat}, {lng})");
        }
    }

    #[test]
    fn out_of_range_cell_index_has_no_cell() {
        let grid = GridConfig::default();
        assert_eq!(grid.base_cell(5.0e9, 18.0), None);
        assert_eq!(grid.base_cell(59.3, -5.0e9), None);
        assert_eq!(grid.base_cell(f64::NAN, 18.0), None);

        let fine = GridConfig::from_toml_str("cell_meters = 0.000001").unwrap();
        assert_eq!(fine.base_cell(59.3, 18.0), None);
    }

    #[test]
    fn rescale_uses_floor_division() {
        let s5 = scale(5);
        assert_eq!(rescale(CellKey::new(4, 4), s5), CellKey::new(0, 0));
        assert_eq!(rescale(CellKey::new(5, 9), s5), CellKey::new(1, 1));
        assert_eq!(rescale(CellKey::new(-1, -5), s5), CellKey::new(-1, -1));
        assert_eq!(rescale(CellKey::new(-6, 0), s5), CellKey::new(-2, 0));
    }

    #[test]
    fn rescale_by_one_is_identity() {
        let key = CellKey::new(-17, 42);
        assert_eq!(rescale(key, CellScale::BASE), key);
    }

    #[test]
    fn coarser_scales_merge_finer_cells() {
        // Rescaling in two steps equals rescaling by the product, so every
        // cell at scale `a` falls entirely inside one cell at scale `a * b`.
        for x in -30..30 {
            for y in [-7, 0, 13] {
                let base = CellKey::new(x, y);
                for (a, b) in [(2, 2), (2, 5), (4, 5), (5, 4), (3, 3)] {
                    assert_eq!(
                        rescale(rescale(base, scale(a)), scale(b)),
                        rescale(base, scale(a * b)),
                        "base {base} via {a} then {b}"
                    );
                }
            }
        }
    }

    #[test]
    fn every_cell_covers_scale_squared_base_cells() {
        let s = scale(4);
        let mut counts = std::collections::BTreeMap::new();
        for x in -16..16 {
            for y in -16..16 {
                *counts.entry(rescale(CellKey::new(x, y), s)).or_insert(0) += 1;
            }
        }
        assert!(counts.values().all(|&n| n == 16), "{counts:?}");
    }

    #[test]
    fn cell_bounds_contain_their_points() {
        let grid = GridConfig::default();
        let (lat, lng) = (59.3293, 18.0686);
        let base = grid.base_cell(lat, lng).unwrap();

        for value in [1, 3, 20] {
            let s = scale(value);
            let bounds = grid.cell_bounds(rescale(base, s), s);
            assert!(
                bounds.intersects(&geo::Point::new(lng, lat)),
                "scale {value}: {bounds:?} should contain the point"
            );
        }
    }

    #[test]
    fn settings_from_toml_fill_defaults() {
        let grid = GridConfig::from_toml_str("cell_meters = 200.0").unwrap();
        let default = GridConfig::default();
        assert!((grid.lat_step() - default.lat_step() * 2.0).abs() < 1e-12);
        assert_eq!(
            grid.base_cell(ORIGIN_LATITUDE, ORIGIN_LONGITUDE),
            Some(CellKey::new(0, 0))
        );
    }

    #[test]
    fn invalid_settings_are_rejected() {
        assert!(matches!(
            GridConfig::from_toml_str("cell_meters = 0.0"),
            Err(GridConfigError::InvalidSetting { .. })
        ));
        assert!(matches!(
            GridConfig::from_toml_str("reference_latitude = 90.0"),
            Err(GridConfigError::InvalidSetting { .. })
        ));
        assert!(matches!(
            GridConfig::from_toml_str("unknown = 1"),
            Err(GridConfigError::Toml(_))
        ));
    }
}
