#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types for price-per-area aggregation.
//!
//! These are the values the aggregation core hands to its callers. They are
//! kept separate from the HTTP response types in `price_map_server_models`
//! so the API contract can evolve independently.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use price_map_grid_models::CellKey;
use serde::{Deserialize, Serialize};

/// Average price-per-area keyed by municipality label.
///
/// Only labels with at least one qualifying sale are present.
pub type MunicipalityStats = BTreeMap<String, f64>;

/// A `[longitude, latitude]` pair in `GeoJSON` axis order.
pub type Position = [f64; 2];

/// Optional sale-date window. Both bounds are exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

impl DateRange {
    /// A range that admits every date.
    pub const UNBOUNDED: Self = Self {
        from: None,
        to: None,
    };

    /// Creates a range, rejecting windows that can never match.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidDateRangeError`] if both bounds are given and `from`
    /// is not before `to`.
    pub fn new(
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Self, InvalidDateRangeError> {
        if let (Some(f), Some(t)) = (from, to)
            && f >= t
        {
            return Err(InvalidDateRangeError { from: f, to: t });
        }
        Ok(Self { from, to })
    }

    /// Lower bound, exclusive.
    #[must_use]
    pub const fn from_date(&self) -> Option<NaiveDate> {
        self.from
    }

    /// Upper bound, exclusive.
    #[must_use]
    pub const fn to_date(&self) -> Option<NaiveDate> {
        self.to
    }

    /// Whether `date` lies strictly inside the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date > from) && self.to.is_none_or(|to| date < to)
    }

    /// Whether neither bound is set.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

/// Error returned for a date range whose lower bound is not before its
/// upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidDateRangeError {
    /// Requested lower bound.
    pub from: NaiveDate,
    /// Requested upper bound.
    pub to: NaiveDate,
}

impl std::fmt::Display for InvalidDateRangeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fromDate {} must be before toDate {}", self.from, self.to)
    }
}

impl std::error::Error for InvalidDateRangeError {}

/// Average, minimum, and maximum of a non-empty set of price-per-area values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSummary {
    /// Arithmetic mean of the per-sale ratios.
    pub average: f64,
    /// Smallest ratio.
    pub min: f64,
    /// Largest ratio.
    pub max: f64,
}

/// Aggregate over all sales assigned to one cell at one scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellStats {
    /// Cell address at the requested scale.
    #[serde(flatten)]
    pub key: CellKey,
    /// Number of sales in the cell.
    pub count: u64,
    /// Price-per-area statistics, `None` when `count` is zero.
    pub price_per_area: Option<PriceSummary>,
}

/// Extent of all located sales.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    /// Southern latitude boundary.
    pub min_lat: f64,
    /// Western longitude boundary.
    pub min_lng: f64,
    /// Northern latitude boundary.
    pub max_lat: f64,
    /// Eastern longitude boundary.
    pub max_lng: f64,
}

impl BoundingBox {
    /// A box around a single point.
    #[must_use]
    pub const fn from_point(lat: f64, lng: f64) -> Self {
        Self {
            min_lat: lat,
            min_lng: lng,
            max_lat: lat,
            max_lng: lng,
        }
    }

    /// Grows the box to include a point.
    #[must_use]
    pub fn extend(self, lat: f64, lng: f64) -> Self {
        Self {
            min_lat: self.min_lat.min(lat),
            min_lng: self.min_lng.min(lng),
            max_lat: self.max_lat.max(lat),
            max_lng: self.max_lng.max(lng),
        }
    }
}

/// Convex outline of all located sales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RegionPolygon {
    /// No sale has a location.
    Empty,
    /// All locations coincide (one vertex) or are collinear (the two
    /// extreme vertices).
    Degenerate {
        /// One or two distinct positions.
        vertices: Vec<Position>,
    },
    /// A closed counter-clockwise ring; the first vertex is repeated last.
    Polygon {
        /// Ring vertices.
        ring: Vec<Position>,
    },
}

impl RegionPolygon {
    /// Whether the outline has no vertices at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn date_range_bounds_are_exclusive() {
        let range = DateRange::new(Some(date(2025, 1, 1)), Some(date(2025, 2, 1))).unwrap();
        assert!(!range.contains(date(2025, 1, 1)));
        assert!(range.contains(date(2025, 1, 2)));
        assert!(range.contains(date(2025, 1, 31)));
        assert!(!range.contains(date(2025, 2, 1)));
    }

    #[test]
    fn open_ended_ranges() {
        let since = DateRange::new(Some(date(2025, 1, 1)), None).unwrap();
        assert!(since.contains(date(2030, 1, 1)));
        assert!(!since.contains(date(2024, 12, 31)));

        assert!(DateRange::UNBOUNDED.contains(date(1900, 1, 1)));
        assert!(DateRange::default().is_unbounded());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = DateRange::new(Some(date(2025, 2, 1)), Some(date(2025, 1, 1))).unwrap_err();
        assert_eq!(err.from, date(2025, 2, 1));
        assert!(DateRange::new(Some(date(2025, 2, 1)), Some(date(2025, 2, 1))).is_err());
    }

    #[test]
    fn bounding_box_extends() {
        let bbox = BoundingBox::from_point(59.3, 18.0)
            .extend(59.4, 17.9)
            .extend(59.2, 18.1);
        assert_eq!(
            bbox,
            BoundingBox {
                min_lat: 59.2,
                min_lng: 17.9,
                max_lat: 59.4,
                max_lng: 18.1,
            }
        );
    }

    #[test]
    fn cell_stats_serialize_flat() {
        let stats = CellStats {
            key: CellKey::new(3, -4),
            count: 2,
            price_per_area: Some(PriceSummary {
                average: 30_000.0,
                min: 20_000.0,
                max: 40_000.0,
            }),
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["cellX"], 3);
        assert_eq!(json["cellY"], -4);
        assert_eq!(json["pricePerArea"]["average"], 30_000.0);
    }
}
