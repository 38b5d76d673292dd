#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Price-per-area aggregation over property sale records.
//!
//! The [`filter`] module selects the sales eligible for a request and turns
//! each one into a [`filter::PricedSale`] carrying its already computed
//! price-per-area. Everything downstream ([`cells`], [`municipality`])
//! consumes priced sales only, so no aggregator ever divides by an area.
//! [`region`] summarises the geographic extent of the whole dataset and is
//! independent of any price filter.
//!
//! All functions are pure over their inputs and hold no state between
//! calls, so they can run concurrently on a shared snapshot of records.

pub mod cells;
pub mod filter;
pub mod municipality;
pub mod region;
pub mod stats;

use price_map_aggregate_models::{
    BoundingBox, CellStats, DateRange, InvalidDateRangeError, MunicipalityStats, RegionPolygon,
};
use price_map_grid_models::InvalidScaleError;
use price_map_sale_models::SaleRecord;
use thiserror::Error;

use crate::filter::SaleFilter;

/// Errors that can occur during aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// Requested cell scale is outside the accepted bound.
    #[error(transparent)]
    InvalidScale(#[from] InvalidScaleError),

    /// Requested date window can never match a sale.
    #[error(transparent)]
    InvalidDateRange(#[from] InvalidDateRangeError),

    /// An aggregate that needs at least one located sale found none.
    #[error("No located sales in the dataset")]
    EmptyDataset,
}

/// A read-only view over a set of sale records, exposing the four price map
/// operations.
///
/// Each call re-reads the records and recomputes its result.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    records: &'a [SaleRecord],
}

impl<'a> Snapshot<'a> {
    /// Wraps a slice of records.
    #[must_use]
    pub const fn new(records: &'a [SaleRecord]) -> Self {
        Self { records }
    }

    /// Number of records in the snapshot, eligible or not.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the snapshot holds no records.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Average price-per-area per municipality over final-price sales.
    #[must_use]
    pub fn average_by_municipality(&self, range: DateRange) -> MunicipalityStats {
        let filter = SaleFilter::municipality(range);
        municipality::average_by_municipality(filter.apply(self.records))
    }

    /// Extent of all located records.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::EmptyDataset`] if no record is located.
    pub fn bounding_box(&self) -> Result<BoundingBox, AggregateError> {
        region::bounding_box(self.records)
    }

    /// Convex outline of all located records.
    #[must_use]
    pub fn region_polygon(&self) -> RegionPolygon {
        region::region_polygon(self.records)
    }

    /// Per-cell statistics at `cell_scale` over final-price and
    /// title-registration sales.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::InvalidScale`] if `cell_scale` is outside
    /// the accepted bound.
    pub fn grid_stats(
        &self,
        cell_scale: i64,
        range: DateRange,
    ) -> Result<Vec<CellStats>, AggregateError> {
        let filter = SaleFilter::grid(range);
        cells::grid_stats(filter.apply(self.records), cell_scale)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;
    use price_map_grid::GridConfig;
    use price_map_sale_models::{SaleRecord, UNDEFINED_MUNICIPALITY};

    /// A located final-price sale with the base cell computed from its
    /// position.
    pub fn sale(id: i64, price: i64, area: f64, lat: f64, lng: f64) -> SaleRecord {
        SaleRecord {
            id,
            property_type: "Lägenhet".to_string(),
            sale_date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
            municipality: UNDEFINED_MUNICIPALITY.to_string(),
            neighborhood: String::new(),
            address: String::new(),
            latitude: Some(lat),
            longitude: Some(lng),
            sale_type: "Slutpris".to_string(),
            price: Some(price),
            area_sqm: Some(area),
            rooms: None,
            floor: None,
            base_cell: GridConfig::default().base_cell(lat, lng),
        }
    }

    pub fn in_municipality(mut record: SaleRecord, municipality: &str) -> SaleRecord {
        record.municipality = municipality.to_string();
        record
    }

    pub fn on(mut record: SaleRecord, y: i32, m: u32, d: u32) -> SaleRecord {
        record.sale_date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        record
    }

    pub fn with_type(mut record: SaleRecord, sale_type: &str) -> SaleRecord {
        record.sale_type = sale_type.to_string();
        record
    }
}
