#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the price map server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the aggregate types so the API contract can evolve independently.

use chrono::NaiveDate;
use price_map_aggregate_models::CellStats;
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable reason.
    pub error: String,
}

impl ApiError {
    /// Creates an error body.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Statistics for one grid cell.
///
/// Price fields are `null` for a cell without priced sales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGridCell {
    /// Cell column at the requested scale.
    pub new_grid_x: i32,
    /// Cell row at the requested scale.
    pub new_grid_y: i32,
    /// Mean price per square meter.
    pub average_price_per_sqm: Option<f64>,
    /// Number of sales in the cell.
    pub count: u64,
    /// Lowest price per square meter.
    pub min_price_per_sqm: Option<f64>,
    /// Highest price per square meter.
    pub max_price_per_sqm: Option<f64>,
}

impl From<CellStats> for ApiGridCell {
    fn from(cell: CellStats) -> Self {
        Self {
            new_grid_x: cell.key.cell_x,
            new_grid_y: cell.key.cell_y,
            average_price_per_sqm: cell.price_per_area.map(|p| p.average),
            count: cell.count,
            min_price_per_sqm: cell.price_per_area.map(|p| p.min),
            max_price_per_sqm: cell.price_per_area.map(|p| p.max),
        }
    }
}

/// Optional sale-date window, both bounds exclusive.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeParams {
    /// Only sales after this date.
    pub from_date: Option<NaiveDate>,
    /// Only sales before this date.
    pub to_date: Option<NaiveDate>,
}

/// Query parameters for the grid cell endpoints.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridQueryParams {
    /// Cell scale, validated by the server.
    pub cell_scale: i64,
    /// Only sales after this date.
    pub from_date: Option<NaiveDate>,
    /// Only sales before this date.
    pub to_date: Option<NaiveDate>,
}

impl GridQueryParams {
    /// The date window part of the request.
    #[must_use]
    pub const fn date_range(&self) -> DateRangeParams {
        DateRangeParams {
            from_date: self.from_date,
            to_date: self.to_date,
        }
    }
}

/// Body of `POST GridSqmPrices`: either a bare integer cell scale or an
/// object with a cell scale and an optional date window.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum GridSqmPricesRequest {
    /// Bare cell scale, no date window.
    Scale(i64),
    /// Cell scale with an optional date window.
    Params(GridQueryParams),
}

impl From<GridSqmPricesRequest> for GridQueryParams {
    fn from(request: GridSqmPricesRequest) -> Self {
        match request {
            GridSqmPricesRequest::Scale(cell_scale) => Self {
                cell_scale,
                from_date: None,
                to_date: None,
            },
            GridSqmPricesRequest::Params(params) => params,
        }
    }
}
