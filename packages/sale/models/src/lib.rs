#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Property sale record types and sale-type labels.
//!
//! A [`SaleRecord`] is one observed real-estate transaction as produced by
//! ingestion. Records are immutable once stored; every aggregation in the
//! price map reads them and never writes back.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use price_map_grid_models::CellKey;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Municipality label used when the source did not provide one.
pub const UNDEFINED_MUNICIPALITY: &str = "Undefined";

/// Known sale-type labels as they appear in the source listings.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum SaleType {
    /// Final agreed price ("Slutpris").
    #[serde(rename = "Slutpris")]
    #[strum(serialize = "Slutpris")]
    FinalPrice,
    /// Title registration event ("Lagfart").
    #[serde(rename = "Lagfart")]
    #[strum(serialize = "Lagfart")]
    TitleRegistration,
}

/// The set of sale-type labels an aggregation accepts.
///
/// Labels are compared verbatim; records with any other label are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedSaleTypes(BTreeSet<String>);

impl AcceptedSaleTypes {
    /// Accepts only final prices. Used for municipality averages.
    #[must_use]
    pub fn final_price_only() -> Self {
        Self::from_types(&[SaleType::FinalPrice])
    }

    /// Accepts final prices and title registrations. Used for grid statistics.
    #[must_use]
    pub fn final_price_or_title_registration() -> Self {
        Self::from_types(&[SaleType::FinalPrice, SaleType::TitleRegistration])
    }

    /// Builds a set from known sale types.
    #[must_use]
    pub fn from_types(types: &[SaleType]) -> Self {
        Self(types.iter().map(ToString::to_string).collect())
    }

    /// Builds a set from arbitrary labels.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(labels.into_iter().map(Into::into).collect())
    }

    /// Whether `label` is in the set.
    #[must_use]
    pub fn accepts(&self, label: &str) -> bool {
        self.0.contains(label)
    }

    /// Iterates the accepted labels in sorted order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of accepted labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no label is accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

/// One observed real-estate transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRecord {
    /// Listing identifier from the source.
    pub id: i64,
    /// Property type label (e.g. "Lägenhet").
    pub property_type: String,
    /// Date the sale was registered.
    pub sale_date: NaiveDate,
    /// Municipality label, [`UNDEFINED_MUNICIPALITY`] when unknown.
    pub municipality: String,
    /// Descriptive neighborhood name.
    pub neighborhood: String,
    /// Street address.
    pub address: String,
    /// Latitude, absent for unlocated records.
    pub latitude: Option<f64>,
    /// Longitude, absent for unlocated records.
    pub longitude: Option<f64>,
    /// Sale-type label (see [`SaleType`]).
    pub sale_type: String,
    /// Sale price in currency units.
    pub price: Option<i64>,
    /// Floor area in square meters.
    pub area_sqm: Option<f64>,
    /// Room count.
    pub rooms: Option<f64>,
    /// Floor number.
    pub floor: Option<f64>,
    /// Base grid cell, computed once from the location at ingestion.
    pub base_cell: Option<CellKey>,
}

impl SaleRecord {
    /// Returns the record's position when it is located.
    ///
    /// A record is located when both coordinates are present, within
    /// `[-90, 90]` and `[-180, 180]`, and not the `(0, 0)` placeholder some
    /// sources emit for missing data.
    #[must_use]
    pub fn location(&self) -> Option<Location> {
        let (Some(latitude), Some(longitude)) = (self.latitude, self.longitude) else {
            return None;
        };

        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }

        #[allow(clippy::float_cmp)]
        if latitude == 0.0 && longitude == 0.0 {
            return None;
        }

        Some(Location {
            latitude,
            longitude,
        })
    }

    /// Price divided by floor area.
    ///
    /// `None` unless both price and area are present and the area is
    /// strictly positive, so the ratio is always finite.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn price_per_area(&self) -> Option<f64> {
        let price = self.price?;
        let area = self.area_sqm?;

        if area <= 0.0 || !area.is_finite() {
            return None;
        }

        let ratio = price as f64 / area;
        ratio.is_finite().then_some(ratio)
    }

    /// Municipality label with blank values folded into
    /// [`UNDEFINED_MUNICIPALITY`].
    #[must_use]
    pub fn municipality_label(&self) -> &str {
        let label = self.municipality.trim();
        if label.is_empty() {
            UNDEFINED_MUNICIPALITY
        } else {
            label
        }
    }
}
