//! Selection of sales eligible for price-per-area aggregation.
//!
//! A sale passes when it has a price, a strictly positive floor area, an
//! accepted sale-type label, and a sale date inside the requested window.
//! Passing sales are handed on as [`PricedSale`]s, which can only be built
//! here, so the price-per-area they carry is always finite.

use price_map_aggregate_models::DateRange;
use price_map_sale_models::{AcceptedSaleTypes, SaleRecord};

/// A sale that passed a [`SaleFilter`], with its price-per-area.
#[derive(Debug, Clone, Copy)]
pub struct PricedSale<'a> {
    record: &'a SaleRecord,
    price_per_area: f64,
}

impl<'a> PricedSale<'a> {
    /// The underlying record.
    #[must_use]
    pub const fn record(&self) -> &'a SaleRecord {
        self.record
    }

    /// Price divided by floor area.
    #[must_use]
    pub const fn price_per_area(&self) -> f64 {
        self.price_per_area
    }
}

/// Per-operation eligibility rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleFilter {
    accepted: AcceptedSaleTypes,
    range: DateRange,
}

impl SaleFilter {
    /// Creates a filter from explicit rules.
    #[must_use]
    pub const fn new(accepted: AcceptedSaleTypes, range: DateRange) -> Self {
        Self { accepted, range }
    }

    /// Rules for municipality averages: final prices only.
    #[must_use]
    pub fn municipality(range: DateRange) -> Self {
        Self::new(AcceptedSaleTypes::final_price_only(), range)
    }

    /// Rules for grid statistics: final prices and title registrations.
    #[must_use]
    pub fn grid(range: DateRange) -> Self {
        Self::new(AcceptedSaleTypes::final_price_or_title_registration(), range)
    }

    /// Accepted sale-type labels.
    #[must_use]
    pub const fn accepted(&self) -> &AcceptedSaleTypes {
        &self.accepted
    }

    /// Sale-date window.
    #[must_use]
    pub const fn range(&self) -> DateRange {
        self.range
    }

    /// Prices a single record, or `None` if it is not eligible.
    #[must_use]
    pub fn price<'a>(&self, record: &'a SaleRecord) -> Option<PricedSale<'a>> {
        if !self.accepted.accepts(&record.sale_type) || !self.range.contains(record.sale_date) {
            return None;
        }

        let price_per_area = record.price_per_area()?;

        Some(PricedSale {
            record,
            price_per_area,
        })
    }

    /// Lazily yields the eligible records of `records`.
    ///
    /// Calling this again re-evaluates the filter from scratch.
    pub fn apply<'a, I>(&'a self, records: I) -> impl Iterator<Item = PricedSale<'a>>
    where
        I: IntoIterator<Item = &'a SaleRecord>,
    {
        records.into_iter().filter_map(move |record| self.price(record))
    }
}
