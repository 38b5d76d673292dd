//! Per-cell price-per-area statistics at a chosen cell scale.
//!
//! Sales are grouped by their base cell rescaled to the requested scale.
//! Only cells with at least one sale are returned; the caller reconstructs
//! cell geometry from the keys.

use std::collections::BTreeMap;

use price_map_aggregate_models::CellStats;
use price_map_grid::rescale;
use price_map_grid_models::{CellKey, CellScale};

use crate::AggregateError;
use crate::filter::PricedSale;
use crate::stats::PriceAccumulator;

/// Groups `sales` into cells at `cell_scale`.
///
/// Results are sorted by cell key. Sales without a base cell (unlocated
/// records) cannot be placed and are skipped.
///
/// # Errors
///
/// Returns [`AggregateError::InvalidScale`] if `cell_scale` is outside the
/// accepted bound. No sale is read in that case.
pub fn grid_stats<'a, I>(sales: I, cell_scale: i64) -> Result<Vec<CellStats>, AggregateError>
where
    I: IntoIterator<Item = PricedSale<'a>>,
{
    let scale = CellScale::new(cell_scale)?;
    Ok(grid_stats_at(sales, scale))
}

/// Groups `sales` into cells at an already validated scale.
#[must_use]
pub fn grid_stats_at<'a, I>(sales: I, scale: CellScale) -> Vec<CellStats>
where
    I: IntoIterator<Item = PricedSale<'a>>,
{
    let mut cells: BTreeMap<CellKey, PriceAccumulator> = BTreeMap::new();
    let mut unplaced = 0_u64;

    for sale in sales {
        let Some(base) = sale.record().base_cell else {
            unplaced += 1;
            continue;
        };
        cells
            .entry(rescale(base, scale))
            .or_default()
            .push(sale.price_per_area());
    }

    if unplaced > 0 {
        log::debug!("Skipped {unplaced} priced sales without a base cell");
    }
    log::debug!("Aggregated {} cells at scale {scale}", cells.len());

    cells
        .into_iter()
        .map(|(key, acc)| CellStats {
            key,
            count: acc.count(),
            price_per_area: acc.summary(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use price_map_aggregate_models::{DateRange, PriceSummary};
    use price_map_sale_models::SaleRecord;

    use super::*;
    use crate::filter::SaleFilter;
    use crate::test_support::sale;

    fn at(mut record: SaleRecord, x: i32, y: i32) -> SaleRecord {
        record.base_cell = Some(CellKey::new(x, y));
        record
    }

    fn stats(records: &[SaleRecord], scale: i64) -> Vec<CellStats> {
        let filter = SaleFilter::grid(DateRange::UNBOUNDED);
        grid_stats(filter.apply(records), scale).unwrap()
    }

    #[test]
    fn groups_by_cell_with_count_mean_min_max() {
        let records = vec![
            at(sale(1, 1_000_000, 50.0, 59.3, 18.0), 10, 10),
            at(sale(2, 2_000_000, 50.0, 59.3, 18.0), 10, 10),
            at(sale(3, 3_000_000, 100.0, 59.3, 18.0), 11, 10),
        ];

        assert_eq!(
            stats(&records, 1),
            vec![
                CellStats {
                    key: CellKey::new(10, 10),
                    count: 2,
                    price_per_area: Some(PriceSummary {
                        average: 30_000.0,
                        min: 20_000.0,
                        max: 40_000.0,
                    }),
                },
                CellStats {
                    key: CellKey::new(11, 10),
                    count: 1,
                    price_per_area: Some(PriceSummary {
                        average: 30_000.0,
                        min: 30_000.0,
                        max: 30_000.0,
                    }),
                },
            ]
        );
    }

    #[test]
    fn mean_is_of_ratios_not_of_totals() {
        // (1_000_000 / 10 + 1_000_000 / 40) / 2, not 2_000_000 / 50.
        let records = vec![
            at(sale(1, 1_000_000, 10.0, 59.3, 18.0), 0, 0),
            at(sale(2, 1_000_000, 40.0, 59.3, 18.0), 0, 0),
        ];
        let cells = stats(&records, 1);
        let summary = cells[0].price_per_area.unwrap();
        assert!((summary.average - 62_500.0).abs() < 1e-9);
    }

    #[test]
    fn rescaling_merges_neighbouring_cells() {
        let records = vec![
            at(sale(1, 1_000_000, 50.0, 59.3, 18.0), 0, 0),
            at(sale(2, 1_000_000, 50.0, 59.3, 18.0), 1, 1),
            at(sale(3, 1_000_000, 50.0, 59.3, 18.0), 2, 0),
            at(sale(4, 1_000_000, 50.0, 59.3, 18.0), -1, 0),
        ];

        let keys: Vec<(CellKey, u64)> = stats(&records, 2)
            .into_iter()
            .map(|c| (c.key, c.count))
            .collect();
        assert_eq!(
            keys,
            vec![
                (CellKey::new(-1, 0), 1),
                (CellKey::new(0, 0), 2),
                (CellKey::new(1, 0), 1),
            ]
        );
    }

    #[test]
    fn every_priced_sale_lands_in_exactly_one_cell() {
        let records: Vec<SaleRecord> = (0..200_i32)
            .map(|i| {
                at(
                    sale(i64::from(i), 900_000 + i64::from(i) * 1_000, 35.0, 59.3, 18.0),
                    (i * 7) % 23 - 11,
                    (i * 13) % 17 - 8,
                )
            })
            .collect();

        for scale in [1, 2, 3, 7, 20] {
            let total: u64 = stats(&records, scale).iter().map(|c| c.count).sum();
            assert_eq!(total, 200, "scale {scale}");
        }
    }

    #[test]
    fn coarser_scale_is_a_merge_of_finer_scale() {
        let records: Vec<SaleRecord> = (0..120_i32)
            .map(|i| {
                at(
                    sale(i64::from(i), 1_000_000 + i64::from(i) * 5_000, 40.0, 59.3, 18.0),
                    (i * 11) % 40 - 20,
                    (i * 3) % 30 - 15,
                )
            })
            .collect();

        let fine = stats(&records, 2);
        let coarse = stats(&records, 6);
        let scale3 = CellScale::new(3).unwrap();

        let mut merged: BTreeMap<CellKey, u64> = BTreeMap::new();
        for cell in &fine {
            *merged.entry(rescale(cell.key, scale3)).or_default() += cell.count;
        }

        let coarse_counts: BTreeMap<CellKey, u64> =
            coarse.iter().map(|c| (c.key, c.count)).collect();
        assert_eq!(merged, coarse_counts);
    }

    #[test]
    fn unlocated_sales_are_skipped() {
        let mut unlocated = sale(1, 1_000_000, 50.0, 59.3, 18.0);
        unlocated.base_cell = None;
        let records = vec![unlocated, at(sale(2, 1_000_000, 50.0, 59.3, 18.0), 3, 3)];

        let cells = stats(&records, 1);
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].count, 1);
    }

    #[test]
    fn zero_area_sale_never_reaches_a_cell() {
        let records = vec![at(sale(1, 1_000_000, 0.0, 59.3, 18.0), 0, 0)];
        assert!(stats(&records, 1).is_empty());
    }

    #[test]
    fn invalid_scale_is_an_error_not_an_empty_result() {
        let records = vec![at(sale(1, 1_000_000, 50.0, 59.3, 18.0), 0, 0)];
        let filter = SaleFilter::grid(DateRange::UNBOUNDED);
        for scale in [0, 21, -3] {
            assert!(matches!(
                grid_stats(filter.apply(&records), scale),
                Err(AggregateError::InvalidScale(e)) if e.value == scale
            ));
        }
    }
}
