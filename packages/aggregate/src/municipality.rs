//! Average price-per-area per municipality.

use std::collections::BTreeMap;

use price_map_aggregate_models::MunicipalityStats;

use crate::filter::PricedSale;
use crate::stats::PriceAccumulator;

/// Averages `sales` by municipality label.
///
/// Blank labels are grouped under
/// [`price_map_sale_models::UNDEFINED_MUNICIPALITY`]. Labels without any sale
/// are absent from the result.
#[must_use]
pub fn average_by_municipality<'a, I>(sales: I) -> MunicipalityStats
where
    I: IntoIterator<Item = PricedSale<'a>>,
{
    let mut groups: BTreeMap<&'a str, PriceAccumulator> = BTreeMap::new();

    for sale in sales {
        groups
            .entry(sale.record().municipality_label())
            .or_default()
            .push(sale.price_per_area());
    }

    log::debug!("Averaged price per area for {} municipalities", groups.len());

    groups
        .into_iter()
        .filter_map(|(label, acc)| acc.average().map(|avg| (label.to_string(), avg)))
        .collect()
}
