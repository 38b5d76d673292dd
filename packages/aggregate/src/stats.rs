//! Running count, mean, minimum, and maximum of price-per-area values.

use price_map_aggregate_models::PriceSummary;

/// Accumulates price-per-area values for one group.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PriceAccumulator {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl PriceAccumulator {
    /// Adds one value.
    pub fn push(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += value;
        self.count += 1;
    }

    /// Number of values added.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Arithmetic mean, `None` when nothing was added.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// Mean, minimum, and maximum, `None` when nothing was added.
    #[must_use]
    pub fn summary(&self) -> Option<PriceSummary> {
        self.average().map(|average| PriceSummary {
            average,
            min: self.min,
            max: self.max,
        })
    }
}

impl Extend<f64> for PriceAccumulator {
    fn extend<T: IntoIterator<Item = f64>>(&mut self, iter: T) {
        for value in iter {
            self.push(value);
        }
    }
}

impl FromIterator<f64> for PriceAccumulator {
    fn from_iter<T: IntoIterator<Item = f64>>(iter: T) -> Self {
        let mut acc = Self::default();
        acc.extend(iter);
        acc
    }
}
