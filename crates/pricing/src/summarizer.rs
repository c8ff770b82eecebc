//! Statistical summary of a filtered price set.

use rust_decimal::prelude::*;

use crate::models::PriceSummary;

/// Computes count, mean, median, range and population standard deviation.
pub struct PriceSummarizer;

impl PriceSummarizer {
    /// Summarize `prices`. An empty slice yields the all-zero summary.
    ///
    /// Mean, median and standard deviation are rounded to cents; mean and
    /// median are kept inside `[min, max]` after rounding.
    pub fn summarize(prices: &[Decimal]) -> PriceSummary {
        if prices.is_empty() {
            return PriceSummary::empty();
        }

        let mut sorted = prices.to_vec();
        sorted.sort();

        let count = sorted.len();
        let n = Decimal::from(count);
        let min = sorted[0];
        let max = sorted[count - 1];

        let sum: Decimal = sorted.iter().copied().sum();
        let mean = sum / n;

        let mid = count / 2;
        let median = if count % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / Decimal::TWO
        } else {
            sorted[mid]
        };

        let variance = sorted
            .iter()
            .map(|p| {
                let d = *p - mean;
                d * d
            })
            .sum::<Decimal>()
            / n;
        let std_dev = variance.sqrt().unwrap_or(Decimal::ZERO);

        PriceSummary {
            count,
            avg_price: mean.round_dp(2).clamp(min, max),
            median: median.round_dp(2).clamp(min, max),
            min,
            max,
            std_dev: std_dev.round_dp(2),
            tier: None,
            error: None,
        }
    }
}
