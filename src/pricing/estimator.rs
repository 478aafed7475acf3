//! Robust price estimation from noisy listing data
//!
//! Each side is estimated independently, sell first. The sell value then
//! caps the buy search window so the bot never buys above what it sells for.
//!
//! Per side:
//! 1. at least five observations, otherwise the side is zero
//! 2. sort; the buy side trims the lowest and highest 10% (sell is untrimmed)
//! 3. take the median
//! 4. search tolerance windows around the median (buy: 15% then 20%,
//!    sell: 15%) for at least three points, buy upper bound capped at sell
//! 5. count each distinct price in the window, one extra vote for prices on
//!    the operator-favorable side of the median
//! 6. highest vote wins; ties go to the higher price for buy and the lower
//!    price for sell
//!
//! The result only depends on the multiset of inputs, not their order.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use tracing::debug;

use crate::common::types::{PriceEstimate, Side};

/// Tunables for the estimator
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatorConfig {
    /// Minimum observations on a side before it is priced
    pub min_observations: usize,
    /// Fraction trimmed from each end of the buy side
    pub trim_fraction: Decimal,
    /// Minimum points left after trimming
    pub min_after_trim: usize,
    /// Minimum points inside the winning window
    pub min_window_points: usize,
    /// Window half-widths tried in order for the buy side
    pub buy_windows: Vec<Decimal>,
    /// Window half-widths tried in order for the sell side
    pub sell_windows: Vec<Decimal>,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            min_observations: 5,
            trim_fraction: dec!(0.10),
            min_after_trim: 3,
            min_window_points: 3,
            buy_windows: vec![dec!(0.15), dec!(0.20)],
            sell_windows: vec![dec!(0.15)],
        }
    }
}

/// Two-pass, sell-anchored, frequency-biased trimmed estimator
#[derive(Debug, Clone, Default)]
pub struct PriceEstimator {
    config: EstimatorConfig,
}

impl PriceEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Estimate both sides from already-parsed prices
    pub fn estimate(&self, item_name: &str, buy_prices: &[Decimal], sell_prices: &[Decimal]) -> PriceEstimate {
        let sell = self.estimate_side(item_name, Side::Sell, sell_prices, None);
        let anchor = (sell > Decimal::ZERO).then_some(sell);
        let buy = self.estimate_side(item_name, Side::Buy, buy_prices, anchor);

        debug!(item = item_name, %buy, %sell, "Estimated prices");
        PriceEstimate::new(item_name, buy, sell)
    }

    fn estimate_side(&self, item_name: &str, side: Side, prices: &[Decimal], anchor: Option<Decimal>) -> Decimal {
        if prices.len() < self.config.min_observations {
            debug!(item = item_name, %side, count = prices.len(), "Not enough listings");
            return Decimal::ZERO;
        }

        let mut sorted: Vec<Decimal> = prices.iter().map(|p| p.normalize()).collect();
        sorted.sort();

        let kept = match side {
            Side::Buy => self.trim(&sorted),
            Side::Sell => &sorted[..],
        };
        if kept.len() < self.config.min_after_trim {
            debug!(item = item_name, %side, count = kept.len(), "Too few listings after trimming");
            return Decimal::ZERO;
        }

        let median = median_of_sorted(kept);
        let windows = match side {
            Side::Buy => &self.config.buy_windows,
            Side::Sell => &self.config.sell_windows,
        };

        for width in windows {
            let lower = median
                .checked_mul(Decimal::ONE - width)
                .unwrap_or(Decimal::ZERO);
            let mut upper = median
                .checked_mul(Decimal::ONE + width)
                .unwrap_or(Decimal::MAX);
            if let Some(cap) = anchor {
                upper = upper.min(cap);
            }

            let window: Vec<Decimal> = kept
                .iter()
                .copied()
                .filter(|p| *p >= lower && *p <= upper)
                .collect();

            if window.len() >= self.config.min_window_points {
                return pick_by_votes(&window, median, side);
            }
        }

        debug!(item = item_name, %side, %median, "No tolerance window held enough listings");
        Decimal::ZERO
    }

    fn trim<'a>(&self, sorted: &'a [Decimal]) -> &'a [Decimal] {
        let n = Decimal::from(sorted.len() as u64);
        let cut = (n * self.config.trim_fraction).floor().to_usize().unwrap_or(0);
        if cut * 2 >= sorted.len() {
            return &sorted[0..0];
        }
        &sorted[cut..sorted.len() - cut]
    }
}

fn median_of_sorted(sorted: &[Decimal]) -> Decimal {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        let (a, b) = (sorted[mid - 1], sorted[mid]);
        match a.checked_add(b) {
            Some(sum) => sum / Decimal::TWO,
            None => a + (b - a) / Decimal::TWO,
        }
    } else {
        sorted[mid]
    }
}

fn pick_by_votes(window: &[Decimal], median: Decimal, side: Side) -> Decimal {
    let mut votes: BTreeMap<Decimal, u32> = BTreeMap::new();
    for price in window {
        *votes.entry(*price).or_insert(0) += 1;
    }

    for (price, count) in votes.iter_mut() {
        let favorable = match side {
            Side::Buy => *price > median,
            Side::Sell => *price < median,
        };
        if favorable {
            *count += 1;
        }
    }

    votes
        .into_iter()
        .max_by(|(price_a, votes_a), (price_b, votes_b)| {
            votes_a.cmp(votes_b).then_with(|| match side {
                Side::Buy => price_a.cmp(price_b),
                Side::Sell => price_b.cmp(price_a),
            })
        })
        .map(|(price, _)| price)
        .unwrap_or(Decimal::ZERO)
}
