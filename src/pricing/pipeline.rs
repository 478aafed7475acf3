//! Pricing pipeline: listings in, price store entries out
//!
//! Each cycle prices the key first so every other item is parsed against a
//! fresh key price. A failed fetch or an estimate with no usable side leaves
//! the previous entry untouched; stale prices beat no prices. Without any
//! key price the rest of the cycle is skipped.

use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::common::traits::ListingSource;
use crate::common::types::{canonical_item_name, Listing, PriceEstimate};

use super::estimator::PriceEstimator;
use super::parser::ListingPriceParser;
use super::store::PriceStore;

/// What happened to one item during a cycle
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// A fresh estimate was written
    Updated(PriceEstimate),
    /// No usable estimate; the previous entry was kept
    KeptStale,
    /// No usable estimate and nothing stored yet
    NoData,
}

/// Counters for one pricing cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub updated: usize,
    pub kept_stale: usize,
    pub no_data: usize,
}

impl CycleReport {
    fn record(&mut self, outcome: &RefreshOutcome) {
        match outcome {
            RefreshOutcome::Updated(_) => self.updated += 1,
            RefreshOutcome::KeptStale => self.kept_stale += 1,
            RefreshOutcome::NoData => self.no_data += 1,
        }
    }
}

pub struct PricingPipeline {
    source: Arc<dyn ListingSource>,
    store: Arc<PriceStore>,
    estimator: PriceEstimator,
    items: Vec<String>,
}

impl PricingPipeline {
    /// # Arguments
    /// * `source` - Where listings come from
    /// * `store` - Store the estimates are written to
    /// * `items` - Tracked item names, excluding the key (always priced first)
    pub fn new(source: Arc<dyn ListingSource>, store: Arc<PriceStore>, items: Vec<String>) -> Self {
        Self {
            source,
            store,
            estimator: PriceEstimator::default(),
            items,
        }
    }

    pub fn with_estimator(mut self, estimator: PriceEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn store(&self) -> &Arc<PriceStore> {
        &self.store
    }

    /// Parse and estimate one item's listings against the current key price
    ///
    /// Unparseable listings are discarded, as are listings quoting keys
    /// while no key price is known. Pure function of the store's key
    /// price and `listings`; the store itself is not written.
    pub fn evaluate_and_price_item(&self, item_name: &str, listings: &[Listing]) -> PriceEstimate {
        let key_price = self.store.key_price().unwrap_or(Decimal::ZERO);
        let parser = ListingPriceParser::new(key_price);

        let mut buy = Vec::new();
        let mut sell = Vec::new();
        let mut discarded = 0usize;
        for listing in listings {
            match parser.parse(&listing.raw_price_text) {
                Some(value) if listing.is_buy_order() => buy.push(value),
                Some(value) => sell.push(value),
                None => discarded += 1,
            }
        }

        if discarded > 0 {
            debug!(item = item_name, discarded, "Discarded unparseable listings");
        }

        self.estimator.estimate(item_name, &buy, &sell)
    }

    /// Fetch, estimate and store one item
    #[instrument(skip(self))]
    pub async fn refresh_item(&self, item_name: &str) -> RefreshOutcome {
        let stale = || self.unchanged(item_name);

        let listings = match self.source.fetch_listings(item_name).await {
            Ok(listings) => listings,
            Err(e) => {
                warn!(item = item_name, error = %e, "Listing fetch failed, keeping previous price");
                return stale();
            }
        };

        let estimate = self.evaluate_and_price_item(item_name, &listings);
        if estimate.is_empty() {
            debug!(item = item_name, listings = listings.len(), "No confident estimate");
            return stale();
        }

        self.store.set_price(estimate.clone());
        RefreshOutcome::Updated(estimate)
    }

    fn unchanged(&self, item_name: &str) -> RefreshOutcome {
        if self.store.try_get_price(item_name).is_some() {
            RefreshOutcome::KeptStale
        } else {
            RefreshOutcome::NoData
        }
    }

    /// Price the key, then every tracked item
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        let key_name = self.store.key_item_name().to_string();
        let key_outcome = self.refresh_item(&key_name).await;
        report.record(&key_outcome);

        let key_known = self.store.key_price().is_some();
        if !key_known {
            warn!(key = %key_name, "No key price known, leaving item prices unchanged");
        }

        let key_canonical = canonical_item_name(&key_name);
        for item in &self.items {
            if canonical_item_name(item) == key_canonical {
                continue;
            }
            let outcome = if key_known {
                self.refresh_item(item).await
            } else {
                self.unchanged(item)
            };
            report.record(&outcome);
        }

        info!(
            updated = report.updated,
            kept_stale = report.kept_stale,
            no_data = report.no_data,
            "Pricing cycle complete"
        );
        report
    }

    /// Run cycles on a fixed interval until cancelled
    pub async fn run(self: Arc<Self>, every: Duration, token: CancellationToken) {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Pricing loop stopped");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
            }
        }
    }
}
