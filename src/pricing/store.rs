//! Thread-safe store of the latest price estimates
//!
//! Written by the pricing pipeline, read by the policy engine and the chat
//! responder. Keys are canonical item names so lookups ignore case and a
//! leading "The".

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::common::types::{canonical_item_name, PriceEstimate};

use super::currency::KEY_NAME;

/// Stored estimate with the time it was written
#[derive(Debug, Clone, PartialEq)]
pub struct PriceEntry {
    pub estimate: PriceEstimate,
    pub updated_at: DateTime<Utc>,
}

/// Case-insensitive map of item name to its latest estimate
#[derive(Debug)]
pub struct PriceStore {
    entries: RwLock<HashMap<String, PriceEntry>>,
    last_updated: RwLock<Option<DateTime<Utc>>>,
    key_item_name: String,
}

impl Default for PriceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceStore {
    pub fn new() -> Self {
        Self::with_key_item(KEY_NAME)
    }

    /// Store that reads the floating key price from a different item name
    pub fn with_key_item(key_item_name: impl Into<String>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            last_updated: RwLock::new(None),
            key_item_name: key_item_name.into(),
        }
    }

    /// Insert or overwrite the estimate for an item
    ///
    /// Also bumps the store-wide `last_updated` timestamp.
    pub fn set_price(&self, estimate: PriceEstimate) {
        let now = Utc::now();
        let key = canonical_item_name(&estimate.item_name);
        self.entries.write().insert(
            key,
            PriceEntry {
                estimate,
                updated_at: now,
            },
        );
        *self.last_updated.write() = Some(now);
    }

    /// Estimate for an item, or an empty (all-zero) estimate when unknown
    pub fn get_price(&self, item_name: &str) -> PriceEstimate {
        self.try_get_price(item_name)
            .unwrap_or_else(|| PriceEstimate::empty(item_name))
    }

    pub fn try_get_price(&self, item_name: &str) -> Option<PriceEstimate> {
        self.entries
            .read()
            .get(&canonical_item_name(item_name))
            .map(|entry| entry.estimate.clone())
    }

    /// Entry with its per-item timestamp
    pub fn try_get_entry(&self, item_name: &str) -> Option<PriceEntry> {
        self.entries
            .read()
            .get(&canonical_item_name(item_name))
            .cloned()
    }

    /// Snapshot of every entry, safe to iterate while the pipeline writes
    pub fn all_prices(&self) -> Vec<PriceEstimate> {
        self.entries
            .read()
            .values()
            .map(|entry| entry.estimate.clone())
            .collect()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        *self.last_updated.read()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn key_item_name(&self) -> &str {
        &self.key_item_name
    }

    /// Current key price in refined
    ///
    /// Uses the key's sell estimate, falling back to its buy estimate.
    /// Returns `None` when neither side is known.
    pub fn key_price(&self) -> Option<Decimal> {
        let estimate = self.try_get_price(&self.key_item_name)?;
        estimate.sell().or_else(|| estimate.buy())
    }

    /// Price we pay for a key, with no fallback to the sell side
    pub fn key_buy_price(&self) -> Option<Decimal> {
        self.try_get_price(&self.key_item_name)?.buy()
    }
}
