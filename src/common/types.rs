//! Unified types used across the pricing and trading engines

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Canonical form of an item name used for every lookup
///
/// Case-insensitive, surrounding whitespace ignored, and a leading definite
/// article dropped so "The Team Captain" and "team captain" are the same key.
pub fn canonical_item_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    match lowered.strip_prefix("the ") {
        Some(rest) if !rest.trim().is_empty() => rest.trim().to_string(),
        _ => lowered,
    }
}

/// Display form of an item name with the leading article removed
pub fn display_item_name(name: &str) -> String {
    let trimmed = name.trim();
    let has_article = trimmed
        .get(..4)
        .map(|prefix| prefix.eq_ignore_ascii_case("the "))
        .unwrap_or(false);
    if has_article && !trimmed[4..].trim().is_empty() {
        trimmed[4..].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Listing side (buy order or sell order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// One observed marketplace listing, as handed over by the scraper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Free-text price, e.g. "1 key, 15 ref"
    #[serde(rename = "price")]
    pub raw_price_text: String,
    /// Whether the listing is a buy order or a sell order
    #[serde(rename = "intent")]
    pub side: Side,
}

impl Listing {
    pub fn new(raw_price_text: impl Into<String>, side: Side) -> Self {
        Self {
            raw_price_text: raw_price_text.into(),
            side,
        }
    }

    pub fn buy(raw_price_text: impl Into<String>) -> Self {
        Self::new(raw_price_text, Side::Buy)
    }

    pub fn sell(raw_price_text: impl Into<String>) -> Self {
        Self::new(raw_price_text, Side::Sell)
    }

    pub fn is_buy_order(&self) -> bool {
        self.side == Side::Buy
    }
}

/// Buy and sell estimate for one item, in refined-metal units
///
/// A zero on either side means "no confident estimate", not "free".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceEstimate {
    pub item_name: String,
    pub buy_value: Decimal,
    pub sell_value: Decimal,
}

impl PriceEstimate {
    pub fn new(item_name: impl Into<String>, buy_value: Decimal, sell_value: Decimal) -> Self {
        Self {
            item_name: item_name.into(),
            buy_value,
            sell_value,
        }
    }

    /// Estimate with neither side known
    pub fn empty(item_name: impl Into<String>) -> Self {
        Self::new(item_name, Decimal::ZERO, Decimal::ZERO)
    }

    /// True when neither side produced a value
    pub fn is_empty(&self) -> bool {
        self.buy_value <= Decimal::ZERO && self.sell_value <= Decimal::ZERO
    }

    pub fn buy(&self) -> Option<Decimal> {
        (self.buy_value > Decimal::ZERO).then_some(self.buy_value)
    }

    pub fn sell(&self) -> Option<Decimal> {
        (self.sell_value > Decimal::ZERO).then_some(self.sell_value)
    }
}

/// Point-in-time count of the operator's own currency items
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PureSnapshot {
    pub keys: u32,
    pub refined: u32,
    pub reclaimed: u32,
    pub scrap: u32,
}

/// Remote state of a trade offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OfferState {
    /// Waiting on our response
    Active,
    /// Waiting on mobile confirmation, not actionable yet
    NeedsConfirmation,
    /// Anything else (accepted, declined, expired, ...)
    Other(i32),
}

impl OfferState {
    pub const ACTIVE_CODE: i32 = 2;
    pub const NEEDS_CONFIRMATION_CODE: i32 = 9;

    pub fn from_code(code: i32) -> Self {
        match code {
            Self::ACTIVE_CODE => OfferState::Active,
            Self::NEEDS_CONFIRMATION_CODE => OfferState::NeedsConfirmation,
            other => OfferState::Other(other),
        }
    }

    /// Only active and confirmation-pending offers are looked at by the poller
    pub fn is_pollable(&self) -> bool {
        matches!(self, OfferState::Active | OfferState::NeedsConfirmation)
    }
}

impl std::fmt::Display for OfferState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OfferState::Active => write!(f, "active"),
            OfferState::NeedsConfirmation => write!(f, "needs_confirmation"),
            OfferState::Other(code) => write!(f, "state_{}", code),
        }
    }
}

/// One asset inside an offer or an inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub app_id: u32,
    pub asset_id: String,
    pub class_id: String,
    pub instance_id: String,
    pub amount: u32,
}

impl Asset {
    /// Composite key used to look up the description, also the fallback name
    pub fn description_key(&self) -> String {
        format!("{}_{}", self.class_id, self.instance_id)
    }
}

/// Display names keyed by (class id, instance id)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptionTable {
    names: HashMap<(String, String), String>,
}

impl DescriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a name; the first non-empty name for a key wins
    pub fn insert(&mut self, class_id: impl Into<String>, instance_id: impl Into<String>, name: impl Into<String>) {
        let name = name.into();
        if name.trim().is_empty() {
            return;
        }
        self.names
            .entry((class_id.into(), instance_id.into()))
            .or_insert(name);
    }

    pub fn name_for(&self, asset: &Asset) -> Option<&str> {
        self.names
            .get(&(asset.class_id.clone(), asset.instance_id.clone()))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A received trade proposal, valid for one poll only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeProposal {
    pub offer_id: String,
    /// Counterparty SteamID64
    pub partner: String,
    pub state: OfferState,
    pub items_to_receive: Vec<Asset>,
    pub items_to_give: Vec<Asset>,
}

/// Result of listing pending proposals
#[derive(Debug, Clone, Default)]
pub struct OfferBatch {
    pub offers: Vec<TradeProposal>,
    pub descriptions: DescriptionTable,
}

/// Raw inventory read (own or counterparty)
#[derive(Debug, Clone, Default)]
pub struct InventoryListing {
    pub assets: Vec<Asset>,
    pub descriptions: DescriptionTable,
    pub fetched_at: Option<DateTime<Utc>>,
}
