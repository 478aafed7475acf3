//! Offer policy engine
//!
//! Every offer ends in exactly one [`OfferDecision`] with a reason:
//!
//! 1. confirmation-pending offers are held for a later poll
//! 2. trusted partners (toggle on) are accepted outright
//! 3. offers asking for items from another game are declined
//! 4. every non-pure item must be on the matching buy or sell list
//! 5. the offer must be sell-shaped or buy-shaped
//! 6. sell-shape: given assets still ours, offered pure covers the sell value
//! 7. buy-shape: stock caps hold, we own the pure we give, profit clears the buffer
//!
//! Keys we receive are valued at the key sell price, keys we pay with at
//! the key buy price.
//!
//! Policy violations are declines, never errors. Failing to read our own
//! inventory is a hold, since the offer is still pending remotely.

use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::common::types::{OfferState, TradeProposal};
use crate::config::types::{ItemsConfig, TradingConfig};
use crate::pricing::currency::PureKind;
use crate::pricing::store::PriceStore;

use super::inventory::{InventoryCache, InventorySnapshot};
use super::summary::OfferSummary;
use super::types::{OfferDecision, OfferShape};

/// Numeric policy knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySettings {
    /// Minimum profit for buy-shape offers
    pub min_profit: Decimal,
    /// Slack on the sell-shape value comparison
    pub sell_tolerance: Decimal,
    /// Re-read our inventory before giving items away
    pub verify_given_assets: bool,
}

impl From<&TradingConfig> for PolicySettings {
    fn from(config: &TradingConfig) -> Self {
        Self {
            min_profit: config.min_profit,
            sell_tolerance: config.sell_tolerance,
            verify_given_assets: config.verify_given_assets,
        }
    }
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self::from(&TradingConfig::default())
    }
}

/// Partners allowed to skip policy, behind a runtime switch
#[derive(Debug, Default)]
pub struct TrustedPartners {
    ids: HashSet<String>,
    enabled: AtomicBool,
}

impl TrustedPartners {
    pub fn new<I, S>(ids: I, enabled: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn contains(&self, partner: &str) -> bool {
        self.ids.contains(partner)
    }

    /// Trusted and the switch is on
    pub fn bypasses_policy(&self, partner: &str) -> bool {
        self.is_enabled() && self.contains(partner)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

pub struct OfferPolicyEngine {
    store: Arc<PriceStore>,
    items: ItemsConfig,
    settings: PolicySettings,
    trusted: Arc<TrustedPartners>,
    inventory: Arc<InventoryCache>,
}

impl OfferPolicyEngine {
    pub fn new(
        store: Arc<PriceStore>,
        items: ItemsConfig,
        settings: PolicySettings,
        trusted: Arc<TrustedPartners>,
        inventory: Arc<InventoryCache>,
    ) -> Self {
        Self {
            store,
            items,
            settings,
            trusted,
            inventory,
        }
    }

    pub fn set_trusted_accept_enabled(&self, enabled: bool) {
        info!(enabled, "Trusted partner auto-accept toggled");
        self.trusted.set_enabled(enabled);
    }

    pub fn get_trusted_accept_enabled(&self) -> bool {
        self.trusted.is_enabled()
    }

    pub fn settings(&self) -> &PolicySettings {
        &self.settings
    }

    /// Decide on one offer
    ///
    /// Reads our inventory through the cache when the offer shape needs it.
    #[instrument(skip(self, proposal, summary), fields(offer_id = %proposal.offer_id, partner = %proposal.partner))]
    pub async fn evaluate(&self, proposal: &TradeProposal, summary: &OfferSummary) -> OfferDecision {
        if proposal.state == OfferState::NeedsConfirmation {
            return OfferDecision::hold("offer is awaiting confirmation");
        }

        if self.trusted.bypasses_policy(&proposal.partner) {
            return OfferDecision::accept("trusted partner");
        }

        if !summary.given_other_apps.is_empty() {
            return OfferDecision::decline(format!(
                "offer asks for {} item(s) from other games ({})",
                summary.given_other_apps.len(),
                summary.given_other_apps.join(", ")
            ));
        }

        if let Some(decline) = self.check_allow_list(summary) {
            return decline;
        }

        match classify(summary) {
            OfferShape::Unsupported => {
                OfferDecision::decline("unsupported offer: items must be traded for pure only")
            }
            OfferShape::Sell => {
                let live = if self.settings.verify_given_assets {
                    match self.inventory.refresh().await {
                        Ok(snapshot) => Some(snapshot),
                        Err(e) => {
                            warn!(error = %e, "Inventory unavailable for asset check");
                            return OfferDecision::hold("inventory unavailable");
                        }
                    }
                } else {
                    None
                };
                self.evaluate_sell_shape(summary, live.as_deref())
            }
            OfferShape::Buy => match self.inventory.snapshot().await {
                Ok(snapshot) => self.evaluate_buy_shape(summary, &snapshot),
                Err(e) => {
                    warn!(error = %e, "Inventory unavailable for stock check");
                    OfferDecision::hold("inventory unavailable")
                }
            },
        }
    }

    /// Decline naming the first non-pure item missing from its list
    pub fn check_allow_list(&self, summary: &OfferSummary) -> Option<OfferDecision> {
        if let Some(item) = summary
            .received_non_pure()
            .find(|item| self.items.buy_entry(&item.name).is_none())
        {
            return Some(OfferDecision::decline(format!(
                "{} is not on my buy list",
                item.name
            )));
        }

        summary
            .given_non_pure()
            .find(|item| self.items.sell_entry(&item.name).is_none())
            .map(|item| OfferDecision::decline(format!("{} is not on my sell list", item.name)))
    }

    /// Value check for offers where we give items and receive pure
    ///
    /// # Arguments
    /// * `summary` - Summarized offer, already classified as sell-shaped
    /// * `live` - Fresh inventory read when asset liveness is checked
    pub fn evaluate_sell_shape(&self, summary: &OfferSummary, live: Option<&InventorySnapshot>) -> OfferDecision {
        if let Some(live) = live {
            if let Some(missing) = summary
                .given_asset_ids
                .iter()
                .find(|id| !live.contains_asset(id))
            {
                return OfferDecision::decline(format!(
                    "asset {} is no longer in my inventory",
                    missing
                ));
            }
        }

        let mut required = Decimal::ZERO;
        for item in summary.given_non_pure() {
            let Some(sell) = self.store.try_get_price(&item.name).and_then(|p| p.sell()) else {
                return OfferDecision::decline(format!("no sell price for {}", item.name));
            };
            let floor = self
                .items
                .sell_entry(&item.name)
                .and_then(|entry| entry.min_sell_price)
                .unwrap_or(Decimal::ZERO);
            required += sell.max(floor) * Decimal::from(item.quantity);
        }

        let offered_pure = summary.received_pure();
        let key_price = match self.key_price_for(offered_pure.keys) {
            Ok(price) => price,
            Err(decline) => return decline,
        };
        let offered = offered_pure.to_scalar(key_price);

        debug!(%offered, %required, "Sell-shape values");
        if offered + self.settings.sell_tolerance >= required {
            OfferDecision::accept(format!(
                "offered {:.2} ref covers required {:.2} ref",
                offered, required
            ))
            .with_values(offered, required)
        } else {
            OfferDecision::decline(format!(
                "offered {:.2} ref is less than required {:.2} ref",
                offered, required
            ))
            .with_values(offered, required)
        }
    }

    /// Stock, balance and profit checks for offers where we receive items and give pure
    pub fn evaluate_buy_shape(&self, summary: &OfferSummary, inventory: &InventorySnapshot) -> OfferDecision {
        for item in summary.received_non_pure() {
            let Some(entry) = self.items.buy_entry(&item.name) else {
                return OfferDecision::decline(format!("{} is not on my buy list", item.name));
            };
            let have = inventory.count_of(&item.name);
            if have.saturating_add(item.quantity) > entry.max_stock {
                return OfferDecision::decline(format!(
                    "{} would exceed my stock cap of {} (have {}, offered {})",
                    item.name, entry.max_stock, have, item.quantity
                ));
            }
        }

        let given_pure = summary.given_pure();
        if let Some((kind, needed, held)) = given_pure.shortfall_against(&inventory.pure) {
            return OfferDecision::decline(format!(
                "not enough {} to pay (need {}, have {})",
                kind.item_name(),
                needed,
                held
            ));
        }

        let mut receive = Decimal::ZERO;
        for item in summary.received_non_pure() {
            let Some(sell) = self.store.try_get_price(&item.name).and_then(|p| p.sell()) else {
                return OfferDecision::decline(format!("no price for {}", item.name));
            };
            receive += sell * Decimal::from(item.quantity);
        }

        let key_price = match self.key_buy_price_for(given_pure.keys) {
            Ok(price) => price,
            Err(decline) => return decline,
        };
        let give = given_pure.to_scalar(key_price);
        let profit = receive - give;

        debug!(%receive, %give, %profit, "Buy-shape values");
        if profit >= self.settings.min_profit {
            OfferDecision::accept(format!(
                "profit {:.2} ref meets minimum {:.2} ref",
                profit, self.settings.min_profit
            ))
            .with_values(receive, give)
        } else {
            OfferDecision::decline(format!(
                "profit {:.2} ref is {:.2} ref short of minimum {:.2} ref",
                profit,
                self.settings.min_profit - profit,
                self.settings.min_profit
            ))
            .with_values(receive, give)
        }
    }

    /// Current key price, or a decline when keys are involved and it is unknown
    fn key_price_for(&self, keys: u32) -> std::result::Result<Decimal, OfferDecision> {
        match self.store.key_price() {
            Some(price) => Ok(price),
            None if keys == 0 => Ok(Decimal::ZERO),
            None => Err(OfferDecision::decline(format!(
                "no current price for {}",
                PureKind::Key.item_name()
            ))),
        }
    }

    /// Key buy price for keys we pay with
    fn key_buy_price_for(&self, keys: u32) -> std::result::Result<Decimal, OfferDecision> {
        match self.store.key_buy_price() {
            Some(price) => Ok(price),
            None if keys == 0 => Ok(Decimal::ZERO),
            None => Err(OfferDecision::decline(format!(
                "no current buy price for {}",
                PureKind::Key.item_name()
            ))),
        }
    }
}

/// Classify an offer by which side carries non-pure items
pub fn classify(summary: &OfferSummary) -> OfferShape {
    let gives_items = summary.given_non_pure().next().is_some();
    let receives_items = summary.received_non_pure().next().is_some();
    let gives_pure = !summary.given_pure().is_empty();
    let receives_pure = !summary.received_pure().is_empty();

    match (gives_items, receives_items) {
        (true, false) if !gives_pure => OfferShape::Sell,
        (false, true) if !receives_pure => OfferShape::Buy,
        _ => OfferShape::Unsupported,
    }
}
