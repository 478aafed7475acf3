//! Common test utilities and fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use classifieds_trader::config::{BuyItemConfig, ItemsConfig, SellItemConfig, TradingConfig};
use classifieds_trader::pricing::KEY_NAME;
use classifieds_trader::trading::{
    InventoryCache, OfferExecutor, OfferPolicyEngine, OfferSummarizer, PolicySettings,
    PollerSettings, RetryPolicy, TradePoller, TrustedPartners,
};
use classifieds_trader::{
    Asset, ClientError, DescriptionTable, InventoryListing, OfferBatch, OfferState, PriceEstimate,
    PriceStore, Result, TradeProposal, TradingPlatform,
};
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const APP_ID: u32 = 440;
pub const PARTNER: &str = "76561197999806375";
pub const TRUSTED_PARTNER: &str = "76561198000000042";

// ============================================================================
// Catalog and prices
// ============================================================================

/// One sellable hat, one buyable cosmetic
pub fn sample_items() -> ItemsConfig {
    ItemsConfig {
        buy: vec![BuyItemConfig {
            name: "Earbuds".into(),
            max_stock: 2,
            buy_price: dec!(60),
        }],
        sell: vec![SellItemConfig {
            name: "Team Captain".into(),
            max_stock: 1,
            sell_price: dec!(55.44),
            min_sell_price: None,
        }],
    }
}

/// Key at 50 ref, Team Captain sells at 55.44, Earbuds sell at 62
pub fn sample_store() -> Arc<PriceStore> {
    let store = Arc::new(PriceStore::new());
    store.set_price(PriceEstimate::new(KEY_NAME, dec!(49.88), dec!(50)));
    store.set_price(PriceEstimate::new("Team Captain", dec!(52.33), dec!(55.44)));
    store.set_price(PriceEstimate::new("Earbuds", dec!(60), dec!(62)));
    store
}

// ============================================================================
// Assets and offers
// ============================================================================

pub fn asset(asset_id: &str, class_id: &str, amount: u32) -> Asset {
    Asset {
        app_id: APP_ID,
        asset_id: asset_id.to_string(),
        class_id: class_id.to_string(),
        instance_id: "0".to_string(),
        amount,
    }
}

/// Class ids used by every fixture
pub mod classes {
    pub const KEY: &str = "101";
    pub const REFINED: &str = "102";
    pub const TEAM_CAPTAIN: &str = "201";
    pub const EARBUDS: &str = "202";
}

pub fn sample_descriptions() -> DescriptionTable {
    let mut table = DescriptionTable::new();
    table.insert(classes::KEY, "0", KEY_NAME);
    table.insert(classes::REFINED, "0", "Refined Metal");
    table.insert(classes::TEAM_CAPTAIN, "0", "The Team Captain");
    table.insert(classes::EARBUDS, "0", "Earbuds");
    table
}

/// We give the Team Captain (asset 9001) and receive `keys` keys plus `refined` ref
pub fn sell_offer(offer_id: &str, keys: u32, refined: u32) -> TradeProposal {
    let mut receive = Vec::new();
    if keys > 0 {
        receive.push(asset("501", classes::KEY, keys));
    }
    if refined > 0 {
        receive.push(asset("502", classes::REFINED, refined));
    }
    TradeProposal {
        offer_id: offer_id.to_string(),
        partner: PARTNER.to_string(),
        state: OfferState::Active,
        items_to_receive: receive,
        items_to_give: vec![asset("9001", classes::TEAM_CAPTAIN, 1)],
    }
}

/// We receive Earbuds and give 1 key plus 10 ref
pub fn buy_offer(offer_id: &str) -> TradeProposal {
    TradeProposal {
        offer_id: offer_id.to_string(),
        partner: PARTNER.to_string(),
        state: OfferState::Active,
        items_to_receive: vec![asset("601", classes::EARBUDS, 1)],
        items_to_give: vec![asset("8001", classes::KEY, 1), asset("8002", classes::REFINED, 10)],
    }
}

/// Our inventory: the Team Captain, 1 key and 10 ref
pub fn sample_inventory() -> InventoryListing {
    InventoryListing {
        assets: vec![
            asset("9001", classes::TEAM_CAPTAIN, 1),
            asset("8001", classes::KEY, 1),
            asset("8002", classes::REFINED, 10),
        ],
        descriptions: sample_descriptions(),
        fetched_at: None,
    }
}

// ============================================================================
// Fake platform
// ============================================================================

/// In-memory platform with scripted write results and call counters
pub struct FakePlatform {
    offers: Mutex<Vec<TradeProposal>>,
    inventory: Mutex<InventoryListing>,
    accept_script: Mutex<VecDeque<Result<()>>>,
    decline_script: Mutex<VecDeque<Result<()>>>,
    listing_delay: Duration,
    pub list_calls: AtomicU32,
    pub inventory_calls: AtomicU32,
    pub accept_calls: AtomicU32,
    pub decline_calls: AtomicU32,
    accepted: Mutex<Vec<String>>,
    declined: Mutex<Vec<String>>,
}

impl FakePlatform {
    pub fn new(offers: Vec<TradeProposal>) -> Self {
        Self {
            offers: Mutex::new(offers),
            inventory: Mutex::new(sample_inventory()),
            accept_script: Mutex::new(VecDeque::new()),
            decline_script: Mutex::new(VecDeque::new()),
            listing_delay: Duration::ZERO,
            list_calls: AtomicU32::new(0),
            inventory_calls: AtomicU32::new(0),
            accept_calls: AtomicU32::new(0),
            decline_calls: AtomicU32::new(0),
            accepted: Mutex::new(Vec::new()),
            declined: Mutex::new(Vec::new()),
        }
    }

    /// Make every offer listing take this long
    pub fn with_listing_delay(mut self, delay: Duration) -> Self {
        self.listing_delay = delay;
        self
    }

    pub fn with_inventory(self, inventory: InventoryListing) -> Self {
        *self.inventory.lock() = inventory;
        self
    }

    /// Results returned by the next accept calls, then `Ok(())`
    pub fn script_accepts(&self, results: Vec<Result<()>>) {
        self.accept_script.lock().extend(results);
    }

    pub fn script_declines(&self, results: Vec<Result<()>>) {
        self.decline_script.lock().extend(results);
    }

    pub fn accepted(&self) -> Vec<String> {
        self.accepted.lock().clone()
    }

    pub fn declined(&self) -> Vec<String> {
        self.declined.lock().clone()
    }

    pub fn writes(&self) -> u32 {
        self.accept_calls.load(Ordering::SeqCst) + self.decline_calls.load(Ordering::SeqCst)
    }

    fn resolve(&self, offer_id: &str) {
        self.offers.lock().retain(|o| o.offer_id != offer_id);
    }
}

#[async_trait]
impl TradingPlatform for FakePlatform {
    async fn pending_offers(&self) -> Result<OfferBatch> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if !self.listing_delay.is_zero() {
            tokio::time::sleep(self.listing_delay).await;
        }
        Ok(OfferBatch {
            offers: self.offers.lock().clone(),
            descriptions: sample_descriptions(),
        })
    }

    async fn own_inventory(&self) -> Result<InventoryListing> {
        self.inventory_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.inventory.lock().clone())
    }

    async fn partner_inventory(&self, _partner: &str) -> Result<InventoryListing> {
        Err(ClientError::InvalidResponse("partner inventory not available".into()))
    }

    async fn accept_offer(&self, offer_id: &str, _partner: &str) -> Result<()> {
        self.accept_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.accept_script.lock().pop_front();
        let result = scripted.unwrap_or(Ok(()));
        if result.is_ok() {
            self.accepted.lock().push(offer_id.to_string());
            self.resolve(offer_id);
        }
        result
    }

    async fn decline_offer(&self, offer_id: &str) -> Result<()> {
        self.decline_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.decline_script.lock().pop_front();
        let result = scripted.unwrap_or(Ok(()));
        if result.is_ok() {
            self.declined.lock().push(offer_id.to_string());
            self.resolve(offer_id);
        }
        result
    }

    fn platform_name(&self) -> &'static str {
        "Fake"
    }
}

// ============================================================================
// Poller wiring
// ============================================================================

/// Live trading settings with a fast retry policy
pub fn live_trading() -> TradingConfig {
    TradingConfig {
        enabled: true,
        dry_run: false,
        retry_attempts: 3,
        retry_base_delay_ms: 10,
        trusted_partners: vec![TRUSTED_PARTNER.to_string()],
        ..TradingConfig::default()
    }
}

/// Wire a poller around the fake platform the same way the binary does
pub fn build_poller(platform: Arc<FakePlatform>, trading: &TradingConfig) -> TradePoller {
    let platform_dyn: Arc<dyn TradingPlatform> = platform;
    let inventory = Arc::new(InventoryCache::new(
        platform_dyn.clone(),
        APP_ID,
        trading.pure_cache_ttl(),
    ));
    let trusted = Arc::new(TrustedPartners::new(
        trading.trusted_partners.clone(),
        trading.trusted_accept_enabled,
    ));
    let policy = Arc::new(OfferPolicyEngine::new(
        sample_store(),
        sample_items(),
        PolicySettings::from(trading),
        trusted,
        inventory.clone(),
    ));
    let executor = OfferExecutor::new(platform_dyn.clone(), RetryPolicy::from(trading));

    TradePoller::new(
        platform_dyn,
        OfferSummarizer::new(APP_ID),
        policy,
        executor,
        inventory,
        PollerSettings::from(trading),
    )
}

/// Sample Steam Web API and community responses
pub mod api_responses {
    /// GetTradeOffers with one active and one confirmation-pending offer
    pub const TRADE_OFFERS: &str = r#"{
        "response": {
            "trade_offers_received": [
                {
                    "tradeofferid": "6000000001",
                    "accountid_other": 39540647,
                    "message": "",
                    "trade_offer_state": 2,
                    "items_to_give": [
                        {"appid": 440, "contextid": "2", "assetid": "9001", "classid": "201", "instanceid": "0", "amount": "1"}
                    ],
                    "items_to_receive": [
                        {"appid": 440, "contextid": "2", "assetid": "501", "classid": "101", "instanceid": "0", "amount": "1"},
                        {"appid": 440, "contextid": "2", "assetid": "502", "classid": "102", "instanceid": "0", "amount": "6"}
                    ],
                    "time_created": 1704067200
                },
                {
                    "tradeofferid": "6000000002",
                    "accountid_other": 39540647,
                    "trade_offer_state": 9,
                    "items_to_receive": [
                        {"appid": 440, "contextid": "2", "assetid": "503", "classid": "102", "instanceid": "0", "amount": "1"}
                    ]
                }
            ],
            "descriptions": [
                {"appid": 440, "classid": "101", "instanceid": "0", "name": "Mann Co. Supply Crate Key", "market_hash_name": "Mann Co. Supply Crate Key"},
                {"appid": 440, "classid": "102", "instanceid": "0", "name": "Refined Metal", "market_hash_name": "Refined Metal"},
                {"appid": 440, "classid": "201", "instanceid": "0", "name": "The Team Captain", "market_hash_name": "The Team Captain"}
            ]
        }
    }"#;

    /// Community inventory with two pure stacks and one hat
    pub const INVENTORY: &str = r#"{
        "assets": [
            {"appid": 440, "contextid": "2", "assetid": "8001", "classid": "101", "instanceid": "0", "amount": "1"},
            {"appid": 440, "contextid": "2", "assetid": "8002", "classid": "102", "instanceid": "0", "amount": "1"},
            {"appid": 440, "contextid": "2", "assetid": "9001", "classid": "201", "instanceid": "0", "amount": "1"}
        ],
        "descriptions": [
            {"appid": 440, "classid": "101", "instanceid": "0", "name": "Mann Co. Supply Crate Key", "market_hash_name": "Mann Co. Supply Crate Key"},
            {"appid": 440, "classid": "102", "instanceid": "0", "name": "Refined Metal", "market_hash_name": "Refined Metal"},
            {"appid": 440, "classid": "201", "instanceid": "0", "name": "The Team Captain", "market_hash_name": "The Team Captain"}
        ],
        "total_inventory_count": 3,
        "success": 1
    }"#;

    pub const ACCEPT_OK: &str = r#"{"tradeid": "4000000001"}"#;

    pub const ACCEPT_INVALID_STATE: &str = r#"{"strError": "There was an error accepting this trade offer.  Please try again later. (11)"}"#;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_inventory_names() {
        let inventory = sample_inventory();
        assert_eq!(inventory.assets.len(), 3);
        assert_eq!(
            inventory.descriptions.name_for(&inventory.assets[1]),
            Some(KEY_NAME)
        );
    }
}
