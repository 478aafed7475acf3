//! Configuration types

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

use crate::common::errors::{ClientError, Result};
use crate::common::types::canonical_item_name;
use crate::pricing::currency::{is_denomination_clean, KEY_NAME};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Steam platform configuration
    #[serde(default)]
    pub steam: SteamConfig,
    /// Trade execution loop configuration
    #[serde(default)]
    pub trading: TradingConfig,
    /// Pricing pipeline configuration
    #[serde(default)]
    pub pricing: PricingConfig,
    /// Tradable item catalog
    #[serde(default)]
    pub items: ItemsConfig,
    /// Chat command configuration
    #[serde(default)]
    pub chat: ChatConfig,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

impl AppConfig {
    /// Startup checks; any failure here is fatal
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.steam.api_url)
            .map_err(|e| ClientError::Configuration(format!("steam.api_url: {}", e)))?;
        Url::parse(&self.steam.community_url)
            .map_err(|e| ClientError::Configuration(format!("steam.community_url: {}", e)))?;

        if self.trading.enabled {
            if self.steam.api_key.as_deref().map_or(true, str::is_empty) {
                return Err(ClientError::Configuration(
                    "steam.api_key is required when trading is enabled".into(),
                ));
            }
            if self.steam.bot_steam_id.as_deref().map_or(true, str::is_empty) {
                return Err(ClientError::Configuration(
                    "steam.bot_steam_id is required when trading is enabled".into(),
                ));
            }
            if !self.trading.dry_run && !self.steam.has_session() {
                return Err(ClientError::Configuration(
                    "steam.session_id and steam.login_secure are required unless dry_run is set".into(),
                ));
            }
        }

        if self.trading.poll_interval_seconds == 0 {
            return Err(ClientError::Configuration(
                "trading.poll_interval_seconds must be positive".into(),
            ));
        }
        if self.trading.retry_attempts == 0 {
            return Err(ClientError::Configuration(
                "trading.retry_attempts must be at least 1".into(),
            ));
        }

        let mut seen = HashSet::new();
        for item in &self.items.buy {
            check_item_name(&item.name, "buy", &mut seen)?;
            check_price(&item.name, "buy_price", Some(item.buy_price))?;
        }

        seen.clear();
        for item in &self.items.sell {
            check_item_name(&item.name, "sell", &mut seen)?;
            check_price(&item.name, "sell_price", Some(item.sell_price))?;
            check_price(&item.name, "min_sell_price", item.min_sell_price)?;
        }

        Ok(())
    }
}

fn check_item_name(name: &str, list: &str, seen: &mut HashSet<String>) -> Result<()> {
    let canonical = canonical_item_name(name);
    if canonical.is_empty() {
        return Err(ClientError::Configuration(format!(
            "items.{} contains an entry without a name",
            list
        )));
    }
    if !seen.insert(canonical) {
        return Err(ClientError::Configuration(format!(
            "items.{} lists '{}' more than once",
            list, name
        )));
    }
    Ok(())
}

fn check_price(name: &str, field: &str, price: Option<Decimal>) -> Result<()> {
    match price {
        Some(value) if !is_denomination_clean(value) => Err(ClientError::Configuration(format!(
            "{} of '{}' is {} which is not a whole combination of ref, rec and scrap",
            field, name, value
        ))),
        _ => Ok(()),
    }
}

/// Steam platform configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SteamConfig {
    /// Web API key
    #[serde(default)]
    pub api_key: Option<String>,
    /// SteamID64 of the bot account
    #[serde(default)]
    pub bot_steam_id: Option<String>,
    /// `sessionid` cookie of the logged-in web session
    #[serde(default)]
    pub session_id: Option<String>,
    /// `steamLoginSecure` cookie of the logged-in web session
    #[serde(default)]
    pub login_secure: Option<String>,
    /// Base URL of the Web API
    #[serde(default = "default_steam_api_url")]
    pub api_url: String,
    /// Base URL of the community site (inventories, offer actions)
    #[serde(default = "default_steam_community_url")]
    pub community_url: String,
    /// Game whose items are traded
    #[serde(default = "default_app_id")]
    pub app_id: u32,
    /// Inventory context of the game
    #[serde(default = "default_context_id")]
    pub context_id: u32,
}

impl SteamConfig {
    pub fn has_session(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().map_or(false, |s| !s.is_empty());
        present(&self.session_id) && present(&self.login_secure)
    }
}

impl Default for SteamConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            bot_steam_id: None,
            session_id: None,
            login_secure: None,
            api_url: default_steam_api_url(),
            community_url: default_steam_community_url(),
            app_id: default_app_id(),
            context_id: default_context_id(),
        }
    }
}

fn default_steam_api_url() -> String {
    "https://api.steampowered.com".to_string()
}

fn default_steam_community_url() -> String {
    "https://steamcommunity.com".to_string()
}

fn default_app_id() -> u32 {
    440
}

fn default_context_id() -> u32 {
    2
}

/// Trade execution loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Must be true before any accept/decline is sent
    #[serde(default)]
    pub enabled: bool,
    /// Log every decision but never execute it
    #[serde(default = "default_true")]
    pub dry_run: bool,
    /// Seconds between polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Lifetime of the cached own-inventory snapshot
    #[serde(default = "default_pure_cache_ttl")]
    pub pure_cache_ttl_seconds: u64,
    /// Minimum profit for buy-shape offers, in refined
    #[serde(default = "default_min_profit")]
    pub min_profit: Decimal,
    /// Slack allowed when comparing offered and required value
    #[serde(default = "default_sell_tolerance")]
    pub sell_tolerance: Decimal,
    /// Re-read our inventory to confirm given assets still exist
    #[serde(default = "default_true")]
    pub verify_given_assets: bool,
    /// Partners that bypass policy while the trusted toggle is on
    #[serde(default)]
    pub trusted_partners: Vec<String>,
    /// Initial state of the trusted toggle
    #[serde(default)]
    pub trusted_accept_enabled: bool,
    /// How long a stop waits for an in-flight poll
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_seconds: u64,
    /// Attempts per accept/decline call
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Base of the linear retry delay
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,
    /// Ignore offers older than this
    #[serde(default = "default_historical_cutoff")]
    pub historical_cutoff_seconds: u64,
}

impl TradingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn pure_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.pure_cache_ttl_seconds)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_seconds)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dry_run: true,
            poll_interval_seconds: default_poll_interval(),
            pure_cache_ttl_seconds: default_pure_cache_ttl(),
            min_profit: default_min_profit(),
            sell_tolerance: default_sell_tolerance(),
            verify_given_assets: true,
            trusted_partners: Vec::new(),
            trusted_accept_enabled: false,
            stop_timeout_seconds: default_stop_timeout(),
            retry_attempts: default_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay(),
            historical_cutoff_seconds: default_historical_cutoff(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    30
}

fn default_pure_cache_ttl() -> u64 {
    60
}

fn default_min_profit() -> Decimal {
    dec!(0.11)
}

fn default_sell_tolerance() -> Decimal {
    dec!(0.02)
}

fn default_stop_timeout() -> u64 {
    10
}

fn default_retry_attempts() -> u32 {
    4
}

fn default_retry_base_delay() -> u64 {
    1500
}

fn default_historical_cutoff() -> u64 {
    2 * 24 * 60 * 60
}

/// Pricing pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Item whose price is the floating key rate
    #[serde(default = "default_key_item")]
    pub key_item_name: String,
    /// Seconds between pricing cycles
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u64,
    /// Scraper output read by the file listing source
    #[serde(default = "default_listings_file")]
    pub listings_file: String,
}

impl PricingConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_seconds)
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            key_item_name: default_key_item(),
            refresh_interval_seconds: default_refresh_interval(),
            listings_file: default_listings_file(),
        }
    }
}

fn default_key_item() -> String {
    KEY_NAME.to_string()
}

fn default_refresh_interval() -> u64 {
    30 * 60
}

fn default_listings_file() -> String {
    "listings.json".to_string()
}

/// Items the bot buys and sells
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemsConfig {
    #[serde(default)]
    pub buy: Vec<BuyItemConfig>,
    #[serde(default)]
    pub sell: Vec<SellItemConfig>,
}

impl ItemsConfig {
    pub fn buy_entry(&self, name: &str) -> Option<&BuyItemConfig> {
        let canonical = canonical_item_name(name);
        self.buy
            .iter()
            .find(|item| canonical_item_name(&item.name) == canonical)
    }

    pub fn sell_entry(&self, name: &str) -> Option<&SellItemConfig> {
        let canonical = canonical_item_name(name);
        self.sell
            .iter()
            .find(|item| canonical_item_name(&item.name) == canonical)
    }

    /// Every distinct item name across both lists, in config order
    pub fn tracked_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.buy
            .iter()
            .map(|item| &item.name)
            .chain(self.sell.iter().map(|item| &item.name))
            .filter(|name| seen.insert(canonical_item_name(name)))
            .cloned()
            .collect()
    }
}

/// An item the bot accepts in buy-shape offers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyItemConfig {
    pub name: String,
    /// Stock cap: held plus incoming may not exceed this
    pub max_stock: u32,
    /// Advertised buy price, in refined
    #[serde(default)]
    pub buy_price: Decimal,
}

/// An item the bot gives away in sell-shape offers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellItemConfig {
    pub name: String,
    #[serde(default)]
    pub max_stock: u32,
    /// Advertised sell price, in refined
    #[serde(default)]
    pub sell_price: Decimal,
    /// Per-unit floor applied on top of the estimated sell price
    #[serde(default)]
    pub min_sell_price: Option<Decimal>,
}

/// Chat command configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatConfig {
    /// SteamID64s allowed to run operator commands
    #[serde(default)]
    pub operators: Vec<String>,
    /// Profile link shown by `!owner`
    #[serde(default)]
    pub owner_profile_url: Option<String>,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout() -> u64 {
    30
}
