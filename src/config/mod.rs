//! Application configuration: types, defaults, loading and validation

pub mod loader;
pub mod types;

pub use loader::{load_config, load_validated};
pub use types::{
    AppConfig, AppSettings, BuyItemConfig, ChatConfig, ItemsConfig, PricingConfig,
    SellItemConfig, SteamConfig, TradingConfig,
};
