//! ClassifiedsTrader Library
//!
//! Price estimation from marketplace listings and an automated trade offer
//! policy engine for Steam item trading.

pub mod chat;
pub mod common;
pub mod config;
pub mod pricing;
pub mod steam;
pub mod trading;

// Re-export commonly used types
pub use common::errors::{ClientError, Result};
pub use common::traits::{ListingSource, MessageHandler, TradingPlatform};
pub use common::types::{
    canonical_item_name, Asset, DescriptionTable, InventoryListing, Listing, OfferBatch, OfferState,
    PriceEstimate, PureSnapshot, Side, TradeProposal,
};
pub use config::types::AppConfig;
pub use steam::{SteamRestClient, SteamTradingClient};

// Engine types
pub use chat::CommandService;
pub use pricing::{
    Denominations, FileListingSource, ListingPriceParser, PriceEstimator, PriceStore, PricingPipeline,
    PureKind,
};
pub use trading::{
    InventoryCache, OfferDecision, OfferExecutor, OfferOutcome, OfferPolicyEngine, OfferSummarizer,
    OfferSummary, PolicySettings, RetryPolicy, TradeLoopHandle, TradePoller, TrustedPartners, Verdict,
};
