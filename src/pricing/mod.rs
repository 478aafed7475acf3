//! Price estimation engine
//!
//! Turns scraped marketplace listings into buy/sell estimates:
//! - Currency codec between refined-metal values and pure items
//! - Free-text listing price parser
//! - Anchored, frequency-biased estimator
//! - Concurrent price store
//! - Pipeline that drives the above on an interval

pub mod currency;
pub mod estimator;
pub mod parser;
pub mod pipeline;
pub mod source;
pub mod store;

pub use currency::{
    is_denomination_clean, to_denominations, to_scalar, Denominations, PureKind, KEY_NAME,
};
pub use estimator::{EstimatorConfig, PriceEstimator};
pub use parser::{parse_listing_price, ListingPriceParser};
pub use pipeline::{CycleReport, PricingPipeline, RefreshOutcome};
pub use source::FileListingSource;
pub use store::{PriceEntry, PriceStore};
