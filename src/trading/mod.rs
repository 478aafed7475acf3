//! Trade offer policy engine and execution loop
//!
//! ```text
//! pending offers ──► OfferSummarizer ──► OfferPolicyEngine ──► OfferExecutor
//!                                           │        ▲
//!                                           ▼        │
//!                                     PriceStore  InventoryCache
//! ```
//!
//! - [`OfferSummarizer`]: asset lists to name/quantity tallies
//! - [`OfferPolicyEngine`]: accept/decline/hold with a reason
//! - [`InventoryCache`]: TTL-cached own holdings
//! - [`OfferExecutor`]: retrying, idempotent accept/decline
//! - [`TradePoller`]: the interval loop tying them together

pub mod executor;
pub mod inventory;
pub mod policy;
pub mod poller;
pub mod summary;
pub mod types;

pub use executor::{OfferAction, OfferExecutor, RetryPolicy};
pub use inventory::{InventoryCache, InventorySnapshot};
pub use policy::{classify, OfferPolicyEngine, PolicySettings, TrustedPartners};
pub use poller::{PollerSettings, TradeLoopHandle, TradePoller};
pub use summary::{ItemTally, OfferSummarizer, OfferSummary};
pub use types::{
    ExecutionStatus, OfferDecision, OfferOutcome, OfferShape, PollAttempt, PollReport, Verdict,
};
