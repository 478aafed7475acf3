//! Trait definitions for external collaborators

use async_trait::async_trait;

use super::errors::Result;
use super::types::{InventoryListing, Listing, OfferBatch};

/// Remote trading platform the execution loop talks to
///
/// Every method is a network call. Accept and decline must be safe to
/// repeat: an offer that is already resolved surfaces as
/// `ClientError::AlreadyResolved`, never as a hard failure.
#[async_trait]
pub trait TradingPlatform: Send + Sync {
    /// List received offers that are active or awaiting confirmation
    async fn pending_offers(&self) -> Result<OfferBatch>;

    /// Read the operator's own inventory
    async fn own_inventory(&self) -> Result<InventoryListing>;

    /// Read a counterparty's inventory (operator-initiated offers only)
    ///
    /// # Arguments
    /// * `partner` - Counterparty SteamID64
    async fn partner_inventory(&self, partner: &str) -> Result<InventoryListing>;

    /// Accept a received offer
    async fn accept_offer(&self, offer_id: &str, partner: &str) -> Result<()>;

    /// Decline a received offer
    async fn decline_offer(&self, offer_id: &str) -> Result<()>;

    /// Get the name of the platform
    fn platform_name(&self) -> &'static str;
}

/// Source of scraped marketplace listings
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch every current listing for one item
    async fn fetch_listings(&self, item_name: &str) -> Result<Vec<Listing>>;
}

/// Entry point the chat transport calls for each incoming friend message
pub trait MessageHandler: Send + Sync {
    /// Handle a message and return the reply to send, if any
    ///
    /// # Arguments
    /// * `sender` - SteamID64 of the sender
    /// * `text` - Raw message text
    fn on_friend_message(&self, sender: &str, text: &str) -> Option<String>;

    /// Greeting sent after a new friend is added
    fn welcome_message(&self) -> String;
}
