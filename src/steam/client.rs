//! Steam trading client implementing the TradingPlatform trait

use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tracing::{info, instrument};

use super::auth::CommunitySession;
use super::messages::{account_id_to_steam_id64, AssetDto, DescriptionDto, InventoryResponse, TradeOffersResponse};
use super::rest::SteamRestClient;
use crate::common::errors::{ClientError, Result};
use crate::common::traits::TradingPlatform;
use crate::common::types::{Asset, DescriptionTable, InventoryListing, OfferBatch, OfferState, TradeProposal};
use crate::config::types::{SteamConfig, TradingConfig};

/// Steam client combining REST access with conversion to domain types
pub struct SteamTradingClient {
    /// REST client for API calls
    rest: SteamRestClient,
    /// SteamID64 of the bot account
    bot_steam_id: String,
    app_id: u32,
    context_id: u32,
}

impl SteamTradingClient {
    /// Build from configuration
    pub fn new(steam: &SteamConfig, trading: &TradingConfig, request_timeout: Duration) -> Result<Self> {
        let bot_steam_id = steam
            .bot_steam_id
            .clone()
            .ok_or_else(|| ClientError::Configuration("steam.bot_steam_id is required".into()))?;

        let mut rest = SteamRestClient::with_timeout(&steam.api_url, &steam.community_url, request_timeout)?
            .with_historical_cutoff(Duration::from_secs(trading.historical_cutoff_seconds));
        if let Some(key) = &steam.api_key {
            rest = rest.with_api_key(key.clone());
        }
        if let Some(session) = CommunitySession::from_config(steam) {
            info!(session = %session.fingerprint(), "Using community web session");
            rest = rest.with_session(session);
        }

        Ok(Self::from_rest(rest, bot_steam_id, steam.app_id, steam.context_id))
    }

    pub fn from_rest(rest: SteamRestClient, bot_steam_id: impl Into<String>, app_id: u32, context_id: u32) -> Self {
        Self {
            rest,
            bot_steam_id: bot_steam_id.into(),
            app_id,
            context_id,
        }
    }

    /// Get a reference to the REST client
    pub fn rest(&self) -> &SteamRestClient {
        &self.rest
    }

    pub fn bot_steam_id(&self) -> &str {
        &self.bot_steam_id
    }

    async fn inventory_of(&self, steam_id: &str) -> Result<InventoryListing> {
        let response = self
            .rest
            .get_inventory(steam_id, self.app_id, self.context_id)
            .await?;
        Ok(convert_inventory(response))
    }
}

#[async_trait]
impl TradingPlatform for SteamTradingClient {
    #[instrument(skip(self))]
    async fn pending_offers(&self) -> Result<OfferBatch> {
        let response = self.rest.get_trade_offers().await?;
        Ok(convert_offers(response))
    }

    async fn own_inventory(&self) -> Result<InventoryListing> {
        self.inventory_of(&self.bot_steam_id).await
    }

    async fn partner_inventory(&self, partner: &str) -> Result<InventoryListing> {
        self.inventory_of(partner).await
    }

    async fn accept_offer(&self, offer_id: &str, partner: &str) -> Result<()> {
        self.rest.accept_offer(offer_id, partner).await.map(|_| ())
    }

    async fn decline_offer(&self, offer_id: &str) -> Result<()> {
        self.rest.decline_offer(offer_id).await
    }

    fn platform_name(&self) -> &'static str {
        "Steam"
    }
}

/// Convert a GetTradeOffers response into domain proposals
pub fn convert_offers(response: TradeOffersResponse) -> OfferBatch {
    let descriptions = convert_descriptions(&response.descriptions);
    let offers = response
        .trade_offers_received
        .into_iter()
        .map(|offer| TradeProposal {
            partner: account_id_to_steam_id64(offer.accountid_other),
            state: OfferState::from_code(offer.trade_offer_state),
            items_to_receive: offer.items_to_receive.into_iter().map(convert_asset).collect(),
            items_to_give: offer.items_to_give.into_iter().map(convert_asset).collect(),
            offer_id: offer.tradeofferid,
        })
        .collect();

    OfferBatch {
        offers,
        descriptions,
    }
}

/// Convert a community inventory response
pub fn convert_inventory(response: InventoryResponse) -> InventoryListing {
    InventoryListing {
        descriptions: convert_descriptions(&response.descriptions),
        assets: response.assets.into_iter().map(convert_asset).collect(),
        fetched_at: Some(Utc::now()),
    }
}

fn convert_asset(asset: AssetDto) -> Asset {
    Asset {
        app_id: asset.appid,
        asset_id: asset.assetid,
        class_id: asset.classid,
        instance_id: asset.instanceid,
        amount: asset.amount,
    }
}

fn convert_descriptions(descriptions: &[DescriptionDto]) -> DescriptionTable {
    let mut table = DescriptionTable::new();
    for description in descriptions {
        table.insert(
            description.classid.clone(),
            description.instanceid.clone(),
            description.display_name(),
        );
    }
    table
}
