//! Steam wire types
//!
//! Field names follow the Web API and community JSON. Steam is inconsistent
//! about numbers versus strings, so numeric ids accept either.

use serde::{Deserialize, Deserializer, Serialize};

/// Offset between a 32-bit account id and a SteamID64
pub const STEAM_ID64_BASE: u64 = 76_561_197_960_265_728;

/// SteamID64 for an account id
pub fn account_id_to_steam_id64(account_id: u32) -> String {
    (STEAM_ID64_BASE + u64::from(account_id)).to_string()
}

/// Account id for a SteamID64, if it is one
pub fn steam_id64_to_account_id(steam_id64: &str) -> Option<u32> {
    let id: u64 = steam_id64.trim().parse().ok()?;
    id.checked_sub(STEAM_ID64_BASE)
        .and_then(|account| u32::try_from(account).ok())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    Text(String),
}

fn flexible_u32<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => u32::try_from(n).map_err(serde::de::Error::custom),
        NumberOrString::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn default_amount() -> u32 {
    1
}

// ============================================================================
// IEconService/GetTradeOffers
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTradeOffersEnvelope {
    #[serde(default)]
    pub response: Option<TradeOffersResponse>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeOffersResponse {
    #[serde(default)]
    pub trade_offers_received: Vec<TradeOfferDto>,
    #[serde(default)]
    pub descriptions: Vec<DescriptionDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeOfferDto {
    pub tradeofferid: String,
    pub accountid_other: u32,
    pub trade_offer_state: i32,
    #[serde(default)]
    pub items_to_receive: Vec<AssetDto>,
    #[serde(default)]
    pub items_to_give: Vec<AssetDto>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub time_created: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetDto {
    #[serde(deserialize_with = "flexible_u32")]
    pub appid: u32,
    #[serde(default)]
    pub contextid: String,
    pub assetid: String,
    pub classid: String,
    #[serde(default)]
    pub instanceid: String,
    #[serde(default = "default_amount", deserialize_with = "flexible_u32")]
    pub amount: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptionDto {
    pub classid: String,
    #[serde(default)]
    pub instanceid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub market_hash_name: String,
}

impl DescriptionDto {
    /// Display name, falling back to the market hash name
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.market_hash_name
        } else {
            &self.name
        }
    }
}

// ============================================================================
// Community inventory
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryResponse {
    #[serde(default)]
    pub assets: Vec<AssetDto>,
    #[serde(default)]
    pub descriptions: Vec<DescriptionDto>,
    #[serde(default)]
    pub more_items: Option<u8>,
    #[serde(default)]
    pub last_assetid: Option<String>,
    #[serde(default)]
    pub total_inventory_count: Option<u32>,
    #[serde(default)]
    pub success: Option<u8>,
}

// ============================================================================
// Offer actions
// ============================================================================

/// Body of the community accept endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcceptOfferResponse {
    #[serde(default)]
    pub tradeid: Option<String>,
    #[serde(default)]
    pub needs_mobile_confirmation: Option<bool>,
    #[serde(default)]
    pub needs_email_confirmation: Option<bool>,
    #[serde(default, rename = "strError")]
    pub str_error: Option<String>,
}

/// Form fields posted to the community accept endpoint
#[derive(Debug, Clone, Serialize)]
pub struct AcceptOfferForm<'a> {
    pub sessionid: &'a str,
    pub serverid: &'a str,
    pub tradeofferid: &'a str,
    pub partner: &'a str,
    pub captcha: &'a str,
}
