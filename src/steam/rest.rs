//! REST client for the Steam Web API and community endpoints

use chrono::Utc;
use reqwest::header::{COOKIE, REFERER};
use reqwest::{redirect, Client, Response};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::auth::CommunitySession;
use super::messages::*;
use crate::common::errors::{ClientError, Result};

/// Steam error code for an offer that is no longer in an actionable state
const INVALID_STATE_ERESULT: &str = "11";

/// REST client for Steam trade offers and inventories
#[derive(Debug, Clone)]
pub struct SteamRestClient {
    /// HTTP client (redirects disabled so login redirects surface)
    client: Client,
    /// Base URL of the Web API
    api_url: String,
    /// Base URL of the community site
    community_url: String,
    /// Web API key, required for offer listing and declines
    api_key: Option<String>,
    /// Web session, required for accepts
    session: Option<CommunitySession>,
    /// How far back offer listings reach
    historical_cutoff: Duration,
}

impl SteamRestClient {
    /// Create a new REST client (unauthenticated)
    pub fn new(api_url: &str, community_url: &str) -> Result<Self> {
        Self::with_timeout(api_url, community_url, Duration::from_secs(30))
    }

    /// Create a new REST client with custom timeout
    pub fn with_timeout(api_url: &str, community_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| ClientError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            community_url: community_url.trim_end_matches('/').to_string(),
            api_key: None,
            session: None,
            historical_cutoff: Duration::from_secs(2 * 24 * 60 * 60),
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_session(mut self, session: CommunitySession) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_historical_cutoff(mut self, cutoff: Duration) -> Self {
        self.historical_cutoff = cutoff;
        self
    }

    pub fn session(&self) -> Option<&CommunitySession> {
        self.session.as_ref()
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ClientError::Configuration("Steam API key is not configured".into()))
    }

    fn require_session(&self) -> Result<&CommunitySession> {
        self.session
            .as_ref()
            .ok_or_else(|| ClientError::Authentication("no web session configured".into()))
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// List received offers that are still active
    #[instrument(skip(self))]
    pub async fn get_trade_offers(&self) -> Result<TradeOffersResponse> {
        let url = format!("{}/IEconService/GetTradeOffers/v1/", self.api_url);
        let cutoff = Utc::now().timestamp() - self.historical_cutoff.as_secs() as i64;
        let cutoff = cutoff.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("key", self.api_key()?),
                ("get_received_offers", "1"),
                ("active_only", "1"),
                ("get_descriptions", "1"),
                ("language", "en_us"),
                ("time_historical_cutoff", cutoff.as_str()),
            ])
            .send()
            .await?;

        let response = check_status(response).await?;
        let envelope: GetTradeOffersEnvelope = response.json().await?;
        let offers = envelope.response.unwrap_or_default();
        debug!(
            offers = offers.trade_offers_received.len(),
            descriptions = offers.descriptions.len(),
            "Fetched trade offers"
        );
        Ok(offers)
    }

    /// Read a public inventory
    ///
    /// # Arguments
    /// * `steam_id` - SteamID64 of the inventory owner
    /// * `app_id` - Game id (440 for TF2)
    /// * `context_id` - Inventory context (2 for TF2)
    #[instrument(skip(self))]
    pub async fn get_inventory(&self, steam_id: &str, app_id: u32, context_id: u32) -> Result<InventoryResponse> {
        let url = format!(
            "{}/inventory/{}/{}/{}",
            self.community_url, steam_id, app_id, context_id
        );

        let mut request = self
            .client
            .get(&url)
            .query(&[("l", "english"), ("count", "5000")]);
        if let Some(session) = &self.session {
            request = request.header(COOKIE, session.cookie_header());
        }

        let response = check_status(request.send().await?).await?;
        let inventory: InventoryResponse = response.json().await?;
        if inventory.success == Some(0) {
            return Err(ClientError::InvalidResponse(
                "inventory request reported failure".into(),
            ));
        }
        debug!(assets = inventory.assets.len(), "Fetched inventory");
        Ok(inventory)
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Accept a received offer through the community site
    #[instrument(skip(self))]
    pub async fn accept_offer(&self, offer_id: &str, partner_steam_id: &str) -> Result<AcceptOfferResponse> {
        let session = self.require_session()?;
        let url = format!("{}/tradeoffer/{}/accept", self.community_url, offer_id);
        let referer = format!("{}/tradeoffer/{}/", self.community_url, offer_id);

        let form = AcceptOfferForm {
            sessionid: session.session_id(),
            serverid: "1",
            tradeofferid: offer_id,
            partner: partner_steam_id,
            captcha: "",
        };

        debug!(session = %session.fingerprint(), "Accepting offer");
        let response = self
            .client
            .post(&url)
            .header(REFERER, referer)
            .header(COOKIE, session.cookie_header())
            .form(&form)
            .send()
            .await?;

        if response.status().is_redirection() {
            return Err(login_redirect());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed: AcceptOfferResponse = serde_json::from_str(&body).unwrap_or_default();

        if let Some(message) = parsed.str_error.as_deref() {
            if message.contains(&format!("({})", INVALID_STATE_ERESULT)) {
                return Err(ClientError::AlreadyResolved(message.to_string()));
            }
            if status.is_success() {
                return Err(ClientError::InvalidResponse(message.to_string()));
            }
        }

        if !status.is_success() {
            return Err(ClientError::from_status(status.as_u16(), body));
        }

        if parsed.needs_mobile_confirmation == Some(true) {
            warn!("Accepted offer needs mobile confirmation");
        }
        Ok(parsed)
    }

    /// Decline a received offer through the Web API
    #[instrument(skip(self))]
    pub async fn decline_offer(&self, offer_id: &str) -> Result<()> {
        let url = format!("{}/IEconService/DeclineTradeOffer/v1/", self.api_url);
        let response = self
            .client
            .post(&url)
            .form(&[("key", self.api_key()?), ("tradeofferid", offer_id)])
            .send()
            .await?;

        let eresult = response
            .headers()
            .get("x-eresult")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if eresult.as_deref() == Some(INVALID_STATE_ERESULT) {
            return Err(ClientError::AlreadyResolved(format!(
                "offer {} is not active",
                offer_id
            )));
        }

        check_status(response).await?;
        Ok(())
    }
}

fn login_redirect() -> ClientError {
    ClientError::Authentication("redirected to login, session expired".into())
}

/// Map non-success responses onto the error taxonomy
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status.is_redirection() {
        return Err(login_redirect());
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();

    match ClientError::from_status(status.as_u16(), body) {
        ClientError::RateLimit { message, .. } => Err(ClientError::RateLimit {
            message,
            retry_after_seconds: retry_after,
        }),
        other => Err(other),
    }
}
