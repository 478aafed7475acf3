//! Integration tests for the Steam REST client
//!
//! Every endpoint is served by a local wiremock server, so these tests make
//! no real network calls and need no credentials.

mod common;

use classifieds_trader::common::types::OfferState;
use classifieds_trader::steam::client::{convert_inventory, convert_offers};
use classifieds_trader::steam::{CommunitySession, SteamRestClient, SteamTradingClient};
use classifieds_trader::trading::InventorySnapshot;
use classifieds_trader::{ClientError, TradingPlatform};
use common::api_responses;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-api-key";
const BOT_ID: &str = "76561198000000000";

/// Helper function to create a test client against the mock server
fn create_test_client(server: &MockServer) -> SteamRestClient {
    let session = CommunitySession::new("sessionvalue", "76561198000000000%7C%7Ctoken")
        .expect("Failed to create session");
    SteamRestClient::with_timeout(&server.uri(), &server.uri(), Duration::from_secs(5))
        .expect("Failed to create REST client")
        .with_api_key(API_KEY)
        .with_session(session)
}

fn json(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "application/json")
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn test_get_trade_offers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/IEconService/GetTradeOffers/v1/"))
        .and(query_param("key", API_KEY))
        .and(query_param("get_received_offers", "1"))
        .and(query_param("active_only", "1"))
        .and(query_param("get_descriptions", "1"))
        .respond_with(json(api_responses::TRADE_OFFERS))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let response = assert_ok!(client.get_trade_offers().await);
    assert_eq!(response.trade_offers_received.len(), 2);
    assert_eq!(response.descriptions.len(), 3);

    let batch = convert_offers(response);
    let first = &batch.offers[0];
    assert_eq!(first.offer_id, "6000000001");
    assert_eq!(first.partner, "76561197999806375");
    assert_eq!(first.state, OfferState::Active);
    assert_eq!(first.items_to_receive[1].amount, 6);
    assert_eq!(
        batch.descriptions.name_for(&first.items_to_give[0]),
        Some("The Team Captain")
    );
    assert_eq!(batch.offers[1].state, OfferState::NeedsConfirmation);
}

#[tokio::test]
async fn test_get_trade_offers_empty_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/IEconService/GetTradeOffers/v1/"))
        .respond_with(json(r#"{"response": {}}"#))
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let response = assert_ok!(client.get_trade_offers().await);
    assert!(response.trade_offers_received.is_empty());
}

#[tokio::test]
async fn test_get_inventory() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/inventory/{}/440/2", BOT_ID)))
        .and(query_param("l", "english"))
        .and(header("cookie", "sessionid=sessionvalue; steamLoginSecure=76561198000000000%7C%7Ctoken"))
        .respond_with(json(api_responses::INVENTORY))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let response = assert_ok!(client.get_inventory(BOT_ID, 440, 2).await);
    assert_eq!(response.total_inventory_count, Some(3));

    let snapshot = InventorySnapshot::from_listing(&convert_inventory(response), 440);
    assert_eq!(snapshot.pure.keys, 1);
    assert_eq!(snapshot.pure.refined, 1);
    assert_eq!(snapshot.count_of("Team Captain"), 1);
    assert!(snapshot.contains_asset("9001"));
}

#[tokio::test]
async fn test_inventory_failure_flag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/inventory/{}/440/2", BOT_ID)))
        .respond_with(json(r#"{"success": 0}"#))
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let err = assert_err!(client.get_inventory(BOT_ID, 440, 2).await);
    assert!(matches!(err, ClientError::InvalidResponse(_)));
}

// ============================================================================
// Accept
// ============================================================================

#[tokio::test]
async fn test_accept_offer_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tradeoffer/6000000001/accept"))
        .and(body_string_contains("tradeofferid=6000000001"))
        .and(body_string_contains("sessionid=sessionvalue"))
        .and(body_string_contains("partner=76561197999806375"))
        .respond_with(json(api_responses::ACCEPT_OK))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let response = assert_ok!(client.accept_offer("6000000001", "76561197999806375").await);
    assert_eq!(response.tradeid.as_deref(), Some("4000000001"));
}

#[tokio::test]
async fn test_accept_resolved_offer_is_already_resolved() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tradeoffer/6000000001/accept"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_raw(api_responses::ACCEPT_INVALID_STATE.as_bytes().to_vec(), "application/json"),
        )
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let err = assert_err!(client.accept_offer("6000000001", "76561197999806375").await);
    assert!(matches!(err, ClientError::AlreadyResolved(_)), "{:?}", err);
}

#[tokio::test]
async fn test_accept_login_redirect_is_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tradeoffer/6000000001/accept"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "https://steamcommunity.com/login/home/"))
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let err = assert_err!(client.accept_offer("6000000001", "76561197999806375").await);
    assert!(err.is_authentication());
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_accept_server_error_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tradeoffer/6000000001/accept"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let err = assert_err!(client.accept_offer("6000000001", "76561197999806375").await);
    assert!(matches!(err, ClientError::Status { status: 503, .. }));
    assert!(err.is_retryable());
}

// ============================================================================
// Decline
// ============================================================================

#[tokio::test]
async fn test_decline_offer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/IEconService/DeclineTradeOffer/v1/"))
        .and(body_string_contains("tradeofferid=6000000001"))
        .and(body_string_contains("key=test-api-key"))
        .respond_with(json(r#"{"response": {}}"#))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    assert_ok!(client.decline_offer("6000000001").await);
}

#[tokio::test]
async fn test_decline_resolved_offer_is_already_resolved() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/IEconService/DeclineTradeOffer/v1/"))
        .respond_with(ResponseTemplate::new(500).insert_header("x-eresult", "11"))
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let err = assert_err!(client.decline_offer("6000000001").await);
    assert!(matches!(err, ClientError::AlreadyResolved(_)));
}

#[tokio::test]
async fn test_rate_limit_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/IEconService/DeclineTradeOffer/v1/"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "30"))
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let err = assert_err!(client.decline_offer("6000000001").await);
    match err {
        ClientError::RateLimit {
            retry_after_seconds, ..
        } => assert_eq!(retry_after_seconds, Some(30)),
        other => panic!("expected rate limit, got {:?}", other),
    }
}

// ============================================================================
// TradingPlatform adapter
// ============================================================================

#[tokio::test]
async fn test_trading_client_lists_offers_as_proposals() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/IEconService/GetTradeOffers/v1/"))
        .respond_with(json(api_responses::TRADE_OFFERS))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/inventory/{}/440/2", BOT_ID)))
        .respond_with(json(api_responses::INVENTORY))
        .mount(&server)
        .await;

    let client = SteamTradingClient::from_rest(create_test_client(&server), BOT_ID, 440, 2);
    let batch = assert_ok!(client.pending_offers().await);
    assert_eq!(batch.offers.len(), 2);

    let inventory = assert_ok!(client.own_inventory().await);
    assert_eq!(inventory.assets.len(), 3);
    assert!(inventory.fetched_at.is_some());
}
