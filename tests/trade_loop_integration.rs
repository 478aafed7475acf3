//! Integration tests for the trade execution loop
//!
//! The poller is wired exactly as the binary wires it, with an in-memory
//! platform standing in for Steam.

mod common;

use classifieds_trader::common::channels::create_outcome_channel;
use classifieds_trader::trading::{ExecutionStatus, PollAttempt, PollReport, TradePoller, Verdict};
use classifieds_trader::config::TradingConfig;
use classifieds_trader::{ClientError, OfferState, TradeProposal};
use common::{asset, build_poller, buy_offer, classes, live_trading, sell_offer, FakePlatform, TRUSTED_PARTNER};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn setup(offers: Vec<TradeProposal>, trading: &TradingConfig) -> (Arc<FakePlatform>, TradePoller) {
    let platform = Arc::new(FakePlatform::new(offers));
    let poller = build_poller(platform.clone(), trading);
    (platform, poller)
}

async fn poll(poller: &TradePoller) -> PollReport {
    match poller.poll_once(&CancellationToken::new()).await {
        PollAttempt::Ran(report) => report,
        PollAttempt::Skipped => panic!("poll was skipped"),
    }
}

// ============================================================================
// Decisions end to end
// ============================================================================

#[tokio::test]
async fn test_fair_sell_offer_is_accepted() {
    let (platform, poller) = setup(vec![sell_offer("1", 1, 6)], &live_trading());

    let report = poll(&poller).await;

    assert_eq!(report.offers_seen, 1);
    assert_eq!(report.accepted, 1);
    assert_eq!(platform.accepted(), vec!["1".to_string()]);
    assert_eq!(platform.decline_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_underpaying_sell_offer_is_declined() {
    let (platform, poller) = setup(vec![sell_offer("2", 0, 50)], &live_trading());
    let (sender, mut receiver) = create_outcome_channel();
    let poller = poller.with_outcomes(sender);

    let report = poll(&poller).await;

    assert_eq!(report.declined, 1);
    assert_eq!(platform.declined(), vec!["2".to_string()]);

    let outcome = receiver.try_recv().expect("outcome published");
    assert_eq!(outcome.decision.verdict, Verdict::Decline);
    assert!(
        outcome.decision.reason.contains("less than required"),
        "{}",
        outcome.decision.reason
    );
    assert_eq!(outcome.execution, ExecutionStatus::Executed);
    assert!(outcome.partner_message().starts_with("Your offer was declined"));
}

#[tokio::test]
async fn test_profitable_buy_offer_is_accepted() {
    let (platform, poller) = setup(vec![buy_offer("3")], &live_trading());

    let report = poll(&poller).await;

    assert_eq!(report.accepted, 1, "{:?}", report);
    assert_eq!(platform.accepted(), vec!["3".to_string()]);
}

#[tokio::test]
async fn test_accept_invalidates_inventory_cache() {
    let (platform, poller) = setup(vec![buy_offer("4"), buy_offer("5")], &live_trading());

    let report = poll(&poller).await;

    assert_eq!(report.accepted, 2);
    // second offer re-reads inventory after the first accept
    assert_eq!(platform.inventory_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_offer_taking_items_from_other_games_is_declined() {
    let mut offer = sell_offer("16", 1, 6);
    let mut foreign = asset("7300001", classes::TEAM_CAPTAIN, 1);
    foreign.app_id = 730;
    offer.items_to_give.push(foreign);
    let (platform, poller) = setup(vec![offer], &live_trading());
    let (sender, mut receiver) = create_outcome_channel();
    let poller = poller.with_outcomes(sender);

    let report = poll(&poller).await;

    assert_eq!(report.declined, 1);
    assert_eq!(platform.declined(), vec!["16".to_string()]);
    let outcome = receiver.try_recv().expect("outcome published");
    assert!(
        outcome.decision.reason.contains("7300001"),
        "{}",
        outcome.decision.reason
    );
}

#[tokio::test]
async fn test_confirmation_pending_offer_is_never_touched() {
    let mut offer = sell_offer("6", 1, 6);
    offer.state = OfferState::NeedsConfirmation;
    let (platform, poller) = setup(vec![offer], &live_trading());

    let report = poll(&poller).await;

    assert_eq!(report.held, 1);
    assert_eq!(platform.writes(), 0);
    assert_eq!(platform.inventory_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_trusted_partner_bypasses_policy_when_enabled() {
    let mut offer = sell_offer("7", 0, 1);
    offer.partner = TRUSTED_PARTNER.to_string();

    let mut trading = live_trading();
    trading.trusted_accept_enabled = true;
    let (platform, poller) = setup(vec![offer.clone()], &trading);
    assert_eq!(poll(&poller).await.accepted, 1);
    assert_eq!(platform.accepted(), vec!["7".to_string()]);

    // switched off at runtime: normal policy applies and underpayment is declined
    let (platform, poller) = setup(vec![offer], &trading);
    poller.policy().set_trusted_accept_enabled(false);
    assert_eq!(poll(&poller).await.declined, 1);
    assert_eq!(platform.declined(), vec!["7".to_string()]);
}

// ============================================================================
// Execution switches
// ============================================================================

#[tokio::test]
async fn test_dry_run_makes_no_remote_writes() {
    let mut trading = live_trading();
    trading.dry_run = true;
    let (platform, poller) = setup(vec![sell_offer("8", 1, 6), sell_offer("9", 0, 1)], &trading);
    let (sender, mut receiver) = create_outcome_channel();
    let poller = poller.with_outcomes(sender);

    let report = poll(&poller).await;

    assert_eq!(report.accepted, 1);
    assert_eq!(report.declined, 1);
    assert_eq!(platform.writes(), 0);
    for _ in 0..2 {
        let outcome = receiver.try_recv().expect("outcome published");
        assert_eq!(outcome.execution, ExecutionStatus::DryRun);
    }
}

#[tokio::test]
async fn test_trading_disabled_makes_no_remote_writes() {
    let mut trading = live_trading();
    trading.enabled = false;
    let (platform, poller) = setup(vec![sell_offer("10", 1, 6)], &trading);
    let (sender, mut receiver) = create_outcome_channel();
    let poller = poller.with_outcomes(sender);

    poll(&poller).await;

    assert_eq!(platform.writes(), 0);
    let outcome = receiver.try_recv().expect("outcome published");
    assert_eq!(outcome.execution, ExecutionStatus::TradingDisabled);
}

// ============================================================================
// Failures and retries
// ============================================================================

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let (platform, poller) = setup(vec![sell_offer("11", 1, 6)], &live_trading());
    platform.script_accepts(vec![
        Err(ClientError::from_status(503, "busy")),
        Err(ClientError::from_status(502, "bad gateway")),
    ]);

    let report = poll(&poller).await;

    assert_eq!(report.accepted, 1);
    assert_eq!(platform.accept_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_authentication_failure_is_not_retried() {
    let (platform, poller) = setup(vec![sell_offer("12", 1, 6)], &live_trading());
    platform.script_accepts(vec![Err(ClientError::Authentication("session expired".into()))]);
    let (sender, mut receiver) = create_outcome_channel();
    let poller = poller.with_outcomes(sender);

    let report = poll(&poller).await;

    assert_eq!(report.failed, 1);
    assert_eq!(platform.accept_calls.load(Ordering::SeqCst), 1);

    let outcome = receiver.try_recv().expect("outcome published");
    assert!(outcome.execution.is_failure());
    assert!(!outcome.partner_message().contains("session expired"));

    // offer stays pending and is retried on the next poll
    assert_eq!(poll(&poller).await.accepted, 1);
    assert_eq!(platform.accepted(), vec!["12".to_string()]);
}

#[tokio::test]
async fn test_already_resolved_counts_as_done() {
    let (platform, poller) = setup(vec![sell_offer("13", 0, 1)], &live_trading());
    platform.script_declines(vec![Err(ClientError::AlreadyResolved("offer 13".into()))]);
    let (sender, mut receiver) = create_outcome_channel();
    let poller = poller.with_outcomes(sender);

    let report = poll(&poller).await;

    assert_eq!(report.declined, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(platform.decline_calls.load(Ordering::SeqCst), 1);
    let outcome = receiver.try_recv().expect("outcome published");
    assert_eq!(outcome.execution, ExecutionStatus::AlreadyResolved);
}

// ============================================================================
// Loop lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_overlapping_poll_is_skipped() {
    let platform = Arc::new(FakePlatform::new(vec![]).with_listing_delay(Duration::from_secs(5)));
    let poller = build_poller(platform.clone(), &live_trading());
    let token = CancellationToken::new();

    let (first, second) = tokio::join!(poller.poll_once(&token), poller.poll_once(&token));

    assert!(matches!(first, PollAttempt::Ran(_)));
    assert_eq!(second, PollAttempt::Skipped);
    assert_eq!(poller.polls_executed(), 1);
    assert_eq!(poller.ticks_skipped(), 1);
    assert_eq!(platform.list_calls.load(Ordering::SeqCst), 1);
    assert!(!poller.is_polling());
}

#[tokio::test]
async fn test_cancelled_poll_starts_no_offer() {
    let (platform, poller) = setup(vec![sell_offer("14", 1, 6)], &live_trading());
    let token = CancellationToken::new();
    token.cancel();

    let PollAttempt::Ran(report) = poller.poll_once(&token).await else {
        panic!("poll was skipped");
    };

    assert!(report.interrupted);
    assert_eq!(report.offers_seen, 0);
    assert_eq!(platform.writes(), 0);
}

#[tokio::test]
async fn test_spawned_loop_accepts_and_stops() {
    let (platform, poller) = setup(vec![sell_offer("15", 1, 6)], &live_trading());
    let poller = Arc::new(poller);
    let handle = poller.clone().spawn(Duration::from_millis(20), CancellationToken::new());

    for _ in 0..100 {
        if !platform.accepted().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(handle.stop(Duration::from_secs(1)).await);
    assert_eq!(platform.accepted(), vec!["15".to_string()]);
    assert_eq!(platform.accept_calls.load(Ordering::SeqCst), 1);
    assert!(poller.polls_executed() >= 1);
}

#[tokio::test]
async fn test_stop_aborts_after_timeout() {
    let platform = Arc::new(FakePlatform::new(vec![]).with_listing_delay(Duration::from_secs(60)));
    let poller = Arc::new(build_poller(platform.clone(), &live_trading()));
    let handle = poller.clone().spawn(Duration::from_millis(10), CancellationToken::new());

    for _ in 0..100 {
        if poller.is_polling() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(poller.is_polling());

    assert!(!handle.stop(Duration::from_millis(100)).await);
}
