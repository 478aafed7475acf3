//! Trade execution loop
//!
//! A fixed-interval ticker starts polls. A poll lists pending offers and,
//! for each one in order, summarizes it, asks the policy engine and executes
//! the verdict. At most one poll runs at a time: a tick that finds a poll in
//! flight is skipped, not queued.
//!
//! Stopping cancels the token. No new polls start, and a running poll
//! finishes the offer it is on before returning.

use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::common::traits::TradingPlatform;
use crate::common::types::{DescriptionTable, TradeProposal};
use crate::config::types::TradingConfig;

use super::executor::{OfferAction, OfferExecutor};
use super::inventory::InventoryCache;
use super::policy::OfferPolicyEngine;
use super::summary::OfferSummarizer;
use super::types::{ExecutionStatus, OfferDecision, OfferOutcome, PollAttempt, PollReport, Verdict};

/// Execution switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerSettings {
    /// Remote writes are only attempted when true
    pub trading_enabled: bool,
    /// Log decisions without executing them
    pub dry_run: bool,
}

impl From<&TradingConfig> for PollerSettings {
    fn from(config: &TradingConfig) -> Self {
        Self {
            trading_enabled: config.enabled,
            dry_run: config.dry_run,
        }
    }
}

/// Releases the in-flight flag when the poll ends, however it ends
struct PollGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> PollGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for PollGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct TradePoller {
    platform: Arc<dyn TradingPlatform>,
    summarizer: OfferSummarizer,
    policy: Arc<OfferPolicyEngine>,
    executor: OfferExecutor,
    inventory: Arc<InventoryCache>,
    outcomes: Option<mpsc::Sender<OfferOutcome>>,
    settings: PollerSettings,
    in_flight: AtomicBool,
    polls_executed: AtomicU64,
    ticks_skipped: AtomicU64,
}

impl TradePoller {
    pub fn new(
        platform: Arc<dyn TradingPlatform>,
        summarizer: OfferSummarizer,
        policy: Arc<OfferPolicyEngine>,
        executor: OfferExecutor,
        inventory: Arc<InventoryCache>,
        settings: PollerSettings,
    ) -> Self {
        Self {
            platform,
            summarizer,
            policy,
            executor,
            inventory,
            outcomes: None,
            settings,
            in_flight: AtomicBool::new(false),
            polls_executed: AtomicU64::new(0),
            ticks_skipped: AtomicU64::new(0),
        }
    }

    /// Publish an [`OfferOutcome`] for every evaluated offer
    pub fn with_outcomes(mut self, sender: mpsc::Sender<OfferOutcome>) -> Self {
        self.outcomes = Some(sender);
        self
    }

    pub fn policy(&self) -> &Arc<OfferPolicyEngine> {
        &self.policy
    }

    /// Number of polls that actually ran
    pub fn polls_executed(&self) -> u64 {
        self.polls_executed.load(Ordering::SeqCst)
    }

    /// Number of polls skipped because one was already running
    pub fn ticks_skipped(&self) -> u64 {
        self.ticks_skipped.load(Ordering::SeqCst)
    }

    pub fn is_polling(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Run one poll unless another is in flight
    ///
    /// # Arguments
    /// * `token` - Checked between offers; once cancelled no further offer is started
    pub async fn poll_once(&self, token: &CancellationToken) -> PollAttempt {
        let Some(_guard) = PollGuard::try_acquire(&self.in_flight) else {
            self.ticks_skipped.fetch_add(1, Ordering::SeqCst);
            debug!("Poll already in flight, skipping tick");
            return PollAttempt::Skipped;
        };
        self.polls_executed.fetch_add(1, Ordering::SeqCst);

        let mut report = PollReport::default();
        let batch = match self.platform.pending_offers().await {
            Ok(batch) => batch,
            Err(e) if e.is_authentication() => {
                error!(error = %e, "Listing offers failed: authentication");
                report.fetch_failed = true;
                return PollAttempt::Ran(report);
            }
            Err(e) => {
                warn!(error = %e, "Listing offers failed");
                report.fetch_failed = true;
                return PollAttempt::Ran(report);
            }
        };

        for offer in batch.offers.iter().filter(|o| o.state.is_pollable()) {
            if token.is_cancelled() {
                info!("Stop requested, leaving remaining offers for later");
                report.interrupted = true;
                break;
            }
            report.offers_seen += 1;
            self.process_offer(offer, &batch.descriptions, &mut report).await;
        }

        debug!(
            offers = report.offers_seen,
            accepted = report.accepted,
            declined = report.declined,
            held = report.held,
            failed = report.failed,
            "Poll finished"
        );
        PollAttempt::Ran(report)
    }

    #[instrument(skip(self, offer, descriptions, report), fields(offer_id = %offer.offer_id, partner = %offer.partner))]
    async fn process_offer(&self, offer: &TradeProposal, descriptions: &DescriptionTable, report: &mut PollReport) {
        let summary = self.summarizer.summarize(offer, descriptions);
        let decision = self.policy.evaluate(offer, &summary).await;
        info!(verdict = %decision.verdict, reason = %decision.reason, profit = %decision.profit_value, "Offer evaluated");

        let execution = self.execute(offer, &decision).await;

        match (&decision.verdict, &execution) {
            (_, ExecutionStatus::Failed(_)) => report.failed += 1,
            (Verdict::Accept, _) => report.accepted += 1,
            (Verdict::Decline, _) => report.declined += 1,
            (Verdict::Hold, _) => report.held += 1,
        }

        self.publish(OfferOutcome {
            offer_id: offer.offer_id.clone(),
            partner: offer.partner.clone(),
            decision,
            execution,
            evaluated_at: Utc::now(),
        });
    }

    async fn execute(&self, offer: &TradeProposal, decision: &OfferDecision) -> ExecutionStatus {
        let Some(action) = OfferAction::for_verdict(decision.verdict) else {
            return ExecutionStatus::Skipped;
        };
        if self.settings.dry_run {
            info!(?action, "Dry run, not executing");
            return ExecutionStatus::DryRun;
        }
        if !self.settings.trading_enabled {
            warn!(?action, "Trading disabled, not executing");
            return ExecutionStatus::TradingDisabled;
        }

        match self
            .executor
            .execute(action, &offer.offer_id, &offer.partner)
            .await
        {
            Ok(status) => {
                if action == OfferAction::Accept {
                    self.inventory.invalidate().await;
                }
                status
            }
            Err(e) => ExecutionStatus::Failed(e.to_string()),
        }
    }

    fn publish(&self, outcome: OfferOutcome) {
        let Some(sender) = &self.outcomes else {
            return;
        };
        if let Err(e) = sender.try_send(outcome) {
            warn!(error = %e, "Dropping offer outcome");
        }
    }

    /// Start the ticker on a background task
    pub fn spawn(self: Arc<Self>, every: Duration, token: CancellationToken) -> TradeLoopHandle {
        let loop_token = token.clone();
        let handle = tokio::spawn(async move { self.run(every, loop_token).await });
        TradeLoopHandle { token, handle }
    }

    /// Tick until cancelled, then wait for any poll still running
    pub async fn run(self: Arc<Self>, every: Duration, token: CancellationToken) {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut polls = JoinSet::new();

        info!(interval = ?every, "Trade loop started");
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                Some(joined) = polls.join_next(), if !polls.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Poll task failed");
                    }
                }
                _ = ticker.tick() => {
                    let poller = self.clone();
                    let poll_token = token.clone();
                    polls.spawn(async move { poller.poll_once(&poll_token).await });
                }
            }
        }

        while let Some(joined) = polls.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Poll task failed");
            }
        }
        info!(polls = self.polls_executed(), "Trade loop stopped");
    }
}

/// Handle to a running trade loop
pub struct TradeLoopHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl TradeLoopHandle {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Request a stop and wait up to `timeout`
    ///
    /// Returns false when the loop had to be aborted.
    pub async fn stop(mut self, timeout: Duration) -> bool {
        self.token.cancel();
        match tokio::time::timeout(timeout, &mut self.handle).await {
            Ok(_) => true,
            Err(_) => {
                warn!(?timeout, "Trade loop did not stop in time, aborting");
                self.handle.abort();
                false
            }
        }
    }
}
