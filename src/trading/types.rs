use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;

/// Final word on an offer for this poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Accept,
    Decline,
    /// Leave the offer alone and look again next poll
    Hold,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Accept => write!(f, "ACCEPT"),
            Verdict::Decline => write!(f, "DECLINE"),
            Verdict::Hold => write!(f, "HOLD"),
        }
    }
}

/// Policy decision with the values it was based on
///
/// The reason is always set; the chat layer shows it to the partner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferDecision {
    pub verdict: Verdict,
    pub reason: String,
    pub receive_value: Decimal,
    pub give_value: Decimal,
    pub profit_value: Decimal,
}

impl OfferDecision {
    fn new(verdict: Verdict, reason: impl Into<String>) -> Self {
        Self {
            verdict,
            reason: reason.into(),
            receive_value: Decimal::ZERO,
            give_value: Decimal::ZERO,
            profit_value: Decimal::ZERO,
        }
    }

    pub fn accept(reason: impl Into<String>) -> Self {
        Self::new(Verdict::Accept, reason)
    }

    pub fn decline(reason: impl Into<String>) -> Self {
        Self::new(Verdict::Decline, reason)
    }

    pub fn hold(reason: impl Into<String>) -> Self {
        Self::new(Verdict::Hold, reason)
    }

    /// Attach the receive/give values; profit is their difference
    pub fn with_values(mut self, receive_value: Decimal, give_value: Decimal) -> Self {
        self.receive_value = receive_value;
        self.give_value = give_value;
        self.profit_value = receive_value - give_value;
        self
    }

    pub fn is_accept(&self) -> bool {
        self.verdict == Verdict::Accept
    }

    pub fn is_decline(&self) -> bool {
        self.verdict == Verdict::Decline
    }

    pub fn is_hold(&self) -> bool {
        self.verdict == Verdict::Hold
    }
}

/// Composition of an offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferShape {
    /// We give only non-pure and receive only pure
    Sell,
    /// We receive only non-pure and give only pure
    Buy,
    Unsupported,
}

/// What the loop did with a decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Remote call succeeded
    Executed,
    /// Offer was already accepted/declined/cancelled remotely
    AlreadyResolved,
    /// Dry run: logged only
    DryRun,
    /// Trading switch is off: logged only
    TradingDisabled,
    /// Held decision, nothing to execute
    Skipped,
    /// Remote call failed after retries; the offer stays pending
    Failed(String),
}

impl ExecutionStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, ExecutionStatus::Failed(_))
    }
}

/// Published after every evaluated offer
#[derive(Debug, Clone)]
pub struct OfferOutcome {
    pub offer_id: String,
    pub partner: String,
    pub decision: OfferDecision,
    pub execution: ExecutionStatus,
    pub evaluated_at: DateTime<Utc>,
}

impl OfferOutcome {
    /// Message safe to show the partner
    ///
    /// Never includes remote error bodies.
    pub fn partner_message(&self) -> String {
        match (&self.decision.verdict, &self.execution) {
            (_, ExecutionStatus::Failed(_)) => {
                "Your offer could not be processed right now. I will try again shortly.".to_string()
            }
            (Verdict::Accept, _) => "Thanks, your offer was accepted.".to_string(),
            (Verdict::Decline, _) => format!("Your offer was declined: {}", self.decision.reason),
            (Verdict::Hold, _) => "Your offer is waiting for confirmation.".to_string(),
        }
    }
}

/// Counters for one poll
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    pub offers_seen: usize,
    pub accepted: usize,
    pub declined: usize,
    pub held: usize,
    pub failed: usize,
    /// Listing pending offers failed; nothing was evaluated
    pub fetch_failed: bool,
    /// Stop was requested before every offer was handled
    pub interrupted: bool,
}

/// Result of trying to start a poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollAttempt {
    Ran(PollReport),
    /// Another poll was already in flight
    Skipped,
}
