//! Retrying accept/decline execution

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use crate::common::errors::{ClientError, Result};
use crate::common::traits::TradingPlatform;
use crate::config::types::TradingConfig;

use super::types::{ExecutionStatus, Verdict};

/// Linear backoff: attempt `n` waits `base_delay * n` before retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&TradingConfig::default())
    }
}

impl From<&TradingConfig> for RetryPolicy {
    fn from(config: &TradingConfig) -> Self {
        Self::new(config.retry_attempts, config.retry_base_delay())
    }
}

/// Remote action for a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferAction {
    Accept,
    Decline,
}

impl OfferAction {
    pub fn for_verdict(verdict: Verdict) -> Option<Self> {
        match verdict {
            Verdict::Accept => Some(OfferAction::Accept),
            Verdict::Decline => Some(OfferAction::Decline),
            Verdict::Hold => None,
        }
    }
}

/// Sends accept/decline calls with retries
pub struct OfferExecutor {
    platform: Arc<dyn TradingPlatform>,
    retry: RetryPolicy,
}

impl OfferExecutor {
    pub fn new(platform: Arc<dyn TradingPlatform>, retry: RetryPolicy) -> Self {
        Self { platform, retry }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Execute one action
    ///
    /// An offer that is already resolved counts as done. Authentication
    /// failures are returned immediately; transient failures are retried up
    /// to `max_attempts` and the last error is returned.
    #[instrument(skip(self), fields(platform = self.platform.platform_name()))]
    pub async fn execute(&self, action: OfferAction, offer_id: &str, partner: &str) -> Result<ExecutionStatus> {
        let mut attempt = 1;
        loop {
            let result = match action {
                OfferAction::Accept => self.platform.accept_offer(offer_id, partner).await,
                OfferAction::Decline => self.platform.decline_offer(offer_id).await,
            };

            match result {
                Ok(()) => {
                    info!(attempt, "Offer action completed");
                    return Ok(ExecutionStatus::Executed);
                }
                Err(ClientError::AlreadyResolved(detail)) => {
                    info!(%detail, "Offer already resolved remotely");
                    return Ok(ExecutionStatus::AlreadyResolved);
                }
                Err(e) if e.is_authentication() => {
                    error!(error = %e, "Authentication failed, session needs refreshing");
                    return Err(e);
                }
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(attempt, error = %e, ?delay, "Transient failure, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(attempt, error = %e, "Offer action failed");
                    return Err(e);
                }
            }
        }
    }
}
