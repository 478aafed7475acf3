//! Channel type definitions for inter-task communication

use tokio::sync::mpsc;

use crate::trading::types::OfferOutcome;

/// Default channel buffer size
pub const DEFAULT_CHANNEL_SIZE: usize = 256;

/// Create a new offer outcome channel with the default buffer size
pub fn create_outcome_channel() -> (mpsc::Sender<OfferOutcome>, mpsc::Receiver<OfferOutcome>) {
    mpsc::channel(DEFAULT_CHANNEL_SIZE)
}
