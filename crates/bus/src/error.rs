//! Event bus errors

use artvault_store::StoreError;
use thiserror::Error;

/// Errors that can occur in the event bus
#[derive(Error, Debug)]
pub enum BusError {
    #[error("Subscriber '{name}' failed: {reason}")]
    SubscriberFailed { name: String, reason: String },

    #[error("Replay failed: {0}")]
    ReplayFailed(String),

    #[error("Event store error: {0}")]
    Store(#[from] StoreError),

    #[error("Channel closed")]
    ChannelClosed,
}

impl From<rusqlite::Error> for BusError {
    fn from(err: rusqlite::Error) -> Self {
        BusError::Store(StoreError::from(err))
    }
}

/// Result type alias for BusError
pub type BusResult<T> = Result<T, BusError>;
