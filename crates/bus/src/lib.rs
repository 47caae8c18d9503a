//! ArtVault Event Bus - Typed balance events
//!
//! Every balance change is appended to the `balance_events` outbox in the
//! same database transaction as the change itself, then published to
//! in-process subscribers after commit.
//!
//! - Ordered, lossless fan-out over tokio mpsc channels
//! - `EventSubscriber` trait for push-style handlers
//! - Replay from the outbox for at-least-once delivery

pub mod channel;
pub mod error;
pub mod event;
pub mod outbox;
pub mod subscriber;

pub use channel::EventBus;
pub use error::{BusError, BusResult};
pub use event::{BalanceEvent, BalanceEventKind};
pub use outbox::Outbox;
pub use subscriber::{dispatch, EventSubscriber, LoggingSubscriber};
