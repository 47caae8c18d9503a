//! In-process event bus
//!
//! Fan-out of committed balance events over unbounded tokio channels.
//! Delivery is ordered per subscriber and nothing is dropped while the
//! receiver lives. Subscribers that fell behind or restarted call
//! [`EventBus::replay`] with their last seen sequence.

use artvault_store::Store;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use crate::error::{BusError, BusResult};
use crate::event::BalanceEvent;
use crate::outbox::Outbox;
use crate::subscriber::EventSubscriber;

/// Event bus for distributing committed events
pub struct EventBus {
    store: Arc<Store>,
    subscribers: Mutex<Vec<UnboundedSender<BalanceEvent>>>,
}

impl EventBus {
    /// Create a bus that replays from the given store's outbox
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Register a new subscriber
    pub fn subscribe(&self) -> UnboundedReceiver<BalanceEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }

    /// Deliver committed events to every live subscriber
    ///
    /// Returns the number of subscribers that received them. Subscribers
    /// whose receiver was dropped are removed.
    pub fn publish(&self, events: &[BalanceEvent]) -> usize {
        if events.is_empty() {
            return 0;
        }

        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| events.iter().all(|event| tx.send(event.clone()).is_ok()));

        debug!(
            count = events.len(),
            last_sequence = events.last().map(|e| e.sequence),
            subscribers = subscribers.len(),
            "Published balance events"
        );
        subscribers.len()
    }

    /// Every committed event after `after`, oldest first
    pub fn replay(&self, after: u64) -> BusResult<Vec<BalanceEvent>> {
        self.store.with_conn(|conn| Outbox::since(conn, after))
    }

    /// Feed the outbox to a subscriber, starting after its last processed
    /// sequence
    pub async fn replay_to(&self, subscriber: &dyn EventSubscriber) -> BusResult<usize> {
        let from = subscriber.last_processed_sequence().unwrap_or(0);
        let events = self.replay(from)?;

        info!(subscriber = subscriber.name(), from, count = events.len(), "Replaying events");

        subscriber.on_replay_start().await?;
        for event in &events {
            subscriber
                .handle(event)
                .await
                .map_err(|e| BusError::ReplayFailed(format!("{} at {}: {e}", subscriber.name(), event.sequence)))?;
        }
        subscriber.on_replay_complete().await?;

        Ok(events.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::BalanceEventKind;
    use artvault_core::{Amount, Currency};
    use rust_decimal_macros::dec;

    fn append(store: &Store, owner: &str) -> BalanceEvent {
        let event = BalanceEvent::credit(
            owner,
            Currency::Btc,
            Amount::new(dec!(0.1)).unwrap(),
            BalanceEventKind::Deposit,
        );
        store.with_conn(|conn| Outbox::append(conn, event)).unwrap()
    }

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber_in_order() {
        let store = Arc::new(Store::in_memory().unwrap());
        let bus = EventBus::new(store.clone());
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let events = vec![append(&store, "a@x.io"), append(&store, "b@x.io")];
        assert_eq!(bus.publish(&events), 2);

        for rx in [&mut rx1, &mut rx2] {
            assert_eq!(rx.recv().await.unwrap(), events[0]);
            assert_eq!(rx.recv().await.unwrap(), events[1]);
        }
    }

    #[tokio::test]
    async fn test_dropped_subscriber_is_pruned() {
        let store = Arc::new(Store::in_memory().unwrap());
        let bus = EventBus::new(store.clone());
        let rx = bus.subscribe();
        let _kept = bus.subscribe();
        drop(rx);

        let events = vec![append(&store, "a@x.io")];
        assert_eq!(bus.publish(&events), 1);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_replay_from_outbox() {
        let store = Arc::new(Store::in_memory().unwrap());
        let bus = EventBus::new(store.clone());

        let first = append(&store, "a@x.io");
        let second = append(&store, "a@x.io");

        assert_eq!(bus.replay(0).unwrap(), vec![first.clone(), second.clone()]);
        assert_eq!(bus.replay(first.sequence).unwrap(), vec![second]);
    }
}
