//! Event subscriber trait for async event handling

use crate::error::BusError;
use crate::event::BalanceEvent;
use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

/// Trait for event subscribers
///
/// Delivery is at-least-once: a subscriber may see an event again after a
/// replay, so handlers must be idempotent. Tracking
/// [`EventSubscriber::last_processed_sequence`] lets replay skip what was
/// already handled.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Get the subscriber name (for logging)
    fn name(&self) -> &str;

    /// Handle a balance event
    async fn handle(&self, event: &BalanceEvent) -> Result<(), BusError>;

    /// Called when replay starts (optional)
    async fn on_replay_start(&self) -> Result<(), BusError> {
        Ok(())
    }

    /// Called when replay completes (optional)
    async fn on_replay_complete(&self) -> Result<(), BusError> {
        Ok(())
    }

    /// Get the last processed sequence (for replay optimization)
    ///
    /// Returns None if the subscriber doesn't track sequence numbers.
    fn last_processed_sequence(&self) -> Option<u64> {
        None
    }
}

/// Drive a subscriber from a bus receiver until the bus goes away
///
/// Handler failures are logged and skipped; the subscriber can recover them
/// with a replay. Returns the number of events handled successfully.
pub async fn dispatch(
    mut rx: UnboundedReceiver<BalanceEvent>,
    subscriber: &dyn EventSubscriber,
) -> u64 {
    let mut handled = 0;
    while let Some(event) = rx.recv().await {
        match subscriber.handle(&event).await {
            Ok(()) => handled += 1,
            Err(e) => warn!(
                subscriber = subscriber.name(),
                sequence = event.sequence,
                error = %e,
                "Subscriber failed to handle event"
            ),
        }
    }
    handled
}

/// Writes every balance event to the log
pub struct LoggingSubscriber;

#[async_trait]
impl EventSubscriber for LoggingSubscriber {
    fn name(&self) -> &str {
        "log"
    }

    async fn handle(&self, event: &BalanceEvent) -> Result<(), BusError> {
        info!(
            sequence = event.sequence,
            owner = %event.owner,
            currency = %event.currency,
            delta = %event.delta,
            kind = %event.kind,
            transaction = event.transaction_id.as_deref().unwrap_or("-"),
            "Balance updated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::EventBus;
    use crate::event::BalanceEventKind;
    use crate::outbox::Outbox;
    use artvault_core::{Amount, Currency};
    use artvault_store::Store;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    /// Running per-owner totals, idempotent by sequence
    #[derive(Default)]
    struct Totals {
        seen: AtomicU64,
        totals: Mutex<BTreeMap<String, Decimal>>,
    }

    #[async_trait]
    impl EventSubscriber for Totals {
        fn name(&self) -> &str {
            "totals"
        }

        async fn handle(&self, event: &BalanceEvent) -> Result<(), BusError> {
            if event.sequence <= self.seen.load(Ordering::SeqCst) {
                return Ok(());
            }
            *self
                .totals
                .lock()
                .unwrap()
                .entry(event.owner.clone())
                .or_default() += event.delta;
            self.seen.store(event.sequence, Ordering::SeqCst);
            Ok(())
        }

        fn last_processed_sequence(&self) -> Option<u64> {
            Some(self.seen.load(Ordering::SeqCst))
        }
    }

    fn append(store: &Store, owner: &str, delta: Decimal) -> BalanceEvent {
        let event = BalanceEvent::credit(
            owner,
            Currency::Sol,
            Amount::new(delta).unwrap(),
            BalanceEventKind::Sale,
        );
        store.with_conn(|conn| Outbox::append(conn, event)).unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_until_bus_dropped() {
        let store = Arc::new(Store::in_memory().unwrap());
        let bus = EventBus::new(store.clone());
        let rx = bus.subscribe();

        let events = vec![append(&store, "a@x.io", dec!(2)), append(&store, "a@x.io", dec!(1))];
        bus.publish(&events);
        drop(bus);

        let totals = Totals::default();
        assert_eq!(dispatch(rx, &totals).await, 2);
        assert_eq!(totals.totals.lock().unwrap()["a@x.io"], dec!(3));
    }

    #[tokio::test]
    async fn test_replay_skips_processed_and_is_idempotent() {
        let store = Arc::new(Store::in_memory().unwrap());
        let bus = EventBus::new(store.clone());

        let first = append(&store, "a@x.io", dec!(2));
        let totals = Totals::default();
        totals.handle(&first).await.unwrap();

        append(&store, "b@x.io", dec!(5));
        assert_eq!(bus.replay_to(&totals).await.unwrap(), 1);

        // Redelivery of an already seen event changes nothing
        totals.handle(&first).await.unwrap();
        let map = totals.totals.lock().unwrap();
        assert_eq!(map["a@x.io"], dec!(2));
        assert_eq!(map["b@x.io"], dec!(5));
    }

    #[tokio::test]
    async fn test_logging_subscriber_accepts_events() {
        let store = Store::in_memory().unwrap();
        let event = append(&store, "a@x.io", dec!(1));
        assert!(LoggingSubscriber.handle(&event).await.is_ok());
    }
}
