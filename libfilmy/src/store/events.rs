//! Change notifications for store subscribers
//!
//! Every applied action is broadcast over a `tokio::sync::broadcast`
//! channel together with a monotonically increasing sequence number.
//! Emitting never blocks: with no subscribers the notification is dropped,
//! and a lagging subscriber misses the oldest notifications rather than
//! stalling the store.
//!
//! # Example
//!
//! ```
//! use libfilmy::store::{Store, StoreEvent, Action};
//!
//! # async fn example() {
//! let store = Store::new();
//! let mut changes = store.subscribe();
//!
//! store.apply(Action::FetchMoviesRequest);
//!
//! if let Ok(StoreEvent { sequence, action }) = changes.recv().await {
//!     println!("#{} {}", sequence, action.name());
//! }
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::actions::Action;

pub type StoreReceiver = broadcast::Receiver<StoreEvent>;

/// Default per-subscriber buffer
pub const DEFAULT_CAPACITY: usize = 128;

/// An action that has been applied to the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreEvent {
    /// Position of the action in the store's apply order, starting at 1
    pub sequence: u64,
    pub action: Action,
}

#[derive(Clone)]
pub struct StoreBus {
    sender: broadcast::Sender<StoreEvent>,
}

impl StoreBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> StoreReceiver {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: StoreEvent) {
        // Err only means nobody is listening
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for StoreBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(sequence: u64) -> StoreEvent {
        StoreEvent {
            sequence,
            action: Action::ClearError,
        }
    }

    #[tokio::test]
    async fn test_emit_reaches_every_subscriber() {
        let bus = StoreBus::new(8);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(event(1));

        assert_eq!(first.recv().await.unwrap(), event(1));
        assert_eq!(second.recv().await.unwrap(), event(1));
    }

    #[test]
    fn test_emit_without_subscribers_is_noop() {
        let bus = StoreBus::default();
        bus.emit(event(1));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_skips_oldest() {
        let bus = StoreBus::new(2);
        let mut receiver = bus.subscribe();

        for sequence in 1..=4 {
            bus.emit(event(sequence));
        }

        assert!(matches!(
            receiver.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
        assert_eq!(receiver.recv().await.unwrap().sequence, 3);
    }

    #[test]
    fn test_event_serializes_action_tag() {
        let json = serde_json::to_string(&StoreEvent {
            sequence: 7,
            action: Action::FetchMoviesRequest,
        })
        .unwrap();
        assert!(json.contains("\"sequence\":7"));
        assert!(json.contains("fetch_movies_request"));
    }
}
