use tokio::sync::broadcast;

use crate::protocol::Event;

/// Capacity of the broadcast channel behind the bus. Decoded events are
/// small; a slow subscriber that falls this far behind loses the oldest
/// events rather than stalling the receive loop.
const CHANNEL_CAPACITY: usize = 64;

/// Typed publish point for decoded events.
///
/// Any number of independent subscribers may attach at any time; delivery
/// is fire-and-forget with no replay, in the order datagrams were
/// processed. Components that need to publish or subscribe hold a clone of
/// the bus rather than inheriting an emitter.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        EventBus { tx }
    }

    /// Publishes one event to all current subscribers. An event with no
    /// subscribers is simply dropped.
    pub fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    /// Attaches a new independent subscriber
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        EventBus::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_all_subscribers_receive() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(Event::SerialNumber(42));

        assert_eq!(rx1.recv().await.unwrap(), Event::SerialNumber(42));
        assert_eq!(rx2.recv().await.unwrap(), Event::SerialNumber(42));
    }

    #[tokio::test]
    async fn test_publish_order_preserved() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(Event::SerialNumber(1));
        bus.publish(Event::SerialNumber(2));

        assert_eq!(rx.recv().await.unwrap(), Event::SerialNumber(1));
        assert_eq!(rx.recv().await.unwrap(), Event::SerialNumber(2));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        // Must not panic or error
        bus.publish(Event::SerialNumber(1));
    }
}
