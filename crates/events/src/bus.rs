//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the hand-off point between whatever mutates changes and
//! the notification router. Publishing never blocks and never fails, so a
//! change mutation is never held up by mail.

use reviewmail_notify::ChangeEvent;
use tokio::sync::broadcast;

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// # Usage
///
/// ```rust
/// use reviewmail_core::change::ChangeSnapshot;
/// use reviewmail_core::types::{AccountId, ChangeId, ProjectName};
/// use reviewmail_events::EventBus;
/// use reviewmail_notify::{ChangeEvent, ChangeEventKind};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// let change = ChangeSnapshot::new(
///     ChangeId(1),
///     "I0001",
///     ProjectName::new("demo"),
///     AccountId(1),
///     "Initial import",
/// );
/// bus.publish(ChangeEvent::new(ChangeEventKind::Merged, change));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed events are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is dropped.
    pub fn publish(&self, event: ChangeEvent) {
        if self.sender.send(event).is_err() {
            tracing::debug!("No subscribers, change event dropped");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use reviewmail_core::change::ChangeSnapshot;
    use reviewmail_core::types::{AccountId, ChangeId, ProjectName};
    use reviewmail_notify::ChangeEventKind;

    use super::*;

    fn event(kind: ChangeEventKind) -> ChangeEvent {
        let change = ChangeSnapshot::new(
            ChangeId(7),
            "I0007",
            ProjectName::new("demo"),
            AccountId(1),
            "Tidy up",
        );
        ChangeEvent::new(kind, change).by(AccountId(2))
    }

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(event(ChangeEventKind::Abandoned).with_message("Superseded"));

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.kind.name(), "abandoned");
        assert_eq!(received.change.id, ChangeId(7));
        assert_eq!(received.actor, Some(AccountId(2)));
        assert_eq!(received.message.as_deref(), Some("Superseded"));
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(event(ChangeEventKind::Merged));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(e1.kind.name(), "merged");
        assert_eq!(e2.kind.name(), "merged");
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(event(ChangeEventKind::NewChange));
        bus.publish(event(ChangeEventKind::Comment { tag: None }));
        bus.publish(event(ChangeEventKind::Merged));

        let mut names = Vec::new();
        for _ in 0..3 {
            names.push(rx.recv().await.expect("event").kind.name());
        }
        assert_eq!(names, ["new_change", "comment", "merged"]);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(event(ChangeEventKind::Restored));
    }
}
