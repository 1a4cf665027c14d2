//! Broadcast bus for `RunEvent`s.
//!
//! Built on `tokio::sync::broadcast`. Publishing with no active subscribers is
//! a no-op, so a headless run pays nothing for progress reporting.

use clusterup_types::event::RunEvent;
use tokio::sync::broadcast;

/// Default channel capacity used by the CLI.
pub const DEFAULT_CAPACITY: usize = 256;

/// Multi-consumer event bus for run lifecycle events.
///
/// Cloning the bus clones the sender, so the sequencer and forked step tasks
/// can publish through the same channel.
pub struct EventBus {
    sender: broadcast::Sender<RunEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new subscriber that will receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: RunEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn phase_started(index: usize) -> RunEvent {
        RunEvent::PhaseStarted {
            run_id: Uuid::nil(),
            phase: format!("phase-{index}"),
            index,
        }
    }

    #[tokio::test]
    async fn subscribers_receive_in_publish_order() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(phase_started(0));
        bus.publish(phase_started(1));

        assert!(matches!(rx.recv().await.unwrap(), RunEvent::PhaseStarted { index: 0, .. }));
        assert!(matches!(rx.recv().await.unwrap(), RunEvent::PhaseStarted { index: 1, .. }));
    }

    #[test]
    fn publish_without_subscribers_is_noop() {
        let bus = EventBus::default();
        bus.publish(phase_started(0));
    }

    #[test]
    fn clone_shares_channel() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        bus.clone().publish(phase_started(3));
        assert!(rx.try_recv().is_ok());
        assert!(format!("{bus:?}").contains("receiver_count"));
    }
}
