//! # Event bus for broadcasting tunnel events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from multiple sources (the lifecycle, the
//! downloader's progress hook, the output forwarder).
//!
//! Collaborators subscribe directly on the tunnel they care about — there is
//! no ambient global emitter.
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks.
//! - **Bounded capacity**: a single ring buffer stores recent events for all
//!   receivers; slow receivers observe `RecvError::Lagged(n)` and skip the
//!   `n` oldest items.
//! - **No persistence**: events published with no active receiver are lost.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for tunnel events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender); multiple
/// publishers can publish concurrently and every receiver gets a clone of
/// each event.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to ≥ 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers the event is dropped; the call still
    /// returns immediately.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that observes subsequent events.
    ///
    /// Each call creates an independent receiver that only sees events
    /// published after it subscribed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn subscriber_receives_published_events() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::Status).with_text("downloading"));

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::Status);
        assert_eq!(ev.text.as_deref(), Some("downloading"));
    }

    #[tokio::test]
    async fn publish_without_receivers_does_not_block() {
        let bus = Bus::new(1);
        for _ in 0..16 {
            bus.publish(Event::new(EventKind::Progress));
        }
    }
}
