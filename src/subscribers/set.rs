//! # Non-blocking event fan-out to multiple subscribers.
//!
//! Provides [`SubscriberSet`] — bridges a tunnel's [`Bus`] to multiple
//! subscribers without blocking the publisher.
//!
//! ## Architecture
//! ```text
//! Bus ──► listener ──┬──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!                    ├──► [queue 2] ──► worker 2 ──► subscriber2.on_event()
//!                    └──► [queue N] ──► worker N ──► subscriberN.on_event()
//! ```
//!
//! ## Rules
//! - **No cross-subscriber ordering**: subscriber A may process event N while
//!   B is still on N-5; per-subscriber order is FIFO.
//! - **Overflow**: the event is dropped for that subscriber only (warn).
//! - **Isolation**: a panicking subscriber is caught and reported; its worker
//!   keeps processing and other subscribers are unaffected.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::events::{Bus, Event};
use crate::subscribers::Subscribe;

/// Per-subscriber channel metadata.
struct Channel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for multiple event subscribers.
pub struct SubscriberSet {
    listener: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
}

impl SubscriberSet {
    /// Subscribes to the bus and spawns one bounded queue + worker task per
    /// subscriber, plus a listener that feeds the queues.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(bus: &Bus, subs: Vec<Arc<dyn Subscribe>>) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        let info = if let Some(msg) = panic_err.downcast_ref::<&'static str>() {
                            (*msg).to_string()
                        } else if let Some(msg) = panic_err.downcast_ref::<String>() {
                            msg.clone()
                        } else {
                            "unknown panic".to_string()
                        };
                        warn!(subscriber = sub.name(), panic = %info, "subscriber panicked");
                    }
                }
            });
            channels.push(Channel { name, sender: tx });
            workers.push(handle);
        }

        let mut rx = bus.subscribe();
        let listener = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => {
                        let ev = Arc::new(ev);
                        for channel in &channels {
                            match channel.sender.try_send(Arc::clone(&ev)) {
                                Ok(()) => {}
                                Err(mpsc::error::TrySendError::Full(_)) => {
                                    warn!(subscriber = channel.name, "subscriber queue full, event dropped");
                                }
                                Err(mpsc::error::TrySendError::Closed(_)) => {}
                            }
                        }
                    }
                    // Lagged: the ring buffer overwrote events we had not read
                    // yet; keep going from the oldest retained one.
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "event listener lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Self { listener, workers }
    }

    /// Gracefully shuts down the listener and all subscriber workers.
    pub async fn shutdown(self) {
        self.listener.abort();
        let _ = self.listener.await;
        // Channel senders died with the listener; workers drain and exit.
        for handle in self.workers {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::events::EventKind;

    struct Counter(Arc<AtomicUsize>);

    #[async_trait]
    impl Subscribe for Counter {
        async fn on_event(&self, _event: &Event) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn name(&self) -> &'static str {
            "counter"
        }
    }

    #[tokio::test]
    async fn events_fan_out_to_subscribers() {
        let bus = Bus::new(32);
        let seen = Arc::new(AtomicUsize::new(0));
        let set = SubscriberSet::spawn(&bus, vec![Arc::new(Counter(seen.clone()))]);

        for _ in 0..3 {
            bus.publish(Event::new(EventKind::Status));
        }

        tokio::time::timeout(std::time::Duration::from_secs(2), async {
            while seen.load(Ordering::SeqCst) < 3 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("subscriber never saw all events");

        set.shutdown().await;
    }

    struct Panicky;

    #[async_trait]
    impl Subscribe for Panicky {
        async fn on_event(&self, _event: &Event) {
            panic!("boom");
        }
        fn name(&self) -> &'static str {
            "panicky"
        }
    }

    #[tokio::test]
    async fn panicking_subscriber_does_not_poison_others() {
        let bus = Bus::new(32);
        let seen = Arc::new(AtomicUsize::new(0));
        let set = SubscriberSet::spawn(
            &bus,
            vec![Arc::new(Panicky), Arc::new(Counter(seen.clone()))],
        );

        bus.publish(Event::new(EventKind::Status));
        bus.publish(Event::new(EventKind::Status));

        tokio::time::timeout(std::time::Duration::from_secs(2), async {
            while seen.load(Ordering::SeqCst) < 2 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("healthy subscriber starved by panicking peer");

        set.shutdown().await;
    }
}
