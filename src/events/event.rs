//! # Lifecycle events emitted by a running tunnel.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Download events**: transfer progress while fetching the tunnel archive
//! - **Output events**: text re-emitted from the child process streams
//! - **Lifecycle events**: phase changes and unexpected process death
//!
//! The [`Event`] struct carries the optional metadata each kind sets.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Progress events are published in the order bytes arrive;
//! output events preserve per-stream order, but no order is promised between
//! stdout and stderr.
//!
//! ## Example
//! ```rust
//! use tunnelvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::Progress)
//!     .with_tunnel("browserstack")
//!     .with_progress(4096, Some(1_048_576));
//!
//! assert_eq!(ev.kind, EventKind::Progress);
//! assert_eq!(ev.received, Some(4096));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of tunnel events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Human-readable phase change ("downloading", "launching", "ready", ...).
    ///
    /// Sets:
    /// - `tunnel`: provider name
    /// - `text`: status string
    Status,

    /// Bytes received while downloading the tunnel archive.
    ///
    /// Sets:
    /// - `tunnel`: provider name
    /// - `received`: bytes received so far
    /// - `total`: Content-Length when the server reported one
    Progress,

    /// A line the child process wrote to standard output.
    ///
    /// Sets:
    /// - `tunnel`: provider name
    /// - `text`: the line, without its trailing newline
    Stdout,

    /// A line the child process wrote to standard error.
    ///
    /// Sets:
    /// - `tunnel`: provider name
    /// - `text`: the line, without its trailing newline
    Stderr,

    /// Deduplicated informational message from a provider that repeats its
    /// status line while a remote session negotiation is pending.
    ///
    /// Sets:
    /// - `tunnel`: provider name
    /// - `text`: the message, prefix stripped
    Info,

    /// The child process exited while the tunnel was `Running`. The exit
    /// code still surfaces through the next `stop()` call.
    ///
    /// Sets:
    /// - `tunnel`: provider name
    ProcessExited,
}

/// Tunnel event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Provider name of the tunnel that published the event.
    pub tunnel: Option<Arc<str>>,
    /// Text payload (status string, output line, info message).
    pub text: Option<Arc<str>>,
    /// Bytes received so far (download progress).
    pub received: Option<u64>,
    /// Total bytes expected, when the server reported a length.
    pub total: Option<u64>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            tunnel: None,
            text: None,
            received: None,
            total: None,
        }
    }

    /// Attaches the publishing tunnel's provider name.
    #[inline]
    pub fn with_tunnel(mut self, tunnel: impl Into<Arc<str>>) -> Self {
        self.tunnel = Some(tunnel.into());
        self
    }

    /// Attaches a text payload.
    #[inline]
    pub fn with_text(mut self, text: impl Into<Arc<str>>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Attaches download progress counters.
    #[inline]
    pub fn with_progress(mut self, received: u64, total: Option<u64>) -> Self {
        self.received = Some(received);
        self.total = total;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        let a = Event::new(EventKind::Status);
        let b = Event::new(EventKind::Status);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn builders_set_only_their_fields() {
        let ev = Event::new(EventKind::Stderr)
            .with_tunnel("testingbot")
            .with_text("INFO: waiting");
        assert_eq!(ev.tunnel.as_deref(), Some("testingbot"));
        assert_eq!(ev.text.as_deref(), Some("INFO: waiting"));
        assert_eq!(ev.received, None);
        assert_eq!(ev.total, None);
    }
}
