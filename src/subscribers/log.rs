//! # Logging subscriber.
//!
//! [`LogWriter`] forwards tunnel events to [`tracing`] so they interleave
//! with whatever structured logging the host application already ships.
//!
//! ## Output shape
//! ```text
//! INFO tunnel{name=browserstack}: status text="downloading"
//! INFO tunnel{name=browserstack}: progress received=65536 total=1048576
//! INFO tunnel{name=browserstack}: stdout line="..."
//! ```

use async_trait::async_trait;
use tracing::{info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Forwards every event to `tracing` under the `tunnelvisor` target.
#[derive(Debug, Default)]
pub struct LogWriter;

impl LogWriter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let name = e.tunnel.as_deref().unwrap_or("tunnel");
        match e.kind {
            EventKind::Status => {
                info!(target: "tunnelvisor", tunnel = name, text = e.text.as_deref().unwrap_or(""), "status");
            }
            EventKind::Progress => {
                info!(
                    target: "tunnelvisor",
                    tunnel = name,
                    received = e.received.unwrap_or(0),
                    total = e.total,
                    "progress"
                );
            }
            EventKind::Stdout => {
                info!(target: "tunnelvisor", tunnel = name, line = e.text.as_deref().unwrap_or(""), "stdout");
            }
            EventKind::Stderr => {
                info!(target: "tunnelvisor", tunnel = name, line = e.text.as_deref().unwrap_or(""), "stderr");
            }
            EventKind::Info => {
                info!(target: "tunnelvisor", tunnel = name, text = e.text.as_deref().unwrap_or(""), "info");
            }
            EventKind::ProcessExited => {
                warn!(target: "tunnelvisor", tunnel = name, "tunnel process exited");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
