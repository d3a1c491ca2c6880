//! # Readiness wait loop.
//!
//! Consumes process output (and, for file-signalled providers, polls the
//! marker file) until the provider's probe decides the tunnel is usable or
//! has failed.
//!
//! ## Rules
//! - Scanner verdicts are honored for every probe: a `Failed` line aborts
//!   the start even while a marker file is being polled, and `Info` text is
//!   forwarded as events while waiting.
//! - The process exiting (both pipes at EOF) before readiness is a start
//!   failure.

use tokio::sync::mpsc;

use crate::error::TunnelError;
use crate::events::{Bus, Event, EventKind};
use crate::process::OutputLine;
use crate::providers::{LineScanner, ReadinessProbe, Scan};

/// Waits until the probe reports readiness.
pub(crate) async fn await_ready(
    probe: ReadinessProbe,
    scanner: &mut Option<Box<dyn LineScanner>>,
    output: &mut mpsc::Receiver<OutputLine>,
    bus: &Bus,
    name: &'static str,
) -> Result<(), TunnelError> {
    match probe {
        ReadinessProbe::MarkerFile { path, interval } => {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    line = output.recv() => match line {
                        Some(line) => {
                            if feed(scanner, &line, bus, name)? {
                                return Ok(());
                            }
                        }
                        None => return Err(early_exit()),
                    },
                    _ = ticker.tick() => {
                        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                            return Ok(());
                        }
                    }
                }
            }
        }
        ReadinessProbe::Scanner | ReadinessProbe::FirstOutput => loop {
            match output.recv().await {
                Some(line) => {
                    let ready = feed(scanner, &line, bus, name)?;
                    if ready || matches!(probe, ReadinessProbe::FirstOutput) {
                        return Ok(());
                    }
                }
                None => return Err(early_exit()),
            }
        },
    }
}

/// Runs one line through the scanner. Returns `true` on a `Ready` verdict.
fn feed(
    scanner: &mut Option<Box<dyn LineScanner>>,
    line: &OutputLine,
    bus: &Bus,
    name: &'static str,
) -> Result<bool, TunnelError> {
    let Some(scanner) = scanner.as_mut() else {
        return Ok(false);
    };
    match scanner.scan(line) {
        Scan::Pending => Ok(false),
        Scan::Ready => Ok(true),
        Scan::Failed(message) => Err(TunnelError::TunnelReported { message }),
        Scan::Info(text) => {
            bus.publish(Event::new(EventKind::Info).with_tunnel(name).with_text(text));
            Ok(false)
        }
    }
}

fn early_exit() -> TunnelError {
    TunnelError::TunnelReported {
        message: "tunnel process exited before signalling readiness".into(),
    }
}
