//! # Provider adapter contract.
//!
//! A [`Provider`] supplies the four things that differ between vendor
//! tunnels — download URL, executable, argument vector, readiness signal —
//! and nothing else. The state machine, download plumbing and process
//! supervision live in the [`Tunnel`](crate::Tunnel) base and are never
//! duplicated by adapters.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{Host, TunnelConfig};
use crate::error::TunnelError;
use crate::process::OutputLine;

/// Per-provider specialization points over the tunnel lifecycle.
///
/// Resolution methods take the [`Host`] explicitly so unsupported
/// platform/architecture combinations fail fast with a descriptive error
/// instead of degrading at launch time.
pub trait Provider: Send + Sync + 'static + std::fmt::Debug {
    /// Stable provider name ("browserstack", "testingbot", ...). Used for
    /// event attribution and the default install directory.
    fn name(&self) -> &'static str;

    /// Path, relative to the install directory, whose presence marks the
    /// download as complete. `None` means there is nothing to download.
    fn artifact(&self, host: &Host) -> Option<PathBuf>;

    /// Program to spawn, either inside `dir` or resolved from `PATH`.
    /// `None` means the tunnel is managed outside this process entirely.
    fn command(&self, dir: &Path, host: &Host) -> Option<PathBuf>;

    /// Archive URL for the host, or `Ok(None)` when nothing needs fetching.
    fn download_url(&self, host: &Host) -> Result<Option<String>, TunnelError>;

    /// Builds the launch plan: the exact argument vector the vendor binary
    /// expects plus the readiness probe for this run.
    fn plan(&self, cfg: &TunnelConfig) -> Result<LaunchPlan, TunnelError>;

    /// Post-extraction fixup hook (e.g. restoring the executable bit).
    fn prepare(&self, _dir: &Path, _host: &Host) -> Result<(), TunnelError> {
        Ok(())
    }
}

/// Everything the lifecycle needs to launch one tunnel run.
#[derive(Debug)]
pub struct LaunchPlan {
    /// Argument vector, in the exact order the vendor tool expects.
    pub args: Vec<String>,
    /// How readiness is decided for this run.
    pub probe: ReadinessProbe,
    /// Optional per-run output classifier; kept attached after readiness so
    /// providers can keep forwarding `Info` events.
    pub scanner: Option<Box<dyn LineScanner>>,
}

/// Strategy for deciding that the tunnel is usable.
#[derive(Debug)]
pub enum ReadinessProbe {
    /// Any output on either stream means the tunnel is up. A conservative
    /// fallback for providers without a documented signal; real adapters
    /// should replace it.
    FirstOutput,
    /// Readiness comes from the line scanner's `Ready`/`Failed` verdicts.
    Scanner,
    /// The tool touches a marker file once connected. Polled rather than
    /// watched, since the native watch APIs are unreliable on some of the
    /// platforms these vendor tools target.
    MarkerFile {
        path: PathBuf,
        interval: Duration,
    },
}

/// Verdict for one line of process output.
#[derive(Debug, PartialEq, Eq)]
pub enum Scan {
    /// Nothing decisive on this line.
    Pending,
    /// The tunnel is ready for traffic.
    Ready,
    /// The tool reported a fatal condition; the message is surfaced through
    /// [`TunnelError::TunnelReported`].
    Failed(String),
    /// Forward this text as an `Info` event and keep waiting.
    Info(String),
}

/// Stateful line classifier. One instance lives per launch, so scanners may
/// carry dedup state across lines.
pub trait LineScanner: Send + std::fmt::Debug {
    fn scan(&mut self, line: &OutputLine) -> Scan;
}
