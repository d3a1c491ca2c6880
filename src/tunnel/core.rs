//! # Tunnel: the shared lifecycle over a provider adapter.
//!
//! Composes the download manager and the process supervisor into one state
//! machine and re-emits everything observable as [`Event`]s.
//!
//! ## Lifecycle
//! ```text
//! start():
//!   ├─► guard: only from NotRunning (fail fast, state unchanged)
//!   ├─► state = Starting
//!   ├─► download() ─► fetch + extract + prepare   (skipped when present)
//!   │                  └─► Progress events
//!   ├─► provider.plan() ─► args + readiness probe
//!   ├─► process::spawn() ─► ProcessHandle + output lines
//!   ├─► readiness::await_ready() ─► Ready | TunnelReported
//!   ├─► spawn forwarder: lines ─► Stdout/Stderr events (+ Info via scanner)
//!   └─► state = Running, Status("ready")
//!
//! stop():
//!   ├─► guard: only from Running
//!   ├─► state = Stopping
//!   ├─► handle.terminate() ─► SIGINT, wait for real exit
//!   │       └─ failure ─► state back to Running, error propagated
//!   ├─► drain forwarder, drop handle
//!   └─► state = NotRunning, resolve with the exit code
//! ```
//!
//! ## Rules
//! - Overlapping `start()`/`stop()` calls fail fast with a distinct
//!   [`TunnelError::InvalidState`] per conflicting phase; nothing queues.
//! - A failed `start()` retains no partial state: a spawned child is killed
//!   and every handle is dropped before the error propagates.
//! - A child that dies while `Running` is announced with a `ProcessExited`
//!   event; its exit code still surfaces through the next `stop()`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::TunnelConfig;
use crate::error::{LifecycleOp, TunnelError};
use crate::events::{Bus, Event, EventKind};
use crate::fetch;
use crate::process::{self, OutputLine, OutputSource, ProcessHandle};
use crate::providers::{LineScanner, Provider, Scan};
use crate::tunnel::readiness;
use crate::tunnel::state::State;

/// Ring-buffer capacity of the event bus.
const EVENT_CAPACITY: usize = 1024;

/// A supervised tunnel to one provider.
///
/// Construct with a provider adapter and shared configuration, subscribe to
/// [`Tunnel::events`], then drive `start()`/`stop()`.
pub struct Tunnel {
    provider: Arc<dyn Provider>,
    cfg: TunnelConfig,
    bus: Bus,
    state: State,
    handle: Option<ProcessHandle>,
    forwarder: Option<JoinHandle<()>>,
    /// Set while `stop()` terminates the child so the forwarder does not
    /// announce the expected exit as a crash.
    suppress_exit: Arc<AtomicBool>,
}

impl Tunnel {
    pub fn new(provider: Arc<dyn Provider>, cfg: TunnelConfig) -> Self {
        Self {
            provider,
            cfg,
            bus: Bus::new(EVENT_CAPACITY),
            state: State::NotRunning,
            handle: None,
            forwarder: None,
            suppress_exit: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Provider name this tunnel was built for.
    pub fn name(&self) -> &'static str {
        self.provider.name()
    }

    /// Current lifecycle phase.
    pub fn state(&self) -> State {
        self.state
    }

    /// Shared configuration.
    pub fn config(&self) -> &TunnelConfig {
        &self.cfg
    }

    /// The tunnel's event bus, for wiring a
    /// [`SubscriberSet`](crate::subscribers::SubscriberSet).
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// A new receiver observing subsequent events.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Directory the archive is extracted into.
    pub fn install_dir(&self) -> PathBuf {
        self.cfg.install_dir_for(self.provider.name())
    }

    /// Whether the provider's artifact is already present on disk.
    pub fn is_downloaded(&self) -> bool {
        match self.provider.artifact(&self.cfg.host) {
            Some(rel) => self.install_dir().join(rel).exists(),
            None => true,
        }
    }

    /// Downloads and extracts the tunnel archive if it is not already
    /// present (`force` re-fetches regardless). Resolves without network
    /// access when there is nothing to do.
    pub async fn download(&self, force: bool) -> Result<(), TunnelError> {
        self.download_with(force, CancellationToken::new()).await
    }

    /// [`Tunnel::download`] with a caller-owned cancellation token; cancel
    /// it to abort the transfer with [`TunnelError::DownloadCanceled`].
    pub async fn download_with(
        &self,
        force: bool,
        cancel: CancellationToken,
    ) -> Result<(), TunnelError> {
        if !force && self.is_downloaded() {
            return Ok(());
        }
        let Some(url) = self.provider.download_url(&self.cfg.host)? else {
            return Ok(());
        };

        let dir = self.install_dir();
        self.publish_status("downloading");
        info!(
            target: "tunnelvisor",
            tunnel = self.name(),
            url = %url,
            dir = %dir.display(),
            "downloading tunnel archive"
        );

        let bus = self.bus.clone();
        let name = self.provider.name();
        fetch::download(
            &url,
            &dir,
            self.cfg.max_redirects,
            |received, total| {
                bus.publish(
                    Event::new(EventKind::Progress)
                        .with_tunnel(name)
                        .with_progress(received, total),
                );
            },
            &cancel,
        )
        .await?;

        self.provider.prepare(&dir, &self.cfg.host)
    }

    /// Starts the tunnel, downloading the binary first if necessary.
    ///
    /// Resolves once the provider's readiness probe fires; from then on the
    /// child's output is re-emitted as `Stdout`/`Stderr` events.
    pub async fn start(&mut self) -> Result<(), TunnelError> {
        if self.state != State::NotRunning {
            return Err(TunnelError::invalid_state(LifecycleOp::Start, self.state));
        }
        self.state = State::Starting;

        match self.start_inner().await {
            Ok(()) => {
                self.state = State::Running;
                self.publish_status("ready");
                Ok(())
            }
            Err(err) => {
                if let Some(mut handle) = self.handle.take() {
                    handle.kill().await;
                }
                self.state = State::NotRunning;
                Err(err)
            }
        }
    }

    async fn start_inner(&mut self) -> Result<(), TunnelError> {
        self.download_with(false, CancellationToken::new()).await?;

        let dir = self.install_dir();
        let Some(program) = self.provider.command(&dir, &self.cfg.host) else {
            // Externally-managed tunnel: nothing to launch or supervise.
            return Ok(());
        };

        let plan = self.provider.plan(&self.cfg)?;
        self.publish_status("launching");
        tokio::fs::create_dir_all(&dir).await?;
        let (handle, mut output) = process::spawn(&program, &plan.args, &dir)?;
        self.handle = Some(handle);

        let mut scanner = plan.scanner;
        readiness::await_ready(
            plan.probe,
            &mut scanner,
            &mut output,
            &self.bus,
            self.provider.name(),
        )
        .await?;

        self.suppress_exit = Arc::new(AtomicBool::new(false));
        self.forwarder = Some(spawn_forwarder(
            output,
            scanner,
            self.bus.clone(),
            self.provider.name(),
            Arc::clone(&self.suppress_exit),
        ));
        Ok(())
    }

    /// Stops the tunnel and resolves with the process exit code (`None` when
    /// the process died to a signal, or when there was no process to stop).
    pub async fn stop(&mut self) -> Result<Option<i32>, TunnelError> {
        if self.state != State::Running {
            return Err(TunnelError::invalid_state(LifecycleOp::Stop, self.state));
        }
        self.state = State::Stopping;
        self.publish_status("stopping");

        let code = match self.handle.as_mut() {
            Some(handle) => {
                self.suppress_exit.store(true, Ordering::SeqCst);
                match handle.terminate().await {
                    Ok(code) => code,
                    Err(err) => {
                        // Stop is not assumed to have succeeded.
                        self.suppress_exit.store(false, Ordering::SeqCst);
                        self.state = State::Running;
                        return Err(err);
                    }
                }
            }
            None => None,
        };

        if let Some(forwarder) = self.forwarder.take() {
            // Drains the trailing output, then ends at EOF.
            let _ = forwarder.await;
        }
        self.handle = None;
        self.state = State::NotRunning;
        self.publish_status("stopped");
        Ok(code)
    }

    fn publish_status(&self, text: &'static str) {
        self.bus.publish(
            Event::new(EventKind::Status)
                .with_tunnel(self.provider.name())
                .with_text(text),
        );
    }
}

/// Re-emits child output as events until both pipes close; announces an
/// unexpected close as `ProcessExited`.
fn spawn_forwarder(
    mut output: mpsc::Receiver<OutputLine>,
    mut scanner: Option<Box<dyn LineScanner>>,
    bus: Bus,
    name: &'static str,
    suppress_exit: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(line) = output.recv().await {
            if let Some(scanner) = scanner.as_mut() {
                if let Scan::Info(text) = scanner.scan(&line) {
                    bus.publish(Event::new(EventKind::Info).with_tunnel(name).with_text(text));
                }
            }
            let kind = match line.source {
                OutputSource::Stdout => EventKind::Stdout,
                OutputSource::Stderr => EventKind::Stderr,
            };
            bus.publish(Event::new(kind).with_tunnel(name).with_text(line.text));
        }
        if !suppress_exit.load(Ordering::SeqCst) {
            bus.publish(Event::new(EventKind::ProcessExited).with_tunnel(name));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::NullProvider;

    fn null_tunnel() -> Tunnel {
        Tunnel::new(Arc::new(NullProvider), TunnelConfig::default())
    }

    #[tokio::test]
    async fn start_fails_fast_from_every_conflicting_state() {
        for conflicting in [State::Starting, State::Running, State::Stopping] {
            let mut tunnel = null_tunnel();
            tunnel.state = conflicting;

            let err = tunnel.start().await.unwrap_err();
            assert_eq!(err.as_label(), "invalid_state_transition");
            assert_eq!(tunnel.state(), conflicting, "state must be unchanged");
        }
    }

    #[tokio::test]
    async fn stop_fails_fast_from_every_conflicting_state() {
        for conflicting in [State::NotRunning, State::Starting, State::Stopping] {
            let mut tunnel = null_tunnel();
            tunnel.state = conflicting;

            let err = tunnel.stop().await.unwrap_err();
            assert_eq!(err.as_label(), "invalid_state_transition");
            assert_eq!(tunnel.state(), conflicting, "state must be unchanged");
        }
    }

    #[tokio::test]
    async fn conflict_errors_name_the_phase() {
        let mut tunnel = null_tunnel();
        tunnel.state = State::Stopping;
        let err = tunnel.start().await.unwrap_err();
        assert_eq!(err.to_string(), "previous tunnel is still terminating");

        let mut tunnel = null_tunnel();
        let err = tunnel.stop().await.unwrap_err();
        assert_eq!(err.to_string(), "tunnel is not running");
    }

    #[tokio::test]
    async fn null_provider_lifecycle_is_reentrant() {
        let mut tunnel = null_tunnel();
        assert!(tunnel.is_downloaded());

        for _ in 0..2 {
            tunnel.start().await.unwrap();
            assert_eq!(tunnel.state(), State::Running);

            let code = tunnel.stop().await.unwrap();
            assert_eq!(code, None);
            assert_eq!(tunnel.state(), State::NotRunning);
        }
    }

    #[tokio::test]
    async fn status_events_trace_the_phases() {
        let mut tunnel = null_tunnel();
        let mut rx = tunnel.events();

        tunnel.start().await.unwrap();
        tunnel.stop().await.unwrap();

        let mut statuses = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::Status {
                statuses.push(ev.text.unwrap_or_default().to_string());
            }
        }
        assert_eq!(statuses, vec!["ready", "stopping", "stopped"]);
    }
}
