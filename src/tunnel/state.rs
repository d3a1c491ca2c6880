//! # Tunnel lifecycle states.

/// Phase of a tunnel's lifecycle.
///
/// At most one of `Starting`/`Running`/`Stopping` holds at any time, and the
/// machine is re-entrant: after `stop()` completes the tunnel is back in
/// [`State::NotRunning`] and can be started again.
///
/// ```text
/// NotRunning ──start()──► Starting ──ready──► Running
///     ▲                      │                   │
///     └──────── failure ─────┘                   │
///     ▲                                          ▼
///     └───────── exit code ◄── Stopping ◄──── stop()
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// No process, no pending operation. The initial and terminal phase.
    NotRunning,
    /// `start()` is downloading, launching, or waiting for readiness.
    Starting,
    /// The tunnel is up and usable.
    Running,
    /// `stop()` is waiting for the process to exit.
    Stopping,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            State::NotRunning => "not running",
            State::Starting => "starting",
            State::Running => "running",
            State::Stopping => "stopping",
        })
    }
}
