//! Error types used by the tunnel lifecycle and its leaf components.
//!
//! Everything funnels into one enum, [`TunnelError`], because callers drive a
//! single lifecycle (`download`/`start`/`stop`) and match on the failure kind
//! rather than on which internal layer produced it.
//!
//! [`TunnelError::as_label`] provides a short stable snake_case label for
//! logs/metrics.

use std::io;

use thiserror::Error;

use crate::config::{Arch, Platform};
use crate::tunnel::State;

/// Lifecycle operation that a state guard refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOp {
    /// `Tunnel::start`.
    Start,
    /// `Tunnel::stop`.
    Stop,
}

/// # Errors produced by the tunnel runtime.
///
/// Fatal kinds (`UnsupportedPlatform`, `Spawn`, `InvalidState`) are not
/// retryable; the rest are surfaced to the caller, which owns any retry
/// policy — nothing in this crate retries automatically.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TunnelError {
    /// The adapter cannot resolve a download URL or executable for the host.
    #[error("{platform} on {arch} is not supported by {provider}")]
    UnsupportedPlatform {
        /// Provider that refused the host.
        provider: &'static str,
        /// Host operating system.
        platform: Platform,
        /// Host CPU architecture.
        arch: Arch,
    },

    /// The download endpoint answered with a non-2xx/3xx status.
    #[error("server error: {}", if body.is_empty() { format!("status {status}") } else { body.clone() })]
    DownloadServer {
        /// HTTP status code of the final response.
        status: u16,
        /// Response body text, possibly empty.
        body: String,
    },

    /// The redirect chain exceeded the configured hop limit.
    #[error("exceeded {limit} redirects fetching {url}")]
    TooManyRedirects {
        /// Configured hop limit.
        limit: usize,
        /// URL the chain started from.
        url: String,
    },

    /// An in-flight download was aborted by the caller.
    #[error("download was cancelled")]
    DownloadCanceled,

    /// The OS could not start the tunnel executable.
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        /// Program that failed to launch.
        command: String,
        /// Underlying OS error (typically ENOENT).
        #[source]
        source: io::Error,
    },

    /// The external process signaled failure through its output stream.
    #[error("the tunnel reported: {message}")]
    TunnelReported {
        /// Message captured from the process output.
        message: String,
    },

    /// `start`/`stop` was invoked while the tunnel was in a conflicting phase.
    #[error("{}", describe_conflict(*op, *state))]
    InvalidState {
        /// Operation that was refused.
        op: LifecycleOp,
        /// Phase the tunnel was in at the time.
        state: State,
    },

    /// A server URL in the configuration could not be parsed.
    #[error("invalid server url: {url}")]
    InvalidServer {
        /// The offending URL string.
        url: String,
    },

    /// A proxy URL could not be parsed into host/port/credentials.
    #[error("invalid proxy url: {url}")]
    InvalidProxy {
        /// The offending URL string.
        url: String,
    },

    /// The configuration is missing something the provider requires.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// What is missing or inconsistent.
        message: String,
    },

    /// An archive could not be unpacked.
    #[error("failed to extract archive: {message}")]
    Archive {
        /// Decoder error text.
        message: String,
    },

    /// Transport-level HTTP failure.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Filesystem or pipe I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl TunnelError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tunnelvisor::TunnelError;
    ///
    /// let err = TunnelError::DownloadCanceled;
    /// assert_eq!(err.as_label(), "download_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TunnelError::UnsupportedPlatform { .. } => "unsupported_platform",
            TunnelError::DownloadServer { .. } => "download_server_error",
            TunnelError::TooManyRedirects { .. } => "too_many_redirects",
            TunnelError::DownloadCanceled => "download_canceled",
            TunnelError::Spawn { .. } => "spawn_error",
            TunnelError::TunnelReported { .. } => "tunnel_reported_error",
            TunnelError::InvalidState { .. } => "invalid_state_transition",
            TunnelError::InvalidServer { .. } => "invalid_server",
            TunnelError::InvalidProxy { .. } => "invalid_proxy",
            TunnelError::InvalidConfig { .. } => "invalid_config",
            TunnelError::Archive { .. } => "archive_error",
            TunnelError::Http(_) => "http_error",
            TunnelError::Io(_) => "io_error",
        }
    }

    /// Shorthand constructor for state-guard failures.
    pub(crate) fn invalid_state(op: LifecycleOp, state: State) -> Self {
        TunnelError::InvalidState { op, state }
    }
}

/// One distinct message per conflicting phase, for both guarded operations.
fn describe_conflict(op: LifecycleOp, state: State) -> &'static str {
    match (op, state) {
        (LifecycleOp::Start, State::Running) => "tunnel is already running",
        (LifecycleOp::Start, State::Stopping) => "previous tunnel is still terminating",
        (LifecycleOp::Start, State::Starting) => "tunnel is already launching",
        (LifecycleOp::Start, State::NotRunning) => "tunnel is not running",
        (LifecycleOp::Stop, State::Stopping) => "tunnel is already terminating",
        (LifecycleOp::Stop, State::Starting) => "tunnel is still launching",
        (LifecycleOp::Stop, State::NotRunning) => "tunnel is not running",
        (LifecycleOp::Stop, State::Running) => "tunnel is already running",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_messages_are_distinct_per_state() {
        let starts = [State::Starting, State::Running, State::Stopping]
            .map(|s| describe_conflict(LifecycleOp::Start, s));
        let stops = [State::NotRunning, State::Starting, State::Stopping]
            .map(|s| describe_conflict(LifecycleOp::Stop, s));

        for msgs in [starts, stops] {
            for i in 0..msgs.len() {
                for j in (i + 1)..msgs.len() {
                    assert_ne!(msgs[i], msgs[j]);
                }
            }
        }
    }

    #[test]
    fn download_server_error_prefers_body_text() {
        let with_body = TunnelError::DownloadServer {
            status: 500,
            body: "disk quota exceeded".into(),
        };
        assert_eq!(with_body.to_string(), "server error: disk quota exceeded");

        let empty = TunnelError::DownloadServer {
            status: 404,
            body: String::new(),
        };
        assert_eq!(empty.to_string(), "server error: status 404");
    }
}
