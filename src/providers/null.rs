//! # No-op adapter for externally-managed tunnels.
//!
//! When the endpoint is already reachable by the remote provider (a shared
//! tunnel, a VPN, a CI-managed daemon), callers still want the uniform
//! lifecycle. `NullProvider` satisfies it without downloading or launching
//! anything: `start()` goes straight to `Running`, `stop()` resolves with no
//! exit code.

use std::path::{Path, PathBuf};

use crate::config::{Host, TunnelConfig};
use crate::error::TunnelError;
use crate::providers::provider::{LaunchPlan, Provider, ReadinessProbe};

/// Adapter for a tunnel that is managed outside this process.
#[derive(Debug, Default)]
pub struct NullProvider;

impl Provider for NullProvider {
    fn name(&self) -> &'static str {
        "null"
    }

    fn artifact(&self, _host: &Host) -> Option<PathBuf> {
        None
    }

    fn command(&self, _dir: &Path, _host: &Host) -> Option<PathBuf> {
        None
    }

    fn download_url(&self, _host: &Host) -> Result<Option<String>, TunnelError> {
        Ok(None)
    }

    /// Never launched; the plan exists only to satisfy the contract.
    fn plan(&self, _cfg: &TunnelConfig) -> Result<LaunchPlan, TunnelError> {
        Ok(LaunchPlan {
            args: Vec::new(),
            probe: ReadinessProbe::FirstOutput,
            scanner: None,
        })
    }
}
