//! # Provider adapters.
//!
//! Each adapter specializes URL/executable resolution, argument construction
//! and readiness detection over the shared [`Tunnel`](crate::Tunnel)
//! lifecycle:
//!
//! - [`BrowserStack`] — platform-dependent binary, stdout phrase readiness
//! - [`TestingBot`] — jar under `java`, marker-file readiness, info dedup
//! - [`NullProvider`] — externally-managed tunnel, everything is a no-op
//!
//! [`from_name`] builds an adapter from its configuration section, for
//! callers that select the provider by a config string.

mod browserstack;
mod null;
mod provider;
mod testingbot;

use std::sync::Arc;

pub use browserstack::BrowserStack;
pub use null::NullProvider;
pub use provider::{LaunchPlan, LineScanner, Provider, ReadinessProbe, Scan};
pub use testingbot::TestingBot;

use crate::config::TunnelConfig;
use crate::error::TunnelError;

/// Creates the adapter named by `name` from its section of the config.
///
/// Fails with [`TunnelError::InvalidConfig`] when the name is unknown or the
/// matching credential section is missing.
pub fn from_name(name: &str, cfg: &TunnelConfig) -> Result<Arc<dyn Provider>, TunnelError> {
    match name {
        "browserstack" => {
            let section = cfg.browserstack.clone().ok_or(TunnelError::InvalidConfig {
                message: "browserstack section is missing from the configuration".into(),
            })?;
            Ok(Arc::new(BrowserStack::new(section)))
        }
        "testingbot" => {
            let section = cfg.testingbot.clone().ok_or(TunnelError::InvalidConfig {
                message: "testingbot section is missing from the configuration".into(),
            })?;
            Ok(Arc::new(TestingBot::new(section)))
        }
        "null" => Ok(Arc::new(NullProvider)),
        other => Err(TunnelError::InvalidConfig {
            message: format!(
                "unknown tunnel provider '{other}'; supported: browserstack, testingbot, null"
            ),
        }),
    }
}
