//! # tunnelvisor
//!
//! **tunnelvisor** supervises the closed-source tunnel binaries that cloud
//! browser-testing providers ship (BrowserStack Local, the TestingBot
//! tunnel): downloading them, launching them, deciding when they are ready
//! for traffic, and shutting them down — behind one lifecycle contract so
//! calling code can treat any provider interchangeably.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌───────────────┐  ┌──────────────┐  ┌──────────────┐
//!     │  BrowserStack │  │  TestingBot  │  │ NullProvider │   Provider
//!     │ (stdout scan) │  │ (marker file)│  │   (no-op)    │   adapters
//!     └───────┬───────┘  └──────┬───────┘  └──────┬───────┘
//!             └────────────────┬┴────────────────┬┘
//!                              ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Tunnel (lifecycle state machine)                                 │
//! │  - State: NotRunning → Starting → Running → Stopping → NotRunning │
//! │  - Bus (broadcast events)                                         │
//! │  - owns at most one ProcessHandle per run                         │
//! └──────┬──────────────────────────────┬─────────────────────────────┘
//!        ▼                              ▼
//! ┌───────────────────┐        ┌────────────────────┐
//! │  fetch            │        │  process           │
//! │  (HTTP + extract) │        │  (spawn/terminate) │
//! └───────────────────┘        └────────────────────┘
//!
//! Event flow:
//!   Tunnel ── publish(Event) ──► Bus ──► caller receivers
//!                                  └───► SubscriberSet ──► Subscribe impls
//! ```
//!
//! ### Lifecycle
//! ```text
//! start():
//!   ├─► download archive if absent (Progress events)
//!   ├─► build provider argument vector
//!   ├─► spawn vendor binary
//!   ├─► wait for the provider's readiness signal
//!   │     (output phrase, marker file, or first output)
//!   └─► Running; child output re-emitted as Stdout/Stderr events
//!
//! stop():
//!   ├─► SIGINT the child, wait for the real exit
//!   └─► NotRunning; resolves with the exit code
//! ```
//!
//! ## Features
//! | Area            | Description                                            | Key types / traits                       |
//! |-----------------|--------------------------------------------------------|------------------------------------------|
//! | **Lifecycle**   | Guarded, re-entrant start/stop over any provider.      | [`Tunnel`], [`State`]                    |
//! | **Providers**   | URL/args/readiness specialization per vendor.          | [`Provider`], [`BrowserStack`], [`TestingBot`] |
//! | **Events**      | Progress, status, and process output as one stream.    | [`Event`], [`EventKind`], [`Bus`]        |
//! | **Subscribers** | Isolated fan-out to reporters.                         | [`Subscribe`], [`SubscriberSet`]         |
//! | **Errors**      | Typed failures with stable log labels.                 | [`TunnelError`]                          |
//! | **Config**      | Topology + credentials from an external loader.        | [`TunnelConfig`], [`ProxyConfig`]        |
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use tunnelvisor::{BrowserStack, BrowserStackConfig, Tunnel, TunnelConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = TunnelConfig {
//!         servers: vec!["http://localhost:9000".into()],
//!         ..TunnelConfig::default()
//!     };
//!     let provider = Arc::new(BrowserStack::new(BrowserStackConfig {
//!         access_key: "<access-key>".into(),
//!     }));
//!     let mut tunnel = Tunnel::new(provider, cfg);
//!
//!     let mut events = tunnel.events();
//!     tokio::spawn(async move {
//!         while let Ok(ev) = events.recv().await {
//!             // hand off to a reporter
//!             let _ = ev;
//!         }
//!     });
//!
//!     tunnel.start().await?;
//!     // ... run the suite against the remote browsers ...
//!     let exit = tunnel.stop().await?;
//!     println!("tunnel exited with {exit:?}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod fetch;
pub mod process;
pub mod providers;
pub mod subscribers;
pub mod tunnel;

// ---- Public re-exports ----

pub use config::{
    Arch, BrowserStackConfig, Host, Platform, ProxyConfig, ServerDescriptor, TestingBotConfig,
    TunnelConfig,
};
pub use error::{LifecycleOp, TunnelError};
pub use events::{Bus, Event, EventKind};
pub use process::{OutputLine, OutputSource};
pub use providers::{
    BrowserStack, LaunchPlan, LineScanner, NullProvider, Provider, ReadinessProbe, Scan,
    TestingBot,
};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use tunnel::{State, Tunnel};
