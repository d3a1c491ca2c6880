//! Tunnel events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle, download-progress and process-output
//! events emitted by a [`Tunnel`](crate::Tunnel).
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the tunnel lifecycle (status), the download progress
//!   hook, the readiness scanner (info), the output forwarder (stdout/stderr,
//!   process exit).
//! - **Consumers**: anything holding a receiver from [`Bus::subscribe`], and
//!   the [`SubscriberSet`](crate::subscribers::SubscriberSet) fan-out worker.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
