//! Archive download manager.
//!
//! Fetches a tunnel archive over HTTP(S), follows redirects up to a bounded
//! hop count, reports byte-level progress, and extracts the result into the
//! install directory.
//!
//! The artifact-presence shortcut ("already downloaded, skip the network")
//! lives one level up in [`Tunnel::download`](crate::Tunnel::download),
//! because only the lifecycle knows which file marks a completed install.

mod download;
mod extract;

pub use download::download;
