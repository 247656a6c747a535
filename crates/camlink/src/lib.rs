//! Wi-Fi camera access over PTP/IP.
//!
//! Cameras with Wi-Fi speak PTP (the USB still-image protocol) over two TCP
//! connections on port 15740. This crate finds them on the local network, opens a
//! session, and lists and downloads photos.
//!
//! # Architecture
//!
//! - [`ptp`]: packet framing and dataset decoding, no I/O
//! - [`client`]: one blocking PTP/IP session ([`PtpIpClient`])
//! - [`discovery`]: concurrent, deadline-bounded network scan ([`discover`])
//! - [`bridge`]: single-camera facade with log and status events for app shells
//! - [`config`]: defaults with `CAMLINK_*` environment overrides
//!
//! Logging goes through the `log` facade. Binaries pick the backend.

// Warn on unused code to catch dead code early
#![warn(unused)]
// Warn on unused dependencies
#![warn(unused_crate_dependencies)]
// Warn on redundant path prefixes (e.g., std::io::Read when Read is imported)
#![warn(unused_qualifications)]
// Use log::* macros instead of println!/eprintln! for proper log level control
#![deny(clippy::print_stdout, clippy::print_stderr)]

//noinspection RsUnusedImport
// env_logger is only used by the camlink-probe binary
use env_logger as _;
//noinspection RsUnusedImport
// serde_json is used by the camlink-probe binary and in tests
#[cfg(not(test))]
use serde_json as _;

pub mod bridge;
pub mod client;
pub mod config;
pub mod discovery;
mod ignore_poison;
pub mod ptp;

#[cfg(test)]
mod test_support;

pub use bridge::{BridgeObserver, CameraBridge, ConnectResult, ImageEntry, LogEvent, StatusEvent};
pub use client::{PtpIpClient, PtpIpError, PtpResponse, Session};
pub use config::{ClientConfig, DEFAULT_PORT, DiscoveryConfig};
pub use discovery::{Camera, DiscoveryMethod, discover};
