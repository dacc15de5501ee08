// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # SAP - Session Announcement Protocol (RFC 2974)
//!
//! A pure Rust implementation of SAP, the UDP-multicast mechanism used to
//! periodically advertise and withdraw session descriptions (typically SDP).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sap::{AnnounceConfig, Announcer, Packet, SAP_PORT};
//! use std::net::SocketAddr;
//!
//! fn main() -> Result<(), sap::AnnounceError> {
//!     let packet = Packet::announcement(
//!         "192.168.1.100".parse().unwrap(),
//!         0x2342,
//!         sap::SDP_PAYLOAD_TYPE,
//!         b"v=0\r\no=- 0 0 IN IP4 192.168.1.100\r\ns=demo\r\n".to_vec(),
//!     );
//!
//!     let dest = SocketAddr::new(sap::SAP_MULTICAST_GROUP.into(), SAP_PORT);
//!     let announcer = Announcer::new(dest, packet, &AnnounceConfig::default())?;
//!
//!     // Announce periodically until shutdown; a Deletion packet is sent
//!     // for the same session identity before the handle resolves.
//!     let handle = announcer.spawn();
//!     handle.shutdown()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +-------------------------------------------------------------+
//! |                        Tools Layer                          |
//! |        sap-announce (send) | sap-monitor (receive)          |
//! +-------------------------------------------------------------+
//! |                      Scheduler Layer                        |
//! |   Announcer: bandwidth-derived interval, jitter, withdraw   |
//! +-------------------------------------------------------------+
//! |                       Protocol Layer                        |
//! |   Packet model | wire codec | zlib payload compression      |
//! +-------------------------------------------------------------+
//! |                      Transport Layer                        |
//! |   UDP send socket | multicast group join | SAP listener     |
//! +-------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Packet`] | One SAP announcement or deletion, with its session identity |
//! | [`Announcer`] | Cancellable periodic-send loop per RFC 2974 Sec.3.1 |
//! | [`SapListener`] | Joined multicast socket yielding raw datagrams |
//! | [`AnnounceConfig`] | Scheduler tuning (minimum announce interval) |
//!
//! ## See Also
//!
//! - [RFC 2974 - Session Announcement Protocol](https://www.rfc-editor.org/rfc/rfc2974)
//! - [RFC 8866 - SDP](https://www.rfc-editor.org/rfc/rfc8866)

/// Announcement scheduler (periodic send loop, jitter, withdrawal).
pub mod announce;
/// Protocol constants and runtime configuration.
pub mod config;
/// SAP wire protocol (packet model and codec).
pub mod protocol;
/// UDP transport (send socket, multicast join, listener).
pub mod transport;

pub use announce::{AnnounceError, Announcer, AnnouncerHandle, JitterSource};
pub use config::{
    AnnounceConfig, BANDWIDTH_LIMIT_BITS, MAX_DATAGRAM_SIZE, MIN_INTERVAL_DEFAULT,
    SAP_MULTICAST_GROUP, SAP_PORT, SDP_PAYLOAD_TYPE,
};
pub use protocol::{DecodeError, EncodeError, MessageType, Packet};
pub use transport::{AnnounceSocket, SapListener};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
