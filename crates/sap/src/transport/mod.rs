// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! UDP transport for SAP send/receive.
//!
//! Two socket roles, each exclusively owned by its component:
//! - [`AnnounceSocket`]: connected send socket used by the announcer
//! - [`SapListener`]: bound and multicast-joined receive socket yielding
//!   raw datagrams, one per [`SapListener::receive`] call

pub mod multicast;
pub mod udp;

pub use udp::{AnnounceSocket, SapListener};
