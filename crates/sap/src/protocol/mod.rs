// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SAP wire protocol implementation (RFC 2974 Sec.4).
//!
//! This module contains the protocol-level pieces:
//! - Packet model: message type, flags, session identity
//! - Codec: byte-exact encode/decode of the SAP header and payload section,
//!   including zlib compression of the payload section

pub mod codec;
pub mod packet;

pub use codec::{DecodeError, EncodeError};
pub use packet::{MessageType, Packet};
