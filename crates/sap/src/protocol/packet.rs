// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SAP packet model (RFC 2974 Sec.4).
//!
//! A [`Packet`] is immutable value data: it is built right before encoding
//! or produced by decoding, and nothing mutates it in the background. The
//! announcer mutates only its own copy's message type when it transitions
//! to withdrawal.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::net::IpAddr;

// Flag byte layout (RFC 2974 Sec.4):
//
//  0                   1
//  0 1 2 3 4 5 6 7
// +-+-+-+-+-+-+-+-+
// | V=1 |A|R|T|E|C|
// +-+-+-+-+-+-+-+-+
//
// V: version (001), A: address family (0=IPv4, 1=IPv6), R: reserved,
// T: message type (0=announcement, 1=deletion), E: encrypted, C: compressed.
pub(crate) const FLAG_COMPRESSED: u8 = 1 << 0;
pub(crate) const FLAG_ENCRYPTED: u8 = 1 << 1;
pub(crate) const FLAG_DELETION: u8 = 1 << 2;
pub(crate) const FLAG_IPV6: u8 = 1 << 4;
pub(crate) const VERSION_MASK: u8 = 0b1110_0000;
pub(crate) const VERSION_BITS: u8 = 0b0010_0000;

/// The two SAP message kinds.
///
/// A deletion withdraws a previously announced session; it must carry the
/// same origin and id hash as the announcement it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Session announcement (periodic).
    Announcement,
    /// Session deletion (sent once to withdraw).
    Deletion,
}

/// One SAP announcement or deletion unit.
///
/// `origin` + `id_hash` form the session identity (see [`Packet::unique_id`]);
/// two packets with the same identity refer to the same announced session
/// regardless of payload content.
///
/// The `encrypted` flag is carried on the wire but no cryptographic
/// operation is performed by this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Announcement or deletion; controls the T flag bit.
    pub message_type: MessageType,
    /// 16-bit hash distinguishing concurrent sessions from the same origin.
    pub id_hash: u16,
    /// Address of the announcing host; selects the 4- or 16-byte encoding.
    pub origin: IpAddr,
    /// E flag bit, passed through untouched.
    pub encrypted: bool,
    /// When set, the payload section is zlib-compressed on the wire.
    pub compressed: bool,
    /// Opaque authentication data, length-prefixed by one byte on the wire.
    pub authentication_data: Vec<u8>,
    /// MIME type of the payload, e.g. `application/sdp`. An empty string
    /// omits the type field on the wire, which is only unambiguous when the
    /// payload starts with the SDP magic `v=0`.
    pub payload_type: String,
    /// The session description itself, uninterpreted.
    pub payload: Vec<u8>,
}

impl Packet {
    /// Convenience constructor for an uncompressed, unauthenticated
    /// announcement.
    pub fn announcement(
        origin: IpAddr,
        id_hash: u16,
        payload_type: &str,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            message_type: MessageType::Announcement,
            id_hash,
            origin,
            encrypted: false,
            compressed: false,
            authentication_data: Vec::new(),
            payload_type: payload_type.to_string(),
            payload,
        }
    }

    /// Session identity: origin address bytes followed by the id hash as a
    /// little-endian byte pair, base64-encoded.
    ///
    /// A deletion and the announcement it withdraws share the same value.
    pub fn unique_id(&self) -> String {
        let mut id = match self.origin {
            IpAddr::V4(v4) => v4.octets().to_vec(),
            IpAddr::V6(v6) => v6.octets().to_vec(),
        };
        id.push((self.id_hash & 0xff) as u8);
        id.push((self.id_hash >> 8) as u8);
        BASE64.encode(id)
    }
}
