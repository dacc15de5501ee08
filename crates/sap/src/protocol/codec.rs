// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SAP wire codec (RFC 2974 Sec.4).
//!
//! Wire layout, big-endian throughout:
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! | V=1 |A|R|T|E|C|   auth len    |         msg id hash           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                origin source (32 or 128 bits)                 |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |          optional authentication data (auth len * 32 bits)    |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |        optional payload type + NUL, then payload ...          |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! When the C flag is set, the payload section (type + NUL + payload) is
//! zlib-compressed as one stream. Per RFC 2974 Sec.6, the type field may be
//! absent when the payload starts with the SDP magic `v=0`; decode sniffs
//! for the magic before scanning for the NUL delimiter.
//!
//! Encode always writes the type field when `payload_type` is non-empty,
//! even if the payload carries the SDP magic. A packet decoded via the
//! magic therefore re-encodes with an explicit `application/sdp` field,
//! which is longer than the omitted form but decodes to the same packet.

use super::packet::{
    MessageType, Packet, FLAG_COMPRESSED, FLAG_DELETION, FLAG_ENCRYPTED, FLAG_IPV6, VERSION_BITS,
    VERSION_MASK,
};
use crate::config::SDP_PAYLOAD_TYPE;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Largest authentication data length the one-byte length field can carry.
const MAX_AUTH_LEN: usize = 255;

/// Payload section prefix identifying SDP when the type field is omitted.
const SDP_MAGIC: &[u8] = b"v=0";

/// Errors from [`Packet::encode`].
#[derive(Debug)]
pub enum EncodeError {
    /// Authentication data does not fit the one-byte length field.
    /// Not retryable; the caller must shrink the field.
    AuthenticationDataTooLong(usize),
    /// Compressing the payload section failed.
    Compress(std::io::Error),
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthenticationDataTooLong(len) => {
                write!(f, "authentication data too long: {} bytes (max 255)", len)
            }
            Self::Compress(e) => write!(f, "payload compression failed: {}", e),
        }
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Compress(e) => Some(e),
            Self::AuthenticationDataTooLong(_) => None,
        }
    }
}

/// Errors from [`Packet::decode`].
///
/// Both variants are terminal for that datagram only; the listener loop
/// discards the datagram and keeps reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Fixed-size header fields could not be fully read.
    PacketTooShort,
    /// Bad version bits, unparsable payload-type framing, or a corrupt
    /// compressed payload section.
    InvalidIntegrity,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PacketTooShort => write!(f, "packet too short"),
            Self::InvalidIntegrity => write!(f, "packet integrity error"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl Packet {
    /// Encode this packet to its wire byte sequence.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        if self.authentication_data.len() > MAX_AUTH_LEN {
            return Err(EncodeError::AuthenticationDataTooLong(
                self.authentication_data.len(),
            ));
        }

        let mut flags = VERSION_BITS;
        if self.message_type == MessageType::Deletion {
            flags |= FLAG_DELETION;
        }
        if self.encrypted {
            flags |= FLAG_ENCRYPTED;
        }
        if self.compressed {
            flags |= FLAG_COMPRESSED;
        }

        // IPv4-mapped IPv6 origins use the 4-byte form, so the A bit stays
        // consistent with what a receiver will reconstruct.
        let origin: Vec<u8> = match self.origin {
            IpAddr::V4(v4) => v4.octets().to_vec(),
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => v4.octets().to_vec(),
                None => {
                    flags |= FLAG_IPV6;
                    v6.octets().to_vec()
                }
            },
        };

        let mut buf =
            Vec::with_capacity(4 + origin.len() + self.authentication_data.len() + self.payload.len());
        buf.push(flags);
        buf.push(self.authentication_data.len() as u8);
        buf.extend_from_slice(&self.id_hash.to_be_bytes());
        buf.extend_from_slice(&origin);
        buf.extend_from_slice(&self.authentication_data);

        let mut section = Vec::with_capacity(self.payload_type.len() + 1 + self.payload.len());
        if !self.payload_type.is_empty() {
            section.extend_from_slice(self.payload_type.as_bytes());
            section.push(0);
        }
        section.extend_from_slice(&self.payload);

        if self.compressed {
            let mut encoder = ZlibEncoder::new(buf, Compression::default());
            encoder.write_all(&section).map_err(EncodeError::Compress)?;
            buf = encoder.finish().map_err(EncodeError::Compress)?;
        } else {
            buf.extend_from_slice(&section);
        }

        Ok(buf)
    }

    /// Decode one datagram into a packet.
    pub fn decode(raw: &[u8]) -> Result<Self, DecodeError> {
        // flags + auth len + id hash
        if raw.len() < 4 {
            return Err(DecodeError::PacketTooShort);
        }

        let flags = raw[0];
        if flags & VERSION_MASK != VERSION_BITS {
            return Err(DecodeError::InvalidIntegrity);
        }

        let message_type = if flags & FLAG_DELETION != 0 {
            MessageType::Deletion
        } else {
            MessageType::Announcement
        };
        let compressed = flags & FLAG_COMPRESSED != 0;
        let encrypted = flags & FLAG_ENCRYPTED != 0;

        let auth_len = raw[1] as usize;
        let id_hash = u16::from_be_bytes([raw[2], raw[3]]);
        let mut offset = 4;

        let origin: IpAddr = if flags & FLAG_IPV6 != 0 {
            let bytes: [u8; 16] = raw
                .get(offset..offset + 16)
                .ok_or(DecodeError::PacketTooShort)?
                .try_into()
                .map_err(|_| DecodeError::PacketTooShort)?;
            offset += 16;
            IpAddr::V6(Ipv6Addr::from(bytes))
        } else {
            let bytes: [u8; 4] = raw
                .get(offset..offset + 4)
                .ok_or(DecodeError::PacketTooShort)?
                .try_into()
                .map_err(|_| DecodeError::PacketTooShort)?;
            offset += 4;
            IpAddr::V4(Ipv4Addr::from(bytes))
        };

        let authentication_data = raw
            .get(offset..offset + auth_len)
            .ok_or(DecodeError::PacketTooShort)?
            .to_vec();
        offset += auth_len;

        let section: Vec<u8> = if compressed {
            let mut decoder = ZlibDecoder::new(&raw[offset..]);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|_| DecodeError::InvalidIntegrity)?;
            out
        } else {
            raw[offset..].to_vec()
        };

        // RFC 2974 Sec.6: a packet without a payload type field starts with
        // the SDP `v=0` line, which is not a legal MIME content type. Check
        // the magic before scanning for the NUL delimiter.
        let (payload_type, payload) = if section.starts_with(SDP_MAGIC) {
            (SDP_PAYLOAD_TYPE.to_string(), section)
        } else {
            let nul = section
                .iter()
                .position(|&b| b == 0)
                .ok_or(DecodeError::InvalidIntegrity)?;
            let payload_type = std::str::from_utf8(&section[..nul])
                .map_err(|_| DecodeError::InvalidIntegrity)?
                .to_string();
            (payload_type, section[nul + 1..].to_vec())
        };

        Ok(Self {
            message_type,
            id_hash,
            origin,
            encrypted,
            compressed,
            authentication_data,
            payload_type,
            payload,
        })
    }
}
