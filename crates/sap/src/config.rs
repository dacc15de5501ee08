// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SAP protocol constants and runtime configuration.
//!
//! This module centralizes the RFC 2974 constants used by the codec and the
//! announcer. **Never hardcode these elsewhere!**

use std::net::Ipv4Addr;
use std::time::Duration;

/// SAP well-known UDP port (RFC 2974 Sec.3, IANA registered).
pub const SAP_PORT: u16 = 9875;

/// IPv4 global-scope SAP multicast group (RFC 2974 Sec.3).
///
/// Session announcements for global-scope sessions are sent to
/// 239.255.255.255; administratively scoped sessions use the highest
/// address in their scope zone instead.
pub const SAP_MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 255);

/// Total announcement bandwidth budget per group, in bits per second
/// (RFC 2974 Sec.3.1).
pub const BANDWIDTH_LIMIT_BITS: u64 = 4000;

/// Default lower bound for the announcement interval (RFC 2974 Sec.3.1:
/// "no more frequently than once every 300 seconds").
pub const MIN_INTERVAL_DEFAULT: Duration = Duration::from_secs(300);

/// Largest datagram the listener will accept (maximum UDP payload).
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// MIME type of SDP payloads, the only payload type this crate interprets.
pub const SDP_PAYLOAD_TYPE: &str = "application/sdp";

/// Announcer configuration.
///
/// `min_interval` is the only tunable scheduling knob: the announce interval
/// is the bandwidth-derived value from RFC 2974 Sec.3.1, clamped to at least
/// this duration.
#[derive(Debug, Clone)]
pub struct AnnounceConfig {
    /// Lower bound for the announcement interval.
    pub min_interval: Duration,
}

impl Default for AnnounceConfig {
    fn default() -> Self {
        Self {
            min_interval: MIN_INTERVAL_DEFAULT,
        }
    }
}

impl AnnounceConfig {
    /// Build a config from the environment.
    ///
    /// `SAP_MIN_INTERVAL_SECS` overrides the default 300 s lower bound
    /// (useful for tests and short-lived demo sessions).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var("SAP_MIN_INTERVAL_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => {
                    config.min_interval = Duration::from_secs(secs);
                    log::debug!("[config] SAP_MIN_INTERVAL_SECS override: {}s", secs);
                }
                _ => {
                    log::warn!(
                        "[config] Ignoring invalid SAP_MIN_INTERVAL_SECS='{}'",
                        raw
                    );
                }
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_min_interval_is_rfc_default() {
        let config = AnnounceConfig::default();
        assert_eq!(config.min_interval, Duration::from_secs(300));
    }
}
