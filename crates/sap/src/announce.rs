// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Periodic SAP announcer (RFC 2974 Sec.3.1).
//!
//! Sessions must be announced repeatedly; the interval is derived from the
//! encoded packet size so that all sessions in a group share a 4000 bit/s
//! announcement budget, and each wait is jittered by up to a third of the
//! interval in either direction to avoid announcement synchronization.
//!
//! Cancellation is a two-phase protocol, not silent termination: the loop
//! transitions Running -> Withdrawing -> Stopped, and the Withdrawing phase
//! sends one Deletion packet for the same session identity before the loop
//! returns.

use crate::config::{AnnounceConfig, BANDWIDTH_LIMIT_BITS};
use crate::protocol::{EncodeError, MessageType, Packet};
use crate::transport::AnnounceSocket;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Shutdown flag poll granularity while waiting between announcements.
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Errors terminating an announcer.
#[derive(Debug)]
pub enum AnnounceError {
    /// Encoding the announcement or withdrawal packet failed.
    Encode(EncodeError),
    /// Dialing the destination socket failed.
    Socket(std::io::Error),
    /// A send on the destination socket failed.
    Send(std::io::Error),
    /// The shutdown signal was observed; the withdrawal has been sent.
    Cancelled,
}

impl std::fmt::Display for AnnounceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode(e) => write!(f, "encoding announcement packet: {}", e),
            Self::Socket(e) => write!(f, "dialing announce socket: {}", e),
            Self::Send(e) => write!(f, "sending announcement packet: {}", e),
            Self::Cancelled => write!(f, "announcer cancelled"),
        }
    }
}

impl std::error::Error for AnnounceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Encode(e) => Some(e),
            Self::Socket(e) | Self::Send(e) => Some(e),
            Self::Cancelled => None,
        }
    }
}

/// Source of jitter offsets for the announce scheduler.
///
/// Injectable so tests can supply a deterministic source and assert the
/// offset bound exactly; production uses [`FastrandJitter`].
pub trait JitterSource: Send {
    /// Uniformly distributed integer in `lo..hi`.
    fn sample(&mut self, lo: i64, hi: i64) -> i64;
}

/// Default jitter source backed by `fastrand`.
pub struct FastrandJitter(fastrand::Rng);

impl FastrandJitter {
    pub fn new() -> Self {
        Self(fastrand::Rng::new())
    }
}

impl Default for FastrandJitter {
    fn default() -> Self {
        Self::new()
    }
}

impl JitterSource for FastrandJitter {
    fn sample(&mut self, lo: i64, hi: i64) -> i64 {
        self.0.i64(lo..hi)
    }
}

/// Base announce interval per RFC 2974 Sec.3.1:
/// `max(min_interval, 8 * packet_bytes / 4000 bit/s)`.
pub(crate) fn announce_interval(encoded_len: usize, min_interval: Duration) -> Duration {
    let bandwidth_share = Duration::from_secs(8 * encoded_len as u64 / BANDWIDTH_LIMIT_BITS);
    bandwidth_share.max(min_interval)
}

/// Jittered wait before the next announcement: the base interval offset by
/// a uniform sample from `[-interval/3, +interval/3)`.
pub(crate) fn jittered_interval(interval: Duration, jitter: &mut dyn JitterSource) -> Duration {
    let secs = interval.as_secs() as i64;
    let spread = secs / 3;
    let offset = if spread == 0 {
        0
    } else {
        jitter.sample(-spread, spread)
    };
    Duration::from_secs((secs + offset) as u64)
}

/// Announcer loop phases. The withdrawal send is the Withdrawing phase's
/// exit action, not a deferred cleanup.
enum Phase {
    Running,
    Withdrawing,
    Stopped,
}

/// Periodic announcer for one session.
///
/// Owns its destination socket and pre-encoded packet exclusively for its
/// lifetime; multiple announcers for distinct sessions are fully
/// independent.
pub struct Announcer {
    socket: AnnounceSocket,
    packet: Packet,
    encoded: Vec<u8>,
    interval: Duration,
    jitter: Box<dyn JitterSource>,
}

impl Announcer {
    /// Build an announcer for `packet` towards `dest`.
    ///
    /// Fixes the packet type to Announcement, encodes it once, dials a UDP
    /// socket (IPv4 or IPv6 by destination family) and derives the announce
    /// interval from the encoded size and `config.min_interval`.
    pub fn new(
        dest: SocketAddr,
        mut packet: Packet,
        config: &AnnounceConfig,
    ) -> Result<Self, AnnounceError> {
        packet.message_type = MessageType::Announcement;
        let encoded = packet.encode().map_err(AnnounceError::Encode)?;
        let socket = AnnounceSocket::dial(dest).map_err(AnnounceError::Socket)?;
        let interval = announce_interval(encoded.len(), config.min_interval);

        log::debug!(
            "[announce] session {} -> {} ({} bytes, interval {}s)",
            packet.unique_id(),
            dest,
            encoded.len(),
            interval.as_secs()
        );

        Ok(Self {
            socket,
            packet,
            encoded,
            interval,
            jitter: Box::new(FastrandJitter::new()),
        })
    }

    /// Replace the jitter source (deterministic scheduling in tests).
    pub fn with_jitter(mut self, jitter: Box<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    /// The derived base announce interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run the announce loop until `shutdown` is set or a send fails.
    ///
    /// On shutdown, one Deletion packet with the same session identity is
    /// sent before the loop returns `Err(AnnounceError::Cancelled)`. A
    /// failed withdrawal encode or send is surfaced instead, without retry.
    pub fn run(mut self, shutdown: &AtomicBool) -> Result<(), AnnounceError> {
        let mut phase = Phase::Running;
        loop {
            match phase {
                Phase::Running => {
                    self.socket.send(&self.encoded).map_err(AnnounceError::Send)?;
                    log::debug!(
                        "[announce] sent announcement ({} bytes, session {})",
                        self.encoded.len(),
                        self.packet.unique_id()
                    );

                    let wait = jittered_interval(self.interval, self.jitter.as_mut());
                    if wait_or_shutdown(wait, shutdown) {
                        phase = Phase::Withdrawing;
                    }
                }
                Phase::Withdrawing => {
                    self.packet.message_type = MessageType::Deletion;
                    let raw = self.packet.encode().map_err(AnnounceError::Encode)?;
                    self.socket.send(&raw).map_err(AnnounceError::Send)?;
                    log::debug!(
                        "[announce] sent withdrawal for session {}",
                        self.packet.unique_id()
                    );
                    phase = Phase::Stopped;
                }
                Phase::Stopped => return Err(AnnounceError::Cancelled),
            }
        }
    }

    /// Run the announce loop on a background thread.
    ///
    /// The returned handle owns the shutdown flag; dropping it stops the
    /// announcer (withdrawal included) and joins the thread.
    pub fn spawn(self) -> AnnouncerHandle {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let handle = thread::spawn(move || self.run(&flag));
        AnnouncerHandle {
            handle: Some(handle),
            shutdown,
        }
    }
}

/// Wait for `total` or until `shutdown` is set, polling in small slices so
/// cancellation is observed promptly. Returns true when shutdown was seen.
fn wait_or_shutdown(total: Duration, shutdown: &AtomicBool) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return true;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return shutdown.load(Ordering::Relaxed);
        }
        thread::sleep(remaining.min(SHUTDOWN_POLL));
    }
}

/// Handle to a background announcer thread.
pub struct AnnouncerHandle {
    handle: Option<JoinHandle<Result<(), AnnounceError>>>,
    shutdown: Arc<AtomicBool>,
}

impl AnnouncerHandle {
    /// The shared shutdown flag, for wiring into signal handlers.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Signal shutdown and wait for the withdrawal to be sent.
    ///
    /// A clean cancellation maps to `Ok(())`; encode/send failures are
    /// returned as-is.
    pub fn shutdown(mut self) -> Result<(), AnnounceError> {
        self.shutdown.store(true, Ordering::Relaxed);
        match self.join_inner() {
            Err(AnnounceError::Cancelled) => Ok(()),
            other => other,
        }
    }

    /// Wait for the announcer to stop without signalling it (the flag may
    /// be set from elsewhere, e.g. a Ctrl-C handler).
    pub fn join(mut self) -> Result<(), AnnounceError> {
        self.join_inner()
    }

    fn join_inner(&mut self) -> Result<(), AnnounceError> {
        match self.handle.take() {
            Some(handle) => match handle.join() {
                Ok(result) => result,
                Err(_) => Err(AnnounceError::Cancelled),
            },
            None => Ok(()),
        }
    }
}

impl Drop for AnnouncerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        let _ = self.join_inner();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SDP_PAYLOAD_TYPE;
    use std::net::UdpSocket;

    struct FixedJitter(i64);

    impl JitterSource for FixedJitter {
        fn sample(&mut self, lo: i64, hi: i64) -> i64 {
            assert!(lo <= self.0 && self.0 < hi);
            self.0
        }
    }

    fn test_packet() -> Packet {
        Packet::announcement(
            "10.1.2.3".parse().unwrap(),
            0x0101,
            SDP_PAYLOAD_TYPE,
            b"v=0\r\no=- 1 1 IN IP4 10.1.2.3\r\ns=test\r\n".to_vec(),
        )
    }

    #[test]
    fn interval_small_packet_clamps_to_minimum() {
        let interval = announce_interval(1000, Duration::from_secs(300));
        assert_eq!(interval, Duration::from_secs(300));
    }

    #[test]
    fn interval_large_packet_uses_bandwidth_share() {
        let interval = announce_interval(200_000, Duration::from_secs(300));
        assert_eq!(interval, Duration::from_secs(400));
    }

    #[test]
    fn jitter_stays_within_one_third_spread() {
        let interval = Duration::from_secs(300);
        let mut jitter = FastrandJitter::new();
        for _ in 0..200 {
            let wait = jittered_interval(interval, &mut jitter);
            assert!(wait >= Duration::from_secs(200), "wait {:?} too short", wait);
            assert!(wait <= Duration::from_secs(400), "wait {:?} too long", wait);
        }
    }

    #[test]
    fn jitter_offset_is_applied() {
        let interval = Duration::from_secs(300);
        let mut plus = FixedJitter(80);
        assert_eq!(
            jittered_interval(interval, &mut plus),
            Duration::from_secs(380)
        );
        let mut minus = FixedJitter(-99);
        assert_eq!(
            jittered_interval(interval, &mut minus),
            Duration::from_secs(201)
        );
    }

    #[test]
    fn zero_spread_interval_has_no_jitter() {
        let mut jitter = FastrandJitter::new();
        assert_eq!(
            jittered_interval(Duration::from_secs(2), &mut jitter),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn cancellation_sends_one_matching_deletion() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let dest = receiver.local_addr().unwrap();

        let packet = test_packet();
        let session = packet.unique_id();
        let announcer =
            Announcer::new(dest, packet, &AnnounceConfig::default()).unwrap();

        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let worker = thread::spawn(move || announcer.run(&flag));

        let mut buf = [0u8; 2048];
        let (n, _) = receiver.recv_from(&mut buf).unwrap();
        let first = Packet::decode(&buf[..n]).unwrap();
        assert_eq!(first.message_type, MessageType::Announcement);
        assert_eq!(first.unique_id(), session);

        shutdown.store(true, Ordering::Relaxed);

        let (n, _) = receiver.recv_from(&mut buf).unwrap();
        let withdrawal = Packet::decode(&buf[..n]).unwrap();
        assert_eq!(withdrawal.message_type, MessageType::Deletion);
        assert_eq!(withdrawal.unique_id(), session);

        let result = worker.join().unwrap();
        assert!(matches!(result, Err(AnnounceError::Cancelled)));

        // exactly one withdrawal: nothing else arrives
        receiver
            .set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();
        assert!(receiver.recv_from(&mut buf).is_err());
    }

    #[test]
    fn immediate_cancellation_still_withdraws() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let dest = receiver.local_addr().unwrap();

        let announcer =
            Announcer::new(dest, test_packet(), &AnnounceConfig::default()).unwrap();
        let shutdown = AtomicBool::new(true);
        let result = announcer.run(&shutdown);
        assert!(matches!(result, Err(AnnounceError::Cancelled)));

        let mut buf = [0u8; 2048];
        let (n, _) = receiver.recv_from(&mut buf).unwrap();
        assert_eq!(
            Packet::decode(&buf[..n]).unwrap().message_type,
            MessageType::Announcement
        );
        let (n, _) = receiver.recv_from(&mut buf).unwrap();
        assert_eq!(
            Packet::decode(&buf[..n]).unwrap().message_type,
            MessageType::Deletion
        );
    }

    #[test]
    fn spawn_handle_shutdown_is_clean() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        let dest = receiver.local_addr().unwrap();

        let announcer =
            Announcer::new(dest, test_packet(), &AnnounceConfig::default()).unwrap();
        let handle = announcer.spawn();
        // give the loop a moment to send the first announcement
        thread::sleep(Duration::from_millis(100));
        assert!(handle.shutdown().is_ok());
    }
}
