// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! sap-announce - periodically announce one session via SAP.
//!
//! Sends RFC 2974 announcements for a single session description until
//! Ctrl+C or `--timeout`, then withdraws the session with a Deletion
//! packet before exiting.

use chrono::Local;
use clap::Parser;
use colored::Colorize;
use sap::{AnnounceConfig, Announcer, Packet, SAP_MULTICAST_GROUP, SAP_PORT, SDP_PAYLOAD_TYPE};
use std::io::Read;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Periodically announce one session via SAP (RFC 2974)
#[derive(Parser, Debug)]
#[command(name = "sap-announce")]
#[command(version)]
#[command(about = "Announce a session description via SAP until interrupted")]
struct Args {
    /// Destination multicast group (or unicast peer)
    #[arg(short, long, default_value_t = IpAddr::V4(SAP_MULTICAST_GROUP))]
    dest: IpAddr,

    /// Destination UDP port
    #[arg(long, default_value_t = SAP_PORT)]
    port: u16,

    /// Origin address to carry in sent packets
    #[arg(short, long)]
    origin: IpAddr,

    /// Session id hash (identifies this session among the origin's sessions)
    #[arg(short, long, default_value_t = 0x2342)]
    id_hash: u16,

    /// MIME type of the payload
    #[arg(long, default_value = SDP_PAYLOAD_TYPE)]
    payload_type: String,

    /// Read the session description from this file (default: stdin)
    #[arg(short = 'f', long)]
    payload_file: Option<PathBuf>,

    /// Compress the payload section (zlib)
    #[arg(short, long)]
    compress: bool,

    /// Minimum announce interval in seconds, at least 1 (default: 300,
    /// or SAP_MIN_INTERVAL_SECS from the environment)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    min_interval: Option<u64>,

    /// Stop announcing after this many seconds (0 = run until Ctrl+C)
    #[arg(short, long, default_value_t = 0)]
    timeout: u64,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

fn main() {
    let args = Args::parse();

    if args.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = run_announce(&args) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_announce(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let payload = read_payload(args)?;

    let mut packet = Packet::announcement(args.origin, args.id_hash, &args.payload_type, payload);
    packet.compressed = args.compress;
    let session = packet.unique_id();

    let mut config = AnnounceConfig::from_env();
    if let Some(secs) = args.min_interval {
        config.min_interval = Duration::from_secs(secs);
    }
    let dest = SocketAddr::new(args.dest, args.port);
    let announcer = Announcer::new(dest, packet, &config)?;

    eprintln!(
        "{} {} {} (origin={}, id-hash={:04x}, interval={}s, session={})",
        ">>>".green().bold(),
        "Announcing to".bold(),
        dest.to_string().cyan(),
        args.origin,
        args.id_hash,
        announcer.interval().as_secs(),
        session.dimmed()
    );
    eprintln!("{}", "Press Ctrl+C to withdraw and stop".dimmed());

    let handle = announcer.spawn();

    let flag = handle.shutdown_flag();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::Relaxed);
    })?;

    if args.timeout > 0 {
        arm_timeout(handle.shutdown_flag(), Duration::from_secs(args.timeout));
    }

    // The loop resolves Cancelled once the withdrawal has been sent.
    match handle.join() {
        Ok(()) | Err(sap::AnnounceError::Cancelled) => {
            eprintln!(
                "{} {} session {} withdrawn",
                Local::now().format("%H:%M:%S%.3f"),
                "<<<".yellow().bold(),
                session
            );
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

/// Arm the `--timeout` timer: sets `flag` once `timeout` elapses. The
/// thread watches the flag while waiting, so a Ctrl+C that fires first
/// ends it instead of leaving it asleep for the rest of the period.
fn arm_timeout(flag: Arc<AtomicBool>, timeout: Duration) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let deadline = Instant::now() + timeout;
        while !flag.load(Ordering::Relaxed) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                flag.store(true, Ordering::Relaxed);
                return;
            }
            std::thread::sleep(remaining.min(Duration::from_millis(50)));
        }
    })
}

fn read_payload(args: &Args) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    match &args.payload_file {
        Some(path) => Ok(std::fs::read(path)?),
        None => {
            eprintln!("{}", "Reading session description from stdin...".dimmed());
            let mut payload = Vec::new();
            std::io::stdin().read_to_end(&mut payload)?;
            Ok(payload)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_interval_zero_is_rejected() {
        let err = Args::try_parse_from([
            "sap-announce",
            "--origin",
            "10.0.0.1",
            "--min-interval",
            "0",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn min_interval_one_is_accepted() {
        let args = Args::try_parse_from([
            "sap-announce",
            "--origin",
            "10.0.0.1",
            "--min-interval",
            "1",
        ])
        .unwrap();
        assert_eq!(args.min_interval, Some(1));
    }

    #[test]
    fn timeout_timer_sets_the_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        arm_timeout(Arc::clone(&flag), Duration::from_millis(20))
            .join()
            .unwrap();
        assert!(flag.load(Ordering::Relaxed));
    }

    #[test]
    fn timeout_timer_ends_early_on_shutdown() {
        let flag = Arc::new(AtomicBool::new(true));
        let timer = arm_timeout(Arc::clone(&flag), Duration::from_secs(3600));
        // Returns well before the hour is up because the flag is already set.
        timer.join().unwrap();
    }
}
