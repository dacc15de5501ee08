// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! sap-monitor - watch SAP announcements on a multicast group.
//!
//! Joins the SAP group, decodes each datagram and prints one line per
//! packet. Malformed datagrams are reported and skipped; only socket
//! failures stop the monitor.

use chrono::Local;
use clap::Parser;
use colored::Colorize;
use sap::{MessageType, Packet, SapListener, SAP_MULTICAST_GROUP, SAP_PORT};
use std::net::{IpAddr, Ipv4Addr};

/// Monitor SAP announcements on a multicast group
#[derive(Parser, Debug)]
#[command(name = "sap-monitor")]
#[command(version)]
#[command(about = "Listen for SAP announcements and print them")]
struct Args {
    /// Multicast group to listen to
    #[arg(short, long, default_value_t = IpAddr::V4(SAP_MULTICAST_GROUP))]
    dest: IpAddr,

    /// UDP port to listen on
    #[arg(long, default_value_t = SAP_PORT)]
    port: u16,

    /// Local IPv4 interface address to join the group on
    #[arg(short, long)]
    iface: Option<Ipv4Addr>,

    /// Write received payloads to <idhash>.sdp in the current directory
    #[arg(short, long)]
    write_file: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

fn main() {
    let args = Args::parse();

    if args.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = run_monitor(&args) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_monitor(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let listener = SapListener::join(args.dest, args.iface, args.port)?;

    eprintln!(
        "{} {} {}:{}",
        ">>>".green().bold(),
        "Listening for SAP packets on".bold(),
        args.dest.to_string().cyan(),
        args.port
    );

    loop {
        // Socket errors are fatal to the monitor; decode errors are not.
        let raw = listener.receive()?;

        let packet = match Packet::decode(&raw) {
            Ok(packet) => packet,
            Err(e) => {
                eprintln!(
                    "{} {}: {} ({} bytes)",
                    Local::now().format("%H:%M:%S%.3f"),
                    "Discarding datagram".yellow(),
                    e,
                    raw.len()
                );
                continue;
            }
        };

        print_packet(&packet, raw.len());

        if args.write_file {
            if let Err(e) = write_payload(&packet) {
                eprintln!("{}: {}", "Failed to write payload".yellow(), e);
            }
        }
    }
}

fn print_packet(packet: &Packet, wire_len: usize) {
    let kind = match packet.message_type {
        MessageType::Announcement => "announce".green(),
        MessageType::Deletion => "delete".red(),
    };

    println!(
        "{} {} origin={} id-hash={:04x} type={} compressed={} {} bytes",
        Local::now().format("%H:%M:%S%.3f"),
        kind.bold(),
        packet.origin.to_string().cyan(),
        packet.id_hash,
        packet.payload_type,
        packet.compressed,
        wire_len
    );
}

fn write_payload(packet: &Packet) -> std::io::Result<()> {
    let filename = format!("{:04x}.sdp", packet.id_hash);
    std::fs::write(&filename, &packet.payload)?;
    eprintln!("    {} {}", "wrote".dimmed(), filename);
    Ok(())
}
