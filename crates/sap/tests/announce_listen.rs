// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// End-to-end loopback: announcer -> UDP -> listener -> codec, the same
// datagram path sap-monitor uses against a live group.

use sap::{AnnounceConfig, Announcer, MessageType, Packet, SapListener, SDP_PAYLOAD_TYPE};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

fn session_packet() -> Packet {
    let mut packet = Packet::announcement(
        "192.0.2.17".parse().unwrap(),
        0x4242,
        SDP_PAYLOAD_TYPE,
        b"v=0\r\no=- 42 42 IN IP4 192.0.2.17\r\ns=loopback\r\nm=audio 5004 RTP/AVP 0\r\n"
            .to_vec(),
    );
    packet.compressed = true;
    packet
}

#[test]
fn announce_withdraw_observed_by_listener() {
    let listener = SapListener::join(IpAddr::V4(Ipv4Addr::LOCALHOST), None, 0).unwrap();
    listener
        .set_receive_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let dest = listener.local_addr().unwrap();

    let packet = session_packet();
    let session = packet.unique_id();
    let handle = Announcer::new(dest, packet.clone(), &AnnounceConfig::default())
        .unwrap()
        .spawn();

    let announcement = Packet::decode(&listener.receive().unwrap()).unwrap();
    assert_eq!(announcement, packet);
    assert_eq!(announcement.unique_id(), session);

    handle.shutdown().unwrap();

    let withdrawal = Packet::decode(&listener.receive().unwrap()).unwrap();
    assert_eq!(withdrawal.message_type, MessageType::Deletion);
    assert_eq!(withdrawal.unique_id(), session);
    // identical content apart from the message type
    assert_eq!(withdrawal.payload, announcement.payload);
}

#[test]
fn listener_survives_malformed_datagrams() {
    // A malformed datagram is a per-datagram decode error; the listener
    // socket keeps yielding subsequent datagrams.
    let listener = SapListener::join(IpAddr::V4(Ipv4Addr::LOCALHOST), None, 0).unwrap();
    listener
        .set_receive_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let dest = listener.local_addr().unwrap();

    let sender = sap::AnnounceSocket::dial(dest).unwrap();
    sender.send(&[0xFF, 0x00, 0x01]).unwrap();
    let good = session_packet();
    sender.send(&good.encode().unwrap()).unwrap();

    let bad = listener.receive().unwrap();
    assert!(Packet::decode(&bad).is_err());

    let next = Packet::decode(&listener.receive().unwrap()).unwrap();
    assert_eq!(next, good);
}
