// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SAP send and receive sockets.
//!
//! Sockets are built with `socket2` for option setup and converted into
//! `std::net::UdpSocket` for I/O.

use crate::config::MAX_DATAGRAM_SIZE;
use crate::transport::multicast::join_group;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

/// Multicast TTL for outgoing announcements. RFC 2974 recommends 255 for
/// global-scope sessions.
const ANNOUNCE_TTL: u32 = 255;

/// Connected UDP send socket owned by one announcer.
///
/// The transport family (IPv4/IPv6) is selected from the destination
/// address. The socket is released when the owning announcer is dropped.
pub struct AnnounceSocket {
    socket: UdpSocket,
    dest: SocketAddr,
}

impl AnnounceSocket {
    /// Dial a UDP socket towards `dest`.
    pub fn dial(dest: SocketAddr) -> io::Result<Self> {
        let (domain, bind_addr): (Domain, SocketAddr) = match dest.ip() {
            IpAddr::V4(_) => (Domain::IPV4, (Ipv4Addr::UNSPECIFIED, 0).into()),
            IpAddr::V6(_) => (Domain::IPV6, (Ipv6Addr::UNSPECIFIED, 0).into()),
        };

        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        if dest.ip().is_multicast() {
            match dest.ip() {
                IpAddr::V4(_) => {
                    socket.set_multicast_ttl_v4(ANNOUNCE_TTL)?;
                    socket.set_multicast_loop_v4(true)?;
                }
                IpAddr::V6(_) => {
                    socket.set_multicast_hops_v6(ANNOUNCE_TTL)?;
                    socket.set_multicast_loop_v6(true)?;
                }
            }
        }
        socket.bind(&bind_addr.into())?;

        let socket: UdpSocket = socket.into();
        socket.connect(dest)?;
        log::debug!("[udp] announce socket dialed to {}", dest);

        Ok(Self { socket, dest })
    }

    /// Send one datagram to the dialed destination.
    pub fn send(&self, buf: &[u8]) -> io::Result<usize> {
        self.socket.send(buf)
    }

    /// The dialed destination address.
    pub fn dest(&self) -> SocketAddr {
        self.dest
    }
}

/// Receive socket joined to a SAP multicast group.
///
/// Performs blocking reads, one datagram per [`receive`](Self::receive)
/// call. Decode failures are the caller's per-datagram concern; socket
/// errors terminate the owning loop.
pub struct SapListener {
    socket: UdpSocket,
}

impl SapListener {
    /// Bind the SAP port and join `group` on `iface` (or on discovered
    /// interfaces when `iface` is `None`).
    ///
    /// A non-multicast `group` is bound directly without joining, which
    /// gives a plain unicast listener (used by tests and point-to-point
    /// setups).
    pub fn join(group: IpAddr, iface: Option<Ipv4Addr>, port: u16) -> io::Result<Self> {
        let domain = match group {
            IpAddr::V4(_) => Domain::IPV4,
            IpAddr::V6(_) => Domain::IPV6,
        };

        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.set_recv_buffer_size(MAX_DATAGRAM_SIZE)?;

        let bind_addr: SocketAddr = if group.is_multicast() {
            match group {
                IpAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, port).into(),
                IpAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, port).into(),
            }
        } else {
            (group, port).into()
        };
        socket.bind(&bind_addr.into())?;

        let socket: UdpSocket = socket.into();
        if group.is_multicast() {
            join_group(&socket, group, iface)?;
        }
        log::debug!("[udp] listener bound to {} (group {})", bind_addr, group);

        Ok(Self { socket })
    }

    /// Block until one datagram arrives and return exactly its bytes.
    pub fn receive(&self) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let (n, _peer) = self.socket.recv_from(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Local address the listener is bound to (port is useful when bound
    /// with port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Set a receive timeout; `None` blocks indefinitely.
    pub fn set_receive_timeout(&self, timeout: Option<std::time::Duration>) -> io::Result<()> {
        self.socket.set_read_timeout(timeout)
    }
}
