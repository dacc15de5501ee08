// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Multicast group management and interface discovery.
//!
//! Handles joining the SAP multicast group and picking suitable local
//! interfaces when the caller does not name one.

use std::io;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// Join a SAP multicast group on the given interface, or on all suitable
/// interfaces when `iface` is `None`.
///
/// Joining is tolerant per interface: an interface that cannot join (no
/// multicast route, already joined on the same NIC) is skipped with a debug
/// log rather than failing the whole listener.
pub fn join_group(socket: &UdpSocket, group: IpAddr, iface: Option<Ipv4Addr>) -> io::Result<()> {
    match group {
        IpAddr::V4(group) => {
            let interfaces = match iface {
                Some(addr) => vec![addr],
                None => multicast_interfaces()?,
            };

            if interfaces.is_empty() {
                log::debug!("[mcast] no suitable interfaces found, joining on UNSPECIFIED");
                socket.join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)?;
            } else {
                for addr in &interfaces {
                    match socket.join_multicast_v4(&group, addr) {
                        Ok(()) => {
                            log::debug!("[mcast] join_multicast_v4({}) on {}", group, addr);
                        }
                        Err(e) if e.raw_os_error() == Some(98) => {
                            // EADDRINUSE: already joined on the same physical NIC
                            log::debug!(
                                "[mcast] join_multicast_v4({}) on {} - already joined, skipping",
                                group,
                                addr
                            );
                        }
                        Err(e) => {
                            log::debug!(
                                "[mcast] join_multicast_v4({}) on {} failed (non-fatal): {}",
                                group,
                                addr,
                                e
                            );
                        }
                    }
                }
            }

            socket.set_multicast_loop_v4(true)?;
        }
        IpAddr::V6(group) => {
            // Interface index 0 lets the kernel pick the default interface.
            socket.join_multicast_v6(&group, 0)?;
            socket.set_multicast_loop_v6(true)?;
            log::debug!("[mcast] join_multicast_v6({}) on default interface", group);
        }
    }

    Ok(())
}

/// All non-loopback IPv4 interface addresses suitable for multicast.
///
/// `SAP_MULTICAST_IF` overrides discovery with a single address (useful for
/// testing and for hosts with several candidate interfaces).
pub fn multicast_interfaces() -> io::Result<Vec<Ipv4Addr>> {
    if let Ok(var) = std::env::var("SAP_MULTICAST_IF") {
        if let Ok(addr) = var.parse::<Ipv4Addr>() {
            log::debug!("[mcast] using SAP_MULTICAST_IF override: {}", addr);
            return Ok(vec![addr]);
        }
        log::warn!("[mcast] ignoring invalid SAP_MULTICAST_IF='{}'", var);
    }

    let interfaces = match local_ip_address::list_afinet_netifas() {
        Ok(ifs) => ifs,
        Err(e) => {
            log::debug!("[mcast] failed to list network interfaces: {}", e);
            return Ok(Vec::new());
        }
    };

    let mut addrs = Vec::new();
    for (_name, ip) in interfaces {
        if let IpAddr::V4(v4) = ip {
            if !v4.is_loopback() {
                addrs.push(v4);
            }
        }
    }

    log::debug!("[mcast] discovered {} non-loopback interfaces", addrs.len());
    Ok(addrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interface_discovery_does_not_fail() {
        // Environment-dependent result, but the call itself must not error.
        let interfaces = multicast_interfaces().unwrap();
        for addr in interfaces {
            assert!(!addr.is_loopback());
        }
    }
}
