//! # Network Module
//!
//! UDP endpoint the phone-side sender talks to.
//!
//! This module handles:
//! - Resolving the bind address, including `"auto"` local address discovery
//! - Binding the command socket
//! - Receiving one datagram at a time
//!
//! Delivery is best effort: datagrams may be lost or reordered in transit and
//! nothing here tries to recover them.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::error::{BridgeError, Result};

/// Default UDP port.
pub const DEFAULT_PORT: u16 = 9876;

/// Default receive buffer size in bytes.
pub const DEFAULT_MAX_DATAGRAM_SIZE: usize = 1024;

/// Bind address value that triggers local address discovery.
pub const AUTO_BIND_ADDRESS: &str = "auto";

/// Public address used only to pick the outbound interface. Nothing is sent.
const DISCOVERY_PROBE_ADDR: &str = "8.8.8.8:80";

/// Finds the local IPv4 address the host would use for outbound traffic.
///
/// Connecting a UDP socket only selects a route, so no packet leaves the host.
///
/// # Errors
///
/// Returns error if the host has no route to the probe address.
pub fn discover_local_ip() -> Result<IpAddr> {
    let probe = std::net::UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    probe.connect(DISCOVERY_PROBE_ADDR)?;
    let local = probe.local_addr()?;
    Ok(local.ip())
}

/// Resolves the configured bind address.
///
/// `"auto"` discovers the outbound local address and falls back to
/// `0.0.0.0` when discovery fails.
///
/// # Errors
///
/// Returns error if `bind_address` is neither `"auto"` nor an IP address.
///
/// # Examples
///
/// ```
/// use tilt_bridge::net::resolve_bind_addr;
///
/// let addr = resolve_bind_addr("127.0.0.1", 9876)?;
/// assert_eq!(addr.to_string(), "127.0.0.1:9876");
/// # Ok::<(), tilt_bridge::error::BridgeError>(())
/// ```
pub fn resolve_bind_addr(bind_address: &str, port: u16) -> Result<SocketAddr> {
    if bind_address.eq_ignore_ascii_case(AUTO_BIND_ADDRESS) {
        let ip = match discover_local_ip() {
            Ok(ip) => {
                debug!("Discovered local address {}", ip);
                ip
            }
            Err(e) => {
                warn!("Local address discovery failed ({}), listening on all interfaces", e);
                IpAddr::V4(Ipv4Addr::UNSPECIFIED)
            }
        };
        return Ok(SocketAddr::new(ip, port));
    }

    let ip: IpAddr = bind_address
        .parse()
        .map_err(|_| BridgeError::Network(format!("Invalid bind address: {}", bind_address)))?;
    Ok(SocketAddr::new(ip, port))
}

/// Bound command socket plus its receive buffer.
#[derive(Debug)]
pub struct CommandSocket {
    socket: UdpSocket,
    buf: Vec<u8>,
    local_addr: SocketAddr,
}

impl CommandSocket {
    /// Binds the socket.
    ///
    /// # Arguments
    ///
    /// * `addr` - Address to listen on
    /// * `max_datagram_size` - Receive buffer size; longer datagrams are truncated
    ///
    /// # Errors
    ///
    /// Returns error if the address cannot be bound.
    pub async fn bind(addr: SocketAddr, max_datagram_size: usize) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| BridgeError::Network(format!("Failed to bind {}: {}", addr, e)))?;
        let local_addr = socket.local_addr()?;

        info!("UDP server listening on {}", local_addr);

        Ok(Self {
            socket,
            buf: vec![0u8; max_datagram_size.max(1)],
            local_addr,
        })
    }

    /// Address actually bound (resolves port 0).
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for the next datagram.
    ///
    /// # Returns
    ///
    /// The payload (borrowed from the internal buffer) and the sender.
    ///
    /// # Errors
    ///
    /// Returns the receive error. Callers treat these as per-datagram failures.
    pub async fn recv(&mut self) -> Result<(&[u8], SocketAddr)> {
        let (len, peer) = self.socket.recv_from(&mut self.buf).await?;
        Ok((&self.buf[..len], peer))
    }
}
