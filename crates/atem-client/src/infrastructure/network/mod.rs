//! Network infrastructure: the UDP transport and the monotonic clock the
//! engine is driven with.
//!
//! # Why non-blocking? (for beginners)
//!
//! The protocol engine is ticked from the async main loop every ~10 ms and
//! must never block.  `tokio::net::UdpSocket` offers `try_send` and
//! `try_recv`, which return immediately with `WouldBlock` instead of
//! waiting, so the socket can be used from the engine's synchronous
//! [`Transport`] methods while still being registered with the runtime.
//!
//! The socket is *connected* to the switcher, so the OS drops datagrams from
//! any other peer and `send` needs no destination address.

use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Instant;

use atem_core::protocol::messages::MAX_PACKET_SIZE;
use atem_core::{Clock, Transport, TransportError};
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

/// Errors that can occur while setting up the UDP transport.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The local socket could not be bound.
    #[error("failed to bind UDP socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The socket could not be associated with the switcher address.
    #[error("failed to connect UDP socket to {addr}: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// UDP transport bound to a single switcher endpoint.
#[derive(Debug)]
pub struct UdpTransport {
    socket: Option<UdpSocket>,
    peer: SocketAddr,
    buf: Box<[u8; MAX_PACKET_SIZE]>,
}

impl UdpTransport {
    /// Binds a local socket on `local_port` (0 for ephemeral) and connects
    /// it to `switcher`.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] if the socket cannot be bound or connected.
    pub async fn connect(switcher: SocketAddr, local_port: u16) -> Result<Self, NetworkError> {
        let unspecified = match switcher.ip() {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        };
        let local = SocketAddr::new(unspecified, local_port);

        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| NetworkError::BindFailed { addr: local, source })?;
        socket
            .connect(switcher)
            .await
            .map_err(|source| NetworkError::ConnectFailed {
                addr: switcher,
                source,
            })?;

        if let Ok(bound) = socket.local_addr() {
            info!(local = %bound, switcher = %switcher, "UDP transport ready");
        }
        Ok(Self {
            socket: Some(socket),
            peer: switcher,
            buf: Box::new([0u8; MAX_PACKET_SIZE]),
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    pub fn is_closed(&self) -> bool {
        self.socket.is_none()
    }

    /// Waits until a datagram is ready to be read.  Returns immediately once
    /// the transport is closed.
    pub async fn readable(&self) {
        if let Some(socket) = &self.socket {
            if let Err(e) = socket.readable().await {
                debug!(error = %e, "readable() failed");
            }
        }
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let socket = self.socket.as_ref().ok_or(TransportError::Closed)?;
        let written = socket.try_send(bytes)?;
        if written != bytes.len() {
            warn!(written, expected = bytes.len(), "short UDP write");
        }
        Ok(())
    }

    fn try_receive(&mut self) -> Option<Vec<u8>> {
        let socket = self.socket.as_ref()?;
        match socket.try_recv(&mut self.buf[..]) {
            Ok(n) => Some(self.buf[..n].to_vec()),
            Err(e) if e.kind() == ErrorKind::WouldBlock => None,
            Err(e) => {
                // ICMP port-unreachable from a powered-off switcher lands here.
                debug!(error = %e, "UDP receive error");
                None
            }
        }
    }

    fn close(&mut self) {
        if self.socket.take().is_some() {
            debug!(peer = %self.peer, "UDP transport closed");
        }
    }
}

/// Monotonic clock measured from process start-up.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn loopback_peer() -> (UdpSocket, SocketAddr) {
        let peer = UdpSocket::bind("127.0.0.1:0").await.expect("bind peer");
        let addr = peer.local_addr().expect("peer addr");
        (peer, addr)
    }

    #[tokio::test]
    async fn test_send_reaches_connected_peer() {
        // Arrange
        let (peer, peer_addr) = loopback_peer().await;
        let mut transport = UdpTransport::connect(peer_addr, 0).await.expect("connect");

        // Act
        transport.send(&[0x10, 0x14, 0x53, 0xAB]).expect("send");

        // Assert
        let mut buf = [0u8; 64];
        let (n, from) = tokio::time::timeout(Duration::from_secs(2), peer.recv_from(&mut buf))
            .await
            .expect("datagram within timeout")
            .expect("recv");
        assert_eq!(&buf[..n], &[0x10, 0x14, 0x53, 0xAB]);
        assert_eq!(Some(from), transport.local_addr());
    }

    #[tokio::test]
    async fn test_try_receive_returns_none_when_idle_then_datagram() {
        // Arrange
        let (peer, peer_addr) = loopback_peer().await;
        let mut transport = UdpTransport::connect(peer_addr, 0).await.expect("connect");
        let local = transport.local_addr().expect("local addr");

        // Act
        let idle = transport.try_receive();
        peer.send_to(&[1, 2, 3], local).await.expect("peer send");
        tokio::time::timeout(Duration::from_secs(2), transport.readable())
            .await
            .expect("readable within timeout");
        let received = transport.try_receive();

        // Assert
        assert_eq!(idle, None);
        assert_eq!(received, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_send_after_close_fails_with_closed() {
        let (_peer, peer_addr) = loopback_peer().await;
        let mut transport = UdpTransport::connect(peer_addr, 0).await.expect("connect");

        transport.close();

        assert!(transport.is_closed());
        assert!(matches!(transport.send(&[0]), Err(TransportError::Closed)));
        assert_eq!(transport.try_receive(), None);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();

        let a = clock.now_ms();
        std::thread::sleep(Duration::from_millis(5));
        let b = clock.now_ms();

        assert!(b >= a + 5, "expected at least 5 ms to elapse, got {a} -> {b}");
    }
}
