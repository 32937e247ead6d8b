//! Single-datagram UDP transport to the pixel matrix.
//!
//! Each [`EncodedFrame`] goes out as exactly one datagram. Nothing is
//! acknowledged and nothing is retried: a lost frame is simply replaced
//! by the next commit.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::net::{UdpSocket, lookup_host};
use tracing::debug;

use crate::error::MirrorError;
use crate::mirror::encoder::EncodedFrame;

// ── Constants ────────────────────────────────────────────────────

/// Largest UDP payload over IPv4 (65 535 − 8 UDP − 20 IP).
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

// ── FrameSink ────────────────────────────────────────────────────

/// Destination for encoded frames.
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Deliver one frame, returning the number of bytes written.
    async fn send_frame(&self, frame: &EncodedFrame) -> Result<usize, MirrorError>;
}

// ── DatagramTransport ────────────────────────────────────────────

/// Sends encoded frames to a fixed `(host, port)`.
pub struct DatagramTransport {
    socket: UdpSocket,
    remote_addr: SocketAddr,
    frames_sent: AtomicU64,
    bytes_sent: AtomicU64,
}

impl DatagramTransport {
    /// Wrap an already-bound `UdpSocket` targeting `remote_addr`.
    pub fn new(socket: UdpSocket, remote_addr: SocketAddr) -> Self {
        Self {
            socket,
            remote_addr,
            frames_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
        }
    }

    /// Resolve `remote` (`host:port`) and bind an ephemeral local socket
    /// of the same address family.
    pub async fn bind(remote: &str) -> Result<Self, MirrorError> {
        let remote_addr = lookup_host(remote)
            .await?
            .next()
            .ok_or_else(|| MirrorError::Unresolved(remote.to_string()))?;
        let local: SocketAddr = if remote_addr.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        debug!("matrix transport {} → {remote_addr}", socket.local_addr()?);
        Ok(Self::new(socket, remote_addr))
    }

    /// Send `frame` as one datagram.
    pub async fn send(&self, frame: &EncodedFrame) -> Result<usize, MirrorError> {
        if frame.len() > MAX_DATAGRAM_SIZE {
            return Err(MirrorError::FrameTooLarge {
                size: frame.len(),
                max: MAX_DATAGRAM_SIZE,
            });
        }

        let sent = self.socket.send_to(&frame.data, self.remote_addr).await?;
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(sent as u64, Ordering::Relaxed);
        Ok(sent)
    }

    /// Frames successfully handed to the socket.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    /// Total bytes sent across all frames.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    /// The matrix address this transport targets.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Returns a reference to the underlying socket.
    pub fn socket(&self) -> &UdpSocket {
        &self.socket
    }
}

#[async_trait]
impl FrameSink for DatagramTransport {
    async fn send_frame(&self, frame: &EncodedFrame) -> Result<usize, MirrorError> {
        self.send(frame).await
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::encoder::FrameEncoder;
    use crate::mirror::types::{Color, TargetGrid};

    async fn pair() -> (DatagramTransport, UdpSocket) {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = receiver.local_addr().unwrap();
        let transport = DatagramTransport::bind(&addr.to_string()).await.unwrap();
        (transport, receiver)
    }

    #[tokio::test]
    async fn frame_arrives_as_one_datagram() {
        let (transport, receiver) = pair().await;
        let frame = FrameEncoder::encode(&TargetGrid::filled(45, 35, 2, Color::GREEN));

        let sent = transport.send(&frame).await.unwrap();
        assert_eq!(sent, frame.len());

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let (len, from) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], &frame.data[..]);
        assert_eq!(from.port(), transport.socket().local_addr().unwrap().port());
        assert_eq!(transport.frames_sent(), 1);
        assert_eq!(transport.bytes_sent(), frame.len() as u64);
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let (transport, _receiver) = pair().await;
        let frame = FrameEncoder::encode(&TargetGrid::filled(200, 200, 0, Color::RED));

        let err = transport.send(&frame).await.unwrap_err();
        assert!(matches!(err, MirrorError::FrameTooLarge { .. }));
        assert_eq!(transport.frames_sent(), 0);
    }

    #[tokio::test]
    async fn unresolvable_endpoint_fails() {
        assert!(DatagramTransport::bind("not a host").await.is_err());
    }
}
