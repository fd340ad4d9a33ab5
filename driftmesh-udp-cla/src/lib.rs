//! A UDP-broadcast convergence layer: a concrete, swappable
//! [`LinkLayer`] for `driftmesh-engine`.
//!
//! Demonstration only — the engine core never depends on this crate,
//! only on the `LinkLayer` trait; the underlying L2 network interface
//! is an external collaborator the engine treats as opaque. Grounded on
//! `file-cla`'s adapter shape (a struct wrapping the concrete transport,
//! a spawned task feeding frames back to the owner) and `tcpclv4`'s
//! convention of a dedicated `Error` enum per transport.
//!
//! UDP datagrams are already message-delimited by the OS socket API (one
//! `recv_from` yields exactly one sender's payload), so frames are sent
//! and received as whole datagrams with no additional length-prefix
//! framing — unlike a byte-stream transport such as TCP, which is why
//! `tcpclv4` needs one and this adapter does not.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use driftmesh_engine::{try_post, L2Error, LinkLayer, Message, Stats};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Datagrams larger than this are never produced by this stack (the
/// largest bundle is bounded by `MAX_NUM_OF_BLOCKS * (BLOCK_DATA_BUF_SIZE
/// + framing overhead)`); sized generously so a stray oversized datagram
/// from a misbehaving peer is truncated rather than panicking the
/// receive loop.
const RECV_BUF_SIZE: usize = 2048;

#[derive(Debug, thiserror::Error)]
pub enum UdpClaError {
    #[error("failed to bind UDP socket on {0}: {1}")]
    Bind(SocketAddr, std::io::Error),

    #[error("failed to enable broadcast on the UDP socket: {0}")]
    Broadcast(std::io::Error),
}

/// A [`LinkLayer`] implementation over a single UDP socket. A peer's L2
/// address is its `SocketAddr`'s UTF-8 textual form, carried as raw bytes
/// per the `LinkLayer` contract's opaque-address convention.
pub struct UdpCla {
    socket: UdpSocket,
    broadcast_addr: SocketAddr,
    local_addr: SocketAddr,
}

impl UdpCla {
    /// Binds a UDP socket at `bind_addr` and enables broadcast sends to
    /// `broadcast_addr` (typically the subnet's limited-broadcast address
    /// on the same port, e.g. `255.255.255.255:9000`).
    pub async fn bind(bind_addr: SocketAddr, broadcast_addr: SocketAddr) -> Result<Self, UdpClaError> {
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| UdpClaError::Bind(bind_addr, e))?;
        socket.set_broadcast(true).map_err(UdpClaError::Broadcast)?;
        let local_addr = socket.local_addr().map_err(|e| UdpClaError::Bind(bind_addr, e))?;
        Ok(Self { socket, broadcast_addr, local_addr })
    }

    fn encode_l2(addr: SocketAddr) -> Vec<u8> {
        addr.to_string().into_bytes()
    }

    fn decode_l2(bytes: &[u8]) -> Option<SocketAddr> {
        std::str::from_utf8(bytes).ok()?.parse().ok()
    }

    /// Spawns the receive loop: reads datagrams off the socket and posts
    /// each one as a [`Message::Recv`] onto `tx`, forever (or until the
    /// returned handle is aborted). Only the socket read blocks here;
    /// the engine's own loop is never suspended by it.
    pub fn spawn_recv_loop(self: Arc<Self>, tx: mpsc::Sender<Message>, stats: Arc<Stats>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut buf = [0u8; RECV_BUF_SIZE];
            loop {
                match self.socket.recv_from(&mut buf).await {
                    Ok((len, src)) => {
                        let l2_src = Self::encode_l2(src);
                        try_post(&tx, &stats, Message::Recv { l2_src, bytes: buf[..len].to_vec() });
                    }
                    Err(e) => {
                        warn!(error = %e, "UDP recv_from failed");
                    }
                }
            }
        })
    }
}

#[async_trait]
impl LinkLayer for UdpCla {
    async fn send_broadcast(&self, bytes: &[u8]) -> Result<(), L2Error> {
        debug!(len = bytes.len(), addr = %self.broadcast_addr, "sending broadcast");
        self.socket
            .send_to(bytes, self.broadcast_addr)
            .await
            .map(|_| ())
            .map_err(|e| L2Error::Other(e.to_string()))
    }

    async fn send_unicast(&self, dst_l2_addr: &[u8], bytes: &[u8]) -> Result<(), L2Error> {
        let Some(dst) = Self::decode_l2(dst_l2_addr) else {
            return Err(L2Error::Other("malformed L2 address".to_owned()));
        };
        self.socket
            .send_to(bytes, dst)
            .await
            .map(|_| ())
            .map_err(|e| L2Error::Other(e.to_string()))
    }

    fn local_address(&self) -> Vec<u8> {
        Self::encode_l2(self.local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_two_sockets() {
        let a = Arc::new(
            UdpCla::bind("127.0.0.1:0".parse().unwrap(), "127.0.0.1:0".parse().unwrap())
                .await
                .unwrap(),
        );
        let b = Arc::new(
            UdpCla::bind("127.0.0.1:0".parse().unwrap(), "127.0.0.1:0".parse().unwrap())
                .await
                .unwrap(),
        );

        let (tx, mut rx) = mpsc::channel(8);
        let stats = Arc::new(Stats::new());
        let _recv_task = b.clone().spawn_recv_loop(tx, stats);

        let b_addr = b.local_address();
        a.send_unicast(&b_addr, b"hello").await.unwrap();

        let Message::Recv { bytes, .. } = rx.recv().await.unwrap() else {
            panic!("expected Recv");
        };
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn l2_address_round_trips() {
        let addr: SocketAddr = "127.0.0.1:9001".parse().unwrap();
        let encoded = UdpCla::encode_l2(addr);
        assert_eq!(UdpCla::decode_l2(&encoded), Some(addr));
    }
}
