use async_trait::async_trait;

/// The L2 network interface the convergence engine sends frames through.
/// The engine depends only on this trait; a concrete adapter (e.g.
/// `driftmesh-udp-cla`) is supplied by the binary wiring everything
/// together.
///
/// Sends are non-blocking: if the underlying transport's send queue is
/// full, an implementation returns [`L2Error::QueueFull`] rather than
/// blocking, and the engine drops the frame and bumps a counter instead
/// of retrying inline.
#[async_trait]
pub trait LinkLayer: Send + Sync {
    async fn send_broadcast(&self, bytes: &[u8]) -> Result<(), L2Error>;

    async fn send_unicast(&self, dst_l2_addr: &[u8], bytes: &[u8]) -> Result<(), L2Error>;

    /// This node's own L2 address, advertised in discovery beacons.
    fn local_address(&self) -> Vec<u8>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum L2Error {
    #[error("L2 send queue is full")]
    QueueFull,
    #[error("L2 send failed: {0}")]
    Other(String),
}
