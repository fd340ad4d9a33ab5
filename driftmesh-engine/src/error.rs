use thiserror::Error;

/// Recoverable engine error kinds. Every variant is handled at the
/// frame/bundle boundary: the caller drops the offending item, bumps a
/// [`crate::Stats`] counter, and keeps running. Nothing here escalates to
/// process termination.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Codec(#[from] driftmesh_bundle::CodecError),

    #[error(transparent)]
    Store(#[from] driftmesh_store::StoreError),

    #[error("no route to destination")]
    NoRoute,

    #[error("L2 send failed: {0}")]
    L2SendFailed(String),

    #[error("application for this service is not active")]
    ApplicationInactive,

    #[error("convergence queue is full")]
    QueueFull,
}
