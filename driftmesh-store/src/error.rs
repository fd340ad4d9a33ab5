use thiserror::Error;

/// Errors raised by [`crate::BundleStore`] operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// `allocate` found no free slot and no `NONE`-retention bundle could
    /// be evicted to make room: overflow is a defined error, never an
    /// overwrite of a bundle still in use.
    #[error("bundle store is full")]
    Full,
}
