use thiserror::Error;

/// Errors raised while encoding or decoding a bundle's wire representation.
///
/// Every variant here is recoverable at the frame boundary: a caller
/// that receives one drops the offending frame and continues.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The leading byte was neither [`crate::PRIMARY_TAG`] nor
    /// [`crate::CANONICAL_TAG`].
    #[error("not a recognised bundle block")]
    NotABundle,

    /// CBOR structure is wrong shape: truncated, wrong array length, bad
    /// minor value, non-UTF8 text, unknown scheme/block-type discriminator.
    #[error("malformed bundle encoding: {0}")]
    Malformed(&'static str),

    /// As [`CodecError::Malformed`], for messages that need formatting.
    #[error("malformed bundle encoding: {0}")]
    MalformedDetail(String),

    #[error("unsupported bundle protocol version {0}")]
    UnsupportedVersion(u8),

    #[error("unknown endpoint scheme {0}")]
    UnknownScheme(u8),

    #[error("unknown CRC type {0}")]
    UnknownCrcType(u8),

    #[error("a canonical block's data exceeds BLOCK_DATA_BUF_SIZE ({0} > {1})")]
    BundleTooLarge(usize, usize),

    #[error("bundle has more canonical blocks than MAX_NUM_OF_BLOCKS ({0} > {1})")]
    TooManyBlocks(usize, usize),

    #[error("CRC mismatch")]
    CrcMismatch,

    #[error("invalid UTF-8 in DTN endpoint id: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}
