//! Bundle wire format: the narrow CBOR-based encoding, endpoint
//! identities, and the fixed primary/canonical block layout every other
//! driftmesh crate builds on.

mod block;
mod block_type;
mod bundle;
mod cbor;
mod crc;
mod eid;
mod error;
mod flags;
mod primary_block;

pub use block::CanonicalBlock;
pub use block_type::BlockType;
pub use bundle::{Bundle, BundleFingerprint, RetentionConstraint};
pub use crc::CrcType;
pub use eid::{Eid, Scheme, BROADCAST_NODE_NUM};
pub use error::CodecError;
pub use flags::{BlockFlags, BundleFlags};
pub use primary_block::{CreationTimestamp, PrimaryBlock, BUNDLE_PROTOCOL_VERSION};

/// Leading byte of an encoded primary block. Not a CBOR tag: it sits
/// outside the CBOR value entirely and only marks frame boundaries on the
/// wire.
pub const PRIMARY_TAG: u8 = 0x88;

/// Leading byte of an encoded canonical block.
pub const CANONICAL_TAG: u8 = 0x89;

/// Upper bound on bundles held in a store at once.
pub const MAX_BUNDLES: usize = 5;

/// Upper bound on canonical blocks per bundle, payload included.
pub const MAX_NUM_OF_BLOCKS: usize = 3;

/// Upper bound on a canonical block's data field, in bytes.
pub const BLOCK_DATA_BUF_SIZE: usize = 100;

/// Upper bound on a DTN-scheme endpoint identifier's encoded length.
pub const MAX_ENDPOINT_SIZE: usize = 32;

/// Interval between discovery-beacon broadcasts, in seconds.
pub const CONTACT_PERIOD_SECONDS: u32 = 30;

/// A neighbor is purged from the table after this many seconds without a
/// refresh.
pub const NEIGHBOR_PURGE_TIMER_SECONDS: u32 = 60;

/// Reserved service number used for discovery/contact-management traffic,
/// distinguishing it from application payload bundles at the same node.
pub const CONTACT_MANAGER_SERVICE_NUM: u32 = 12;

/// Fixed capacity of the per-neighbor processed-bundle ring buffer. The
/// original source leaves this unspecified; see DESIGN.md.
pub const PROCESSED_SET_CAPACITY: usize = 16;
