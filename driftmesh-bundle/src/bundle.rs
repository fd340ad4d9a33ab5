use crate::block::CanonicalBlock;
use crate::block_type::BlockType;
use crate::error::CodecError;
use crate::eid::Eid;
use crate::primary_block::{CreationTimestamp, PrimaryBlock};
use crate::{CANONICAL_TAG, MAX_NUM_OF_BLOCKS, PRIMARY_TAG};

/// Identifies a bundle independent of any single copy's encoding. Two
/// bundles with the same fingerprint are the same bundle for
/// deduplication and delivery-ledger purposes, regardless of which
/// neighbor they arrived from.
pub type BundleFingerprint = (u32, u32, u32);

/// Retention constraint protecting a stored bundle from eviction while
/// some part of the engine still owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetentionConstraint {
    #[default]
    None,
    DispatchPending,
    ForwardPending,
    SendAckPending,
}

/// A bundle: one primary block plus its ordered canonical blocks, along
/// with the runtime bookkeeping the store needs that never goes on the
/// wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub primary: PrimaryBlock,
    pub blocks: Vec<CanonicalBlock>,
    pub local_creation_time: u32,
    pub previous_endpoint: Option<Eid>,
    pub retention_constraint: RetentionConstraint,
}

impl Bundle {
    /// The source endpoint's node number, creation timestamp pair: the
    /// bundle identity used for deduplication and the delivery ledger.
    pub fn fingerprint(&self) -> BundleFingerprint {
        (
            self.primary.source.node_num().unwrap_or_default(),
            self.primary.creation_timestamp.seconds,
            self.primary.creation_timestamp.sequence,
        )
    }

    pub fn creation_timestamp(&self) -> CreationTimestamp {
        self.primary.creation_timestamp
    }

    pub fn payload(&self) -> Option<&CanonicalBlock> {
        self.blocks.iter().find(|b| b.block_type == BlockType::Payload)
    }

    /// Serializes the primary block followed by each canonical block, each
    /// prefixed with its discriminator tag. This is not CBOR tagging: the
    /// tag byte sits outside any CBOR value and is consumed by
    /// [`Bundle::decode`] before handing the remainder to the relevant
    /// block decoder.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(PRIMARY_TAG);
        out.extend_from_slice(&self.primary.encode());
        for block in &self.blocks {
            out.push(CANONICAL_TAG);
            out.extend_from_slice(&block.encode());
        }
        out
    }

    /// Parses a complete wire frame into a bundle, enforcing the
    /// structural invariants (exactly one payload block, unique block
    /// numbers) that a lone primary/canonical decode call can't see on
    /// its own.
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let Some(&tag) = data.first() else {
            return Err(CodecError::NotABundle);
        };
        if tag != PRIMARY_TAG {
            return Err(CodecError::NotABundle);
        }
        let (primary, consumed) = PrimaryBlock::decode(&data[1..])?;
        let mut offset = 1 + consumed;

        let mut blocks = Vec::new();
        let mut seen_numbers = std::collections::HashSet::new();
        let mut payload_count = 0;
        while offset < data.len() {
            let tag = data[offset];
            if tag != CANONICAL_TAG {
                return Err(CodecError::NotABundle);
            }
            let (block, consumed) = CanonicalBlock::decode(&data[offset + 1..])?;
            offset += 1 + consumed;

            if !seen_numbers.insert(block.block_number) {
                return Err(CodecError::MalformedDetail(format!(
                    "duplicate block number {}",
                    block.block_number
                )));
            }
            if block.block_type == BlockType::Payload {
                payload_count += 1;
            }
            blocks.push(block);

            if blocks.len() > MAX_NUM_OF_BLOCKS {
                return Err(CodecError::TooManyBlocks(blocks.len(), MAX_NUM_OF_BLOCKS));
            }
        }
        if payload_count != 1 {
            return Err(CodecError::MalformedDetail(format!(
                "bundle must carry exactly one payload block, found {payload_count}"
            )));
        }

        Ok(Self {
            primary,
            blocks,
            local_creation_time: 0,
            previous_endpoint: None,
            retention_constraint: RetentionConstraint::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::CrcType;
    use crate::eid::Scheme;
    use crate::flags::{BlockFlags, BundleFlags};

    fn sample() -> Bundle {
        Bundle {
            primary: PrimaryBlock {
                version: crate::primary_block::BUNDLE_PROTOCOL_VERSION,
                flags: BundleFlags::default(),
                scheme: Scheme::Ipn,
                crc_type: CrcType::Crc16,
                destination: Eid::Ipn { node: 2, service: 7 },
                source: Eid::Ipn { node: 1, service: 7 },
                report_to: Eid::Ipn { node: 1, service: 7 },
                service_num: 7,
                creation_timestamp: CreationTimestamp { seconds: 10, sequence: 0 },
                lifetime: 30,
                fragment_offset: 0,
                total_adu_length: 5,
            },
            blocks: vec![CanonicalBlock {
                block_type: BlockType::Payload,
                block_number: 1,
                flags: BlockFlags::default(),
                crc_type: CrcType::Crc16,
                data: b"hello".to_vec(),
            }],
            local_creation_time: 0,
            previous_endpoint: None,
            retention_constraint: RetentionConstraint::default(),
        }
    }

    #[test]
    fn round_trips() {
        let bundle = sample();
        let encoded = bundle.encode();
        let decoded = Bundle::decode(&encoded).unwrap();
        assert_eq!(decoded.primary, bundle.primary);
        assert_eq!(decoded.blocks, bundle.blocks);
    }

    #[test]
    fn rejects_missing_payload() {
        let mut bundle = sample();
        bundle.blocks.clear();
        let encoded = bundle.encode();
        assert!(matches!(Bundle::decode(&encoded), Err(CodecError::MalformedDetail(_))));
    }

    #[test]
    fn rejects_duplicate_block_numbers() {
        let mut bundle = sample();
        let payload = bundle.blocks[0].clone();
        bundle.blocks.push(payload);
        let encoded = bundle.encode();
        assert!(matches!(Bundle::decode(&encoded), Err(CodecError::MalformedDetail(_))));
    }

    #[test]
    fn rejects_too_many_blocks() {
        let mut bundle = sample();
        for n in 2..=(MAX_NUM_OF_BLOCKS as u8 + 2) {
            bundle.blocks.push(CanonicalBlock {
                block_type: BlockType::HopCount,
                block_number: n,
                flags: BlockFlags::default(),
                crc_type: CrcType::None,
                data: vec![0],
            });
        }
        let encoded = bundle.encode();
        assert!(matches!(Bundle::decode(&encoded), Err(CodecError::TooManyBlocks(_, _))));
    }

    #[test]
    fn fingerprint_is_source_and_timestamp() {
        let bundle = sample();
        assert_eq!(bundle.fingerprint(), (1, 10, 0));
    }
}
