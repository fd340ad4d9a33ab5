use crate::block_type::BlockType;
use crate::cbor;
use crate::crc::{self, CrcType};
use crate::error::CodecError;
use crate::flags::BlockFlags;
use crate::BLOCK_DATA_BUF_SIZE;

/// A canonical (non-primary) block: payload or an extension block
/// (previous-node, bundle-age, hop-count).
///
/// Wire layout is fixed at five elements plus an optional CRC, mirroring
/// the primary block's own framing:
/// `(block_type, block_number, flags, crc_type, data, [crc])`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalBlock {
    pub block_type: BlockType,
    pub block_number: u8,
    pub flags: BlockFlags,
    pub crc_type: CrcType,
    pub data: Vec<u8>,
}

impl CanonicalBlock {
    pub(crate) fn encode(&self) -> Vec<u8> {
        let items = [
            cbor::encode::uint(self.block_type as u8 as u64),
            cbor::encode::uint(self.block_number as u64),
            cbor::encode::uint(u64::from(self.flags)),
            cbor::encode::uint(u8::from(self.crc_type) as u64),
            cbor::encode::bytes(&self.data),
        ];
        // The CRC, when present, is itself the 6th array element; the
        // header must count it even though it's appended separately below.
        let count = items.len() + usize::from(!matches!(self.crc_type, CrcType::None));
        let mut body = cbor::encode::array_header(count);
        for item in &items {
            body.extend_from_slice(item);
        }
        crc::append_crc_value(self.crc_type, body)
    }

    pub(crate) fn decode(data: &[u8]) -> Result<(Self, usize), CodecError> {
        let (count, _) = match cbor::decode::read_value(data)? {
            (cbor::decode::Value::Array(c), len) => (c, len),
            _ => return Err(CodecError::Malformed("expected canonical block array")),
        };
        if count != 5 && count != 6 {
            return Err(CodecError::MalformedDetail(format!(
                "canonical block array has {count} elements"
            )));
        }
        let has_crc = count == 6;

        let array_start = 0;
        let mut offset = cbor::decode::expect_array(data, count)?;

        let (block_type, o) = cbor::decode::expect_uint(&data[offset..])?;
        offset += o;
        let block_type = BlockType::try_from(block_type as u8)?;

        let (block_number, o) = cbor::decode::expect_uint(&data[offset..])?;
        offset += o;

        let (flags, o) = cbor::decode::expect_uint(&data[offset..])?;
        offset += o;
        let flags = BlockFlags::from(flags);

        let (crc_type, o) = cbor::decode::expect_uint(&data[offset..])?;
        offset += o;
        let crc_type = CrcType::try_from(crc_type as u8)?;

        let (payload, o) = cbor::decode::expect_bytes(&data[offset..])?;
        if payload.len() > BLOCK_DATA_BUF_SIZE {
            return Err(CodecError::BundleTooLarge(payload.len(), BLOCK_DATA_BUF_SIZE));
        }
        let payload = payload.to_vec();
        offset += o;

        let prefix_end = offset;
        if has_crc {
            let consumed = crc::parse_crc_value(&data[array_start..prefix_end], crc_type, &data[offset..])?;
            offset += consumed;
        }

        Ok((
            Self {
                block_type,
                block_number: block_number as u8,
                flags,
                crc_type,
                data: payload,
            },
            offset,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CanonicalBlock {
        CanonicalBlock {
            block_type: BlockType::Payload,
            block_number: 1,
            flags: BlockFlags::default(),
            crc_type: CrcType::Crc32,
            data: b"hello driftmesh".to_vec(),
        }
    }

    #[test]
    fn round_trips_with_crc32() {
        let block = sample();
        let encoded = block.encode();
        let (decoded, len) = CanonicalBlock::decode(&encoded).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(len, encoded.len());
    }

    #[test]
    fn rejects_oversized_payload() {
        let mut block = sample();
        block.data = vec![0u8; BLOCK_DATA_BUF_SIZE + 1];
        let encoded = block.encode();
        assert!(matches!(
            CanonicalBlock::decode(&encoded),
            Err(CodecError::BundleTooLarge(_, _))
        ));
    }
}
