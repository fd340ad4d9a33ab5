use crate::cbor;
use crate::crc::{self, CrcType};
use crate::eid::{Eid, Scheme};
use crate::error::CodecError;
use crate::flags::BundleFlags;

/// `(seconds, sequence)` creation timestamp. Nodes without a clock
/// (`Config::has_clock == false`) always encode `seconds = 0`; the
/// sequence counter alone then distinguishes bundles from one source
/// within a process lifetime.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CreationTimestamp {
    pub seconds: u32,
    pub sequence: u32,
}

pub const BUNDLE_PROTOCOL_VERSION: u8 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryBlock {
    pub version: u8,
    pub flags: BundleFlags,
    pub scheme: Scheme,
    pub crc_type: CrcType,
    pub destination: Eid,
    pub source: Eid,
    pub report_to: Eid,
    pub service_num: u32,
    pub creation_timestamp: CreationTimestamp,
    pub lifetime: u8,
    pub fragment_offset: u32,
    pub total_adu_length: u32,
}

impl PrimaryBlock {
    pub(crate) fn encode(&self) -> Vec<u8> {
        let items = [
            cbor::encode::uint(self.version as u64),
            cbor::encode::uint(u64::from(self.flags)),
            cbor::encode::uint(self.scheme as u8 as u64),
            cbor::encode::uint(u8::from(self.crc_type) as u64),
            self.destination.encode(),
            self.source.encode(),
            self.report_to.encode(),
            cbor::encode::uint(self.service_num as u64),
            cbor::encode::array(&[
                cbor::encode::uint(self.creation_timestamp.seconds as u64),
                cbor::encode::uint(self.creation_timestamp.sequence as u64),
            ]),
            cbor::encode::uint(self.lifetime as u64),
            cbor::encode::uint(self.fragment_offset as u64),
            cbor::encode::uint(self.total_adu_length as u64),
        ];
        // The CRC, when present, is itself the 13th array element; the
        // header must count it even though it's appended separately below.
        let count = items.len() + usize::from(!matches!(self.crc_type, CrcType::None));
        let mut body = cbor::encode::array_header(count);
        for item in &items {
            body.extend_from_slice(item);
        }
        crc::append_crc_value(self.crc_type, body)
    }

    pub(crate) fn decode(data: &[u8]) -> Result<(Self, usize), CodecError> {
        let want_len_without_crc = {
            // We don't know crc_type yet, so peek the array header for either
            // possible length and resolve once crc_type is parsed.
            let (count, _) = match cbor::decode::read_value(data)? {
                (cbor::decode::Value::Array(c), len) => (c, len),
                _ => return Err(CodecError::Malformed("expected primary block array")),
            };
            count
        };
        if want_len_without_crc != 12 && want_len_without_crc != 13 {
            return Err(CodecError::MalformedDetail(format!(
                "primary block array has {want_len_without_crc} elements"
            )));
        }
        let has_crc = want_len_without_crc == 13;

        let array_start = 0;
        let mut offset = cbor::decode::expect_array(data, want_len_without_crc)?;

        let (version, o) = cbor::decode::expect_uint(&data[offset..])?;
        offset += o;
        let version = version as u8;
        if version != BUNDLE_PROTOCOL_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }

        let (flags, o) = cbor::decode::expect_uint(&data[offset..])?;
        offset += o;
        let flags = BundleFlags::from(flags);

        let (scheme, o) = cbor::decode::expect_uint(&data[offset..])?;
        offset += o;
        let scheme = Scheme::try_from(scheme as u8)?;

        let (crc_type, o) = cbor::decode::expect_uint(&data[offset..])?;
        offset += o;
        let crc_type = CrcType::try_from(crc_type as u8)?;

        let (destination, o) = Eid::decode(&data[offset..], scheme)?;
        offset += o;
        let (source, o) = Eid::decode(&data[offset..], scheme)?;
        offset += o;
        let (report_to, o) = Eid::decode(&data[offset..], scheme)?;
        offset += o;

        let (service_num, o) = cbor::decode::expect_uint(&data[offset..])?;
        offset += o;

        let ts_offset_start = offset;
        let mut ts_offset = cbor::decode::expect_array(&data[offset..], 2)?;
        let (seconds, o) = cbor::decode::expect_uint(&data[offset + ts_offset..])?;
        ts_offset += o;
        let (sequence, o) = cbor::decode::expect_uint(&data[offset + ts_offset..])?;
        ts_offset += o;
        offset = ts_offset_start + ts_offset;
        let creation_timestamp = CreationTimestamp { seconds: seconds as u32, sequence: sequence as u32 };

        let (lifetime, o) = cbor::decode::expect_uint(&data[offset..])?;
        offset += o;
        let (fragment_offset, o) = cbor::decode::expect_uint(&data[offset..])?;
        offset += o;
        let (total_adu_length, o) = cbor::decode::expect_uint(&data[offset..])?;
        offset += o;

        let prefix_end = offset;
        if has_crc {
            let consumed = crc::parse_crc_value(&data[array_start..prefix_end], crc_type, &data[offset..])?;
            offset += consumed;
        }

        Ok((
            Self {
                version,
                flags,
                scheme,
                crc_type,
                destination,
                source,
                report_to,
                service_num: service_num as u32,
                creation_timestamp,
                lifetime: lifetime as u8,
                fragment_offset: fragment_offset as u32,
                total_adu_length: total_adu_length as u32,
            },
            offset,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PrimaryBlock {
        PrimaryBlock {
            version: BUNDLE_PROTOCOL_VERSION,
            flags: BundleFlags::default(),
            scheme: Scheme::Ipn,
            crc_type: CrcType::Crc16,
            destination: Eid::Ipn { node: 2, service: 3 },
            source: Eid::Ipn { node: 1, service: 3 },
            report_to: Eid::Ipn { node: 1, service: 3 },
            service_num: 3,
            creation_timestamp: CreationTimestamp { seconds: 100, sequence: 0 },
            lifetime: 30,
            fragment_offset: 0,
            total_adu_length: 0,
        }
    }

    #[test]
    fn round_trips_with_crc16() {
        let block = sample();
        let encoded = block.encode();
        let (decoded, len) = PrimaryBlock::decode(&encoded).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(len, encoded.len());
    }

    #[test]
    fn round_trips_without_crc() {
        let mut block = sample();
        block.crc_type = CrcType::None;
        let encoded = block.encode();
        let (decoded, len) = PrimaryBlock::decode(&encoded).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(len, encoded.len());
    }

    #[test]
    fn rejects_crc_mismatch() {
        let block = sample();
        let mut encoded = block.encode();
        let last = encoded.len() - 1;
        encoded[last] ^= 0xFF;
        assert!(matches!(
            PrimaryBlock::decode(&encoded),
            Err(CodecError::CrcMismatch)
        ));
    }
}
