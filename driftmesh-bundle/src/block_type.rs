use crate::error::CodecError;

/// Canonical block type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BlockType {
    Payload = 1,
    PreviousNode = 7,
    BundleAge = 8,
    HopCount = 9,
}

impl TryFrom<u8> for BlockType {
    type Error = CodecError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(BlockType::Payload),
            7 => Ok(BlockType::PreviousNode),
            8 => Ok(BlockType::BundleAge),
            9 => Ok(BlockType::HopCount),
            v => Err(CodecError::MalformedDetail(format!(
                "unrecognised canonical block type {v}"
            ))),
        }
    }
}
