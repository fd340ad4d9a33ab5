use driftmesh_bundle::{BlockFlags, BlockType, Bundle, CanonicalBlock};

/// Reads a bundle's bundle-age canonical block, in seconds (or ticks, on
/// a clockless node). Absent entirely only for bundles that never pass
/// through age tracking (there are none in this stack - every bundle the
/// engine creates carries one). A peer-supplied age block shorter than
/// four bytes is structurally valid but meaningless; it's treated as age
/// zero rather than rejected.
pub fn get(bundle: &Bundle) -> u32 {
    age_block(bundle)
        .and_then(|b| b.data.get(..4))
        .and_then(|s| s.try_into().ok())
        .map(u32::from_be_bytes)
        .unwrap_or(0)
}

/// Sets (or creates) the bundle-age block.
pub fn set(bundle: &mut Bundle, age: u32) {
    if let Some(idx) = age_block_index(bundle) {
        bundle.blocks[idx].data = age.to_be_bytes().to_vec();
    } else {
        bundle.blocks.push(CanonicalBlock {
            block_type: BlockType::BundleAge,
            block_number: next_block_number(bundle),
            flags: BlockFlags::default(),
            crc_type: bundle.primary.crc_type,
            data: age.to_be_bytes().to_vec(),
        });
    }
}

pub fn is_expired(bundle: &Bundle) -> bool {
    get(bundle) >= bundle.primary.lifetime as u32
}

fn age_block_index(bundle: &Bundle) -> Option<usize> {
    bundle.blocks.iter().position(|b| b.block_type == BlockType::BundleAge)
}

fn age_block(bundle: &Bundle) -> Option<&CanonicalBlock> {
    age_block_index(bundle).map(|i| &bundle.blocks[i])
}

fn next_block_number(bundle: &Bundle) -> u8 {
    bundle.blocks.iter().map(|b| b.block_number).max().unwrap_or(0) + 1
}
