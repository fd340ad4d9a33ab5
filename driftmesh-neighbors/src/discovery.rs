use driftmesh_bundle::{
    BlockFlags, BlockType, Bundle, BundleFlags, CanonicalBlock, CreationTimestamp, CrcType, Eid,
    PrimaryBlock, RetentionConstraint, Scheme, BUNDLE_PROTOCOL_VERSION, CONTACT_MANAGER_SERVICE_NUM,
};

use crate::neighbor::Neighbor;

/// Builds this node's periodic discovery beacon: service number
/// `CONTACT_MANAGER_SERVICE_NUM`, destination the broadcast endpoint,
/// payload this node's L2 address.
pub fn build_discovery_bundle(
    local: &Eid,
    l2_addr: &[u8],
    creation_timestamp: CreationTimestamp,
    lifetime: u8,
    local_creation_time: u32,
) -> Bundle {
    Bundle {
        primary: PrimaryBlock {
            version: BUNDLE_PROTOCOL_VERSION,
            flags: BundleFlags::default(),
            scheme: local.scheme(),
            crc_type: CrcType::Crc16,
            destination: Eid::broadcast(),
            source: local.clone(),
            report_to: local.clone(),
            service_num: CONTACT_MANAGER_SERVICE_NUM,
            creation_timestamp,
            lifetime,
            fragment_offset: 0,
            total_adu_length: l2_addr.len() as u32,
        },
        blocks: vec![CanonicalBlock {
            block_type: BlockType::Payload,
            block_number: 1,
            flags: BlockFlags::default(),
            crc_type: CrcType::Crc16,
            data: l2_addr.to_vec(),
        }],
        local_creation_time,
        previous_endpoint: None,
        retention_constraint: RetentionConstraint::None,
    }
}

pub fn is_discovery_bundle(bundle: &Bundle) -> bool {
    bundle.primary.service_num == CONTACT_MANAGER_SERVICE_NUM
}

/// Extracts a prospective neighbor from a received discovery bundle:
/// identity from the primary block's source, L2 address from the
/// payload.
pub fn candidate_from_discovery(bundle: &Bundle) -> Option<Neighbor> {
    if !is_discovery_bundle(bundle) {
        return None;
    }
    let l2_addr = bundle.payload()?.data.clone();
    Some(Neighbor::new(bundle.primary.source.clone(), l2_addr))
}

/// Scheme and identity helper so callers that only know the node's
/// configured identity (not a full `Eid`) can still build a discovery
/// bundle, matching the two endpoint shapes this stack allows.
pub fn local_endpoint(scheme: Scheme, node: u32, service: u32, dtn_id: Option<&str>) -> Eid {
    match scheme {
        Scheme::Ipn => Eid::Ipn { node, service },
        Scheme::Dtn => Eid::Dtn(dtn_id.unwrap_or_default().to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_candidate_extraction() {
        let local = Eid::Ipn { node: 1, service: 0 };
        let bundle = build_discovery_bundle(
            &local,
            &[0xAA, 0xBB],
            CreationTimestamp { seconds: 0, sequence: 1 },
            30,
            5,
        );
        let candidate = candidate_from_discovery(&bundle).unwrap();
        assert_eq!(candidate.endpoint, local);
        assert_eq!(candidate.l2_addr, vec![0xAA, 0xBB]);
    }

    #[test]
    fn non_discovery_bundle_yields_no_candidate() {
        let mut bundle = build_discovery_bundle(
            &Eid::Ipn { node: 1, service: 0 },
            &[0x01],
            CreationTimestamp::default(),
            30,
            0,
        );
        bundle.primary.service_num = 99;
        assert!(candidate_from_discovery(&bundle).is_none());
    }
}
