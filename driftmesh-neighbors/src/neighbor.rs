use driftmesh_bundle::{Eid, Scheme};

/// Identity used for the equality rule (same scheme and (same number or
/// same EID) and same L2 address bytes) and as the stable key the
/// delivery ledger hangs its entries off, independent of the table slot
/// a neighbor happens to occupy.
pub type NeighborFingerprint = (Scheme, Option<u32>, Option<String>, Vec<u8>);

/// A currently (or recently) reachable peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighbor {
    pub endpoint: Eid,
    pub l2_addr: Vec<u8>,
}

impl Neighbor {
    pub fn new(endpoint: Eid, l2_addr: Vec<u8>) -> Self {
        Self { endpoint, l2_addr }
    }

    pub fn scheme(&self) -> Scheme {
        self.endpoint.scheme()
    }

    pub fn endpoint_num(&self) -> Option<u32> {
        self.endpoint.node_num()
    }

    pub fn fingerprint(&self) -> NeighborFingerprint {
        let (node, dtn_id) = match &self.endpoint {
            Eid::Ipn { node, .. } => (Some(*node), None),
            Eid::Dtn(id) => (None, Some(id.clone())),
        };
        (self.scheme(), node, dtn_id, self.l2_addr.clone())
    }

    /// Identity equality: same endpoint identity and same L2 address bytes.
    pub fn identity_eq(&self, other: &Neighbor) -> bool {
        self.scheme() == other.scheme() && self.endpoint == other.endpoint && self.l2_addr == other.l2_addr
    }
}
