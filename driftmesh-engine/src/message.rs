use driftmesh_bundle::Eid;
use driftmesh_neighbors::NeighborId;

/// The convergence loop's message set. Exactly one message is processed
/// to completion before the next; all shared state lives behind this
/// loop.
#[derive(Debug, Clone)]
pub enum Message {
    /// A locally originated bundle to dispatch.
    Send {
        service_num: u32,
        destination: Eid,
        payload: Vec<u8>,
        lifetime_s: Option<u8>,
    },
    /// A raw L2 frame, classified on arrival as an ACK or a bundle.
    Recv { l2_src: Vec<u8>, bytes: Vec<u8> },
    /// Fires every `discovery_period_s`; the engine broadcasts a
    /// discovery beacon.
    DiscoveryTick,
    /// Fires every `retransmit_period_s`; the engine re-sends every
    /// eligible stored bundle.
    RetransmitTick,
    /// Posted by a neighbor's expiry timer on fire; the loop performs the
    /// actual table removal, keeping the timer callback itself free of
    /// any shared-state mutation.
    NeighborExpired(NeighborId),
}
