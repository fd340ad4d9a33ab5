use driftmesh_bundle::{BundleFingerprint, Eid};
use driftmesh_neighbors::{NeighborFingerprint, NeighborId, NeighborTable};

use crate::ledger::DeliveryLedger;

/// The routing strategy operations the convergence engine depends on. A
/// `Router` value owns whatever state its strategy needs (for epidemic
/// routing, the delivery ledger) behind one small interface: the engine
/// depends on these operations, never on the representation behind them.
pub trait Router {
    /// Candidate next hops for `dst`. Direct delivery if a neighbor with
    /// that endpoint number is present, otherwise flood to every current
    /// neighbor.
    fn route_receivers(&self, dst: &Eid, neighbors: &NeighborTable) -> Vec<NeighborId>;

    fn record_ack(&mut self, bundle_fp: BundleFingerprint, neighbor_fp: NeighborFingerprint);

    fn already_delivered(&self, bundle_fp: BundleFingerprint, neighbor_fp: &NeighborFingerprint) -> bool;

    fn on_bundle_deleted(&mut self, bundle_fp: BundleFingerprint);
}

/// Flood-to-all-except-previous-hop routing: no multi-hop routing
/// metrics beyond reaching every currently known neighbor.
#[derive(Default)]
pub struct EpidemicRouter {
    ledger: DeliveryLedger,
}

impl EpidemicRouter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Router for EpidemicRouter {
    fn route_receivers(&self, dst: &Eid, neighbors: &NeighborTable) -> Vec<NeighborId> {
        if let Some(node) = dst.node_num() {
            if let Some(id) = neighbors.find_by_endpoint_num(node) {
                return vec![id];
            }
        }
        neighbors.iter().map(|(id, _)| id).collect()
    }

    fn record_ack(&mut self, bundle_fp: BundleFingerprint, neighbor_fp: NeighborFingerprint) {
        self.ledger.record_ack(bundle_fp, neighbor_fp);
    }

    fn already_delivered(&self, bundle_fp: BundleFingerprint, neighbor_fp: &NeighborFingerprint) -> bool {
        self.ledger.already_delivered(bundle_fp, neighbor_fp)
    }

    fn on_bundle_deleted(&mut self, bundle_fp: BundleFingerprint) {
        self.ledger.on_bundle_deleted(bundle_fp);
    }
}
