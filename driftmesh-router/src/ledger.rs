use std::collections::HashSet;

use driftmesh_bundle::BundleFingerprint;
use driftmesh_neighbors::NeighborFingerprint;

/// Per-(bundle, neighbor) record of acknowledged receipts. A plain set:
/// ACKs may arrive out of order, and duplicate ACKs from the same
/// neighbor collapse to one entry, which a set gives for free.
#[derive(Default)]
pub struct DeliveryLedger {
    entries: HashSet<(BundleFingerprint, NeighborFingerprint)>,
}

impl DeliveryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_ack(&mut self, bundle_fp: BundleFingerprint, neighbor_fp: NeighborFingerprint) {
        self.entries.insert((bundle_fp, neighbor_fp));
    }

    pub fn already_delivered(&self, bundle_fp: BundleFingerprint, neighbor_fp: &NeighborFingerprint) -> bool {
        self.entries.contains(&(bundle_fp, neighbor_fp.clone()))
    }

    /// Purges every entry referencing a bundle once it is deleted from
    /// the store, so the ledger never outlives the bundle it describes.
    pub fn on_bundle_deleted(&mut self, bundle_fp: BundleFingerprint) {
        self.entries.retain(|(fp, _)| *fp != bundle_fp);
    }
}
