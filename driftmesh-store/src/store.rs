use std::collections::VecDeque;

use driftmesh_bundle::{Bundle, BundleFingerprint, RetentionConstraint, MAX_BUNDLES};
use tracing::debug;

use crate::error::StoreError;

/// Fixed-capacity table of active bundles.
///
/// Slots are addressed only by fingerprint from the outside; the vector
/// index backing a given bundle is free to change across an eviction, so
/// callers never hold a raw slot index across an `await` point.
pub struct BundleStore {
    capacity: usize,
    slots: Vec<Option<Bundle>>,
}

impl BundleStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: Vec::with_capacity(capacity),
        }
    }

    /// A store sized to [`MAX_BUNDLES`], the default bundle capacity for
    /// a node.
    pub fn with_default_capacity() -> Self {
        Self::new(MAX_BUNDLES)
    }

    /// Finds a free slot, evicting the oldest `NONE`-retention bundle if
    /// the store is at capacity. Returns the index of the slot now
    /// available, or [`StoreError::Full`] if none qualifies: overflow is a
    /// defined error, never an overwrite of a bundle still in use.
    fn allocate(&mut self) -> Result<usize, StoreError> {
        if let Some(idx) = self.slots.iter().position(|s| s.is_none()) {
            return Ok(idx);
        }
        if self.slots.len() < self.capacity {
            self.slots.push(None);
            return Ok(self.slots.len() - 1);
        }

        let evictable = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| {
                s.as_ref()
                    .is_some_and(|b| b.retention_constraint == RetentionConstraint::None)
            })
            .min_by_key(|(_, s)| s.as_ref().unwrap().local_creation_time)
            .map(|(idx, _)| idx);

        match evictable {
            Some(idx) => {
                let evicted = self.slots[idx].take().unwrap();
                debug!(fingerprint = ?evicted.fingerprint(), "evicted bundle to make room");
                Ok(idx)
            }
            None => Err(StoreError::Full),
        }
    }

    /// Inserts a bundle, evicting the oldest reclaimable bundle if the
    /// store is full. Fails with [`StoreError::Full`] only when no slot
    /// could be freed.
    pub fn insert(&mut self, bundle: Bundle) -> Result<(), StoreError> {
        let idx = self.allocate()?;
        debug!(fingerprint = ?bundle.fingerprint(), slot = idx, "inserted bundle");
        self.slots[idx] = Some(bundle);
        Ok(())
    }

    /// Deletes the bundle with the given fingerprint, unless its
    /// retention constraint is not `NONE`. The caller must clear retention
    /// first. Returns `true` if a deletion occurred.
    pub fn delete(&mut self, fingerprint: BundleFingerprint) -> bool {
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(|b| b.fingerprint() == fingerprint) {
                if slot.as_ref().unwrap().retention_constraint != RetentionConstraint::None {
                    return false;
                }
                debug!(?fingerprint, "deleted bundle");
                *slot = None;
                return true;
            }
        }
        false
    }

    pub fn find(&self, fingerprint: BundleFingerprint) -> Option<&Bundle> {
        self.slots
            .iter()
            .flatten()
            .find(|b| b.fingerprint() == fingerprint)
    }

    pub fn find_mut(&mut self, fingerprint: BundleFingerprint) -> Option<&mut Bundle> {
        self.slots
            .iter_mut()
            .flatten()
            .find(|b| b.fingerprint() == fingerprint)
    }

    /// Every currently stored bundle. A bundle in the store is active by
    /// definition: a fully-delivered, unretained bundle is deleted rather
    /// than left occupying a slot.
    pub fn list_active(&self) -> impl Iterator<Item = &Bundle> {
        self.slots.iter().flatten()
    }

    pub fn set_retention(&mut self, fingerprint: BundleFingerprint, constraint: RetentionConstraint) -> bool {
        match self.find_mut(fingerprint) {
            Some(b) => {
                b.retention_constraint = constraint;
                true
            }
            None => false,
        }
    }

    pub fn get_retention(&self, fingerprint: BundleFingerprint) -> Option<RetentionConstraint> {
        self.find(fingerprint).map(|b| b.retention_constraint)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bounded ring of recently delivered bundle fingerprints, used to
/// suppress redundant local delivery when the same bundle is received
/// more than once.
pub struct ProcessedSet {
    capacity: usize,
    order: VecDeque<BundleFingerprint>,
}

impl ProcessedSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(driftmesh_bundle::PROCESSED_SET_CAPACITY)
    }

    pub fn mark_processed(&mut self, fingerprint: BundleFingerprint) {
        if self.order.contains(&fingerprint) {
            return;
        }
        if self.order.len() >= self.capacity {
            self.order.pop_front();
        }
        self.order.push_back(fingerprint);
    }

    pub fn is_redundant(&self, fingerprint: BundleFingerprint) -> bool {
        self.order.contains(&fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftmesh_bundle::{
        BlockFlags, BlockType, BundleFlags, CanonicalBlock, CreationTimestamp, CrcType, Eid,
        PrimaryBlock, Scheme, BUNDLE_PROTOCOL_VERSION,
    };

    fn bundle_at(seconds: u32, local_creation_time: u32) -> Bundle {
        Bundle {
            primary: PrimaryBlock {
                version: BUNDLE_PROTOCOL_VERSION,
                flags: BundleFlags::default(),
                scheme: Scheme::Ipn,
                crc_type: CrcType::None,
                destination: Eid::Ipn { node: 2, service: 1 },
                source: Eid::Ipn { node: 1, service: 1 },
                report_to: Eid::Ipn { node: 1, service: 1 },
                service_num: 1,
                creation_timestamp: CreationTimestamp { seconds, sequence: 0 },
                lifetime: 30,
                fragment_offset: 0,
                total_adu_length: 0,
            },
            blocks: vec![CanonicalBlock {
                block_type: BlockType::Payload,
                block_number: 1,
                flags: BlockFlags::default(),
                crc_type: CrcType::None,
                data: b"x".to_vec(),
            }],
            local_creation_time,
            previous_endpoint: None,
            retention_constraint: RetentionConstraint::None,
        }
    }

    #[test]
    fn capacity_bound_is_enforced() {
        let mut store = BundleStore::new(2);
        store.insert(bundle_at(1, 1)).unwrap();
        store.insert(bundle_at(2, 2)).unwrap();
        // Both bundles have NONE retention, so the oldest is evicted to
        // make room rather than failing.
        store.insert(bundle_at(3, 3)).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.find((1, 1, 0)).is_none());
        assert!(store.find((1, 3, 0)).is_some());
    }

    #[test]
    fn full_when_nothing_is_evictable() {
        let mut store = BundleStore::new(1);
        let mut b = bundle_at(1, 1);
        b.retention_constraint = RetentionConstraint::ForwardPending;
        store.insert(b).unwrap();
        assert_eq!(store.insert(bundle_at(2, 2)), Err(StoreError::Full));
    }

    #[test]
    fn deletion_is_blocked_while_retained() {
        let mut store = BundleStore::new(2);
        let mut b = bundle_at(1, 1);
        b.retention_constraint = RetentionConstraint::ForwardPending;
        store.insert(b).unwrap();
        let fp = (1, 1, 0);
        assert!(!store.delete(fp));
        store.set_retention(fp, RetentionConstraint::None);
        assert!(store.delete(fp));
        assert!(store.find(fp).is_none());
    }

    #[test]
    fn processed_set_suppresses_redundant_delivery() {
        let mut set = ProcessedSet::new(2);
        let fp = (1, 1, 0);
        assert!(!set.is_redundant(fp));
        set.mark_processed(fp);
        assert!(set.is_redundant(fp));
    }

    #[test]
    fn processed_set_ring_replaces_oldest() {
        let mut set = ProcessedSet::new(2);
        set.mark_processed((1, 1, 0));
        set.mark_processed((1, 2, 0));
        set.mark_processed((1, 3, 0));
        assert!(!set.is_redundant((1, 1, 0)));
        assert!(set.is_redundant((1, 2, 0)));
        assert!(set.is_redundant((1, 3, 0)));
    }
}
