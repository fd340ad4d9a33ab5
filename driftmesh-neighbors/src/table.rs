use std::collections::HashMap;

use tracing::debug;

use crate::neighbor::{Neighbor, NeighborFingerprint};

/// A table-assigned handle for a neighbor entry, stable for as long as
/// the entry has not been purged. Assigned by a wrapping counter on
/// insert, with no queueing machinery beyond the table itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NeighborId(u64);

/// Outcome of observing a discovery bundle against the current table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// An identity-equal neighbor was already present; its expiry timer
    /// should be reset by the caller.
    Refreshed(NeighborId),
    /// No identity-equal neighbor existed; one was inserted and its
    /// expiry timer should be armed, and the caller should run
    /// new-neighbor catch-up.
    Inserted(NeighborId),
}

/// The set of currently reachable peers. Expiry timers themselves live
/// outside this table: the engine arms a `tokio::time::sleep` per entry
/// and posts a `NeighborExpired` message on fire, keeping timer
/// callbacks free of shared-state mutation; this table only holds the
/// entries and answers identity/routing lookups.
#[derive(Default)]
pub struct NeighborTable {
    entries: HashMap<NeighborId, Neighbor>,
    next_id: u64,
}

impl NeighborTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_id(&mut self) -> NeighborId {
        loop {
            self.next_id = self.next_id.wrapping_add(1);
            let id = NeighborId(self.next_id);
            if !self.entries.contains_key(&id) {
                return id;
            }
        }
    }

    /// Applies a freshly received discovery bundle's candidate neighbor
    /// against the table.
    pub fn observe(&mut self, candidate: Neighbor) -> Observation {
        if let Some((&id, _)) = self.entries.iter().find(|(_, n)| n.identity_eq(&candidate)) {
            return Observation::Refreshed(id);
        }
        let id = self.alloc_id();
        debug!(endpoint = %candidate.endpoint, "new neighbor discovered");
        self.entries.insert(id, candidate);
        Observation::Inserted(id)
    }

    /// Removes an entry, e.g. when its expiry timer fires. Bundles
    /// already queued for this neighbor are unaffected: they remain
    /// stored and are retried on any future contact.
    pub fn remove(&mut self, id: NeighborId) -> Option<Neighbor> {
        let removed = self.entries.remove(&id);
        if let Some(n) = &removed {
            debug!(endpoint = %n.endpoint, "neighbor expired");
        }
        removed
    }

    pub fn get(&self, id: NeighborId) -> Option<&Neighbor> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NeighborId, &Neighbor)> {
        self.entries.iter().map(|(&id, n)| (id, n))
    }

    /// Finds the neighbor whose endpoint node number equals `node_num`,
    /// used both for direct delivery and for resolving a bundle's
    /// `previous_endpoint_num` back to a live neighbor.
    pub fn find_by_endpoint_num(&self, node_num: u32) -> Option<NeighborId> {
        self.entries
            .iter()
            .find(|(_, n)| n.endpoint_num() == Some(node_num))
            .map(|(&id, _)| id)
    }

    /// Finds the neighbor whose L2 address matches, used to resolve an
    /// inbound frame's L2 source address to a known neighbor (ACK path).
    pub fn find_by_l2(&self, l2_addr: &[u8]) -> Option<NeighborId> {
        self.entries
            .iter()
            .find(|(_, n)| n.l2_addr == l2_addr)
            .map(|(&id, _)| id)
    }

    pub fn fingerprint_of(&self, id: NeighborId) -> Option<NeighborFingerprint> {
        self.entries.get(&id).map(Neighbor::fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftmesh_bundle::Eid;

    fn neighbor(node: u32, l2: &[u8]) -> Neighbor {
        Neighbor::new(Eid::Ipn { node, service: 0 }, l2.to_vec())
    }

    #[test]
    fn first_sighting_inserts() {
        let mut table = NeighborTable::new();
        match table.observe(neighbor(2, &[0x01])) {
            Observation::Inserted(_) => {}
            other => panic!("expected Inserted, got {other:?}"),
        }
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn repeat_sighting_refreshes_same_entry() {
        let mut table = NeighborTable::new();
        let Observation::Inserted(id) = table.observe(neighbor(2, &[0x01])) else {
            panic!("expected Inserted")
        };
        match table.observe(neighbor(2, &[0x01])) {
            Observation::Refreshed(refreshed_id) => assert_eq!(refreshed_id, id),
            other => panic!("expected Refreshed, got {other:?}"),
        }
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn different_l2_address_is_a_distinct_neighbor() {
        let mut table = NeighborTable::new();
        table.observe(neighbor(2, &[0x01]));
        match table.observe(neighbor(2, &[0x02])) {
            Observation::Inserted(_) => {}
            other => panic!("expected Inserted, got {other:?}"),
        }
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn removal_drops_the_entry() {
        let mut table = NeighborTable::new();
        let Observation::Inserted(id) = table.observe(neighbor(2, &[0x01])) else {
            panic!("expected Inserted")
        };
        assert!(table.remove(id).is_some());
        assert!(table.is_empty());
    }
}
