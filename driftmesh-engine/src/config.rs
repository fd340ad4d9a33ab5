use driftmesh_bundle::{Eid, Scheme, CONTACT_PERIOD_SECONDS, MAX_BUNDLES};

/// Routing strategy selector. Epidemic is the only strategy this stack
/// implements - no multi-hop routing metrics beyond flooding every
/// neighbor; the field is carried as a real enum rather than a bare
/// string so a future strategy is a non-breaking addition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RouterKind {
    #[default]
    Epidemic,
}

/// Node configuration. `driftmesh-engine` itself depends only on this
/// plain struct, not on any file-format crate - `driftmesh-node` owns
/// the `config` crate dependency and the file-backed settings layer,
/// and produces one of these.
#[derive(Debug, Clone)]
pub struct Config {
    pub node_endpoint: Eid,
    /// Nodes without a clock use a free-running sequence counter instead
    /// of wall-clock seconds for bundle creation timestamps.
    pub has_clock: bool,
    pub discovery_period_s: u32,
    pub retransmit_period_s: u32,
    pub store_capacity: usize,
    pub router: RouterKind,
    /// Default bundle lifetime in seconds, used for locally originated
    /// bundles and discovery beacons unless overridden per-send.
    pub default_lifetime_s: u8,
    /// Capacity of the bounded message queue feeding the convergence
    /// loop. Overflow drops the incoming message and bumps a counter
    /// rather than blocking the sender.
    pub queue_capacity: usize,
}

impl Config {
    pub fn new(node_endpoint: Eid) -> Self {
        Self {
            node_endpoint,
            has_clock: false,
            discovery_period_s: CONTACT_PERIOD_SECONDS,
            retransmit_period_s: 300,
            store_capacity: MAX_BUNDLES,
            router: RouterKind::Epidemic,
            default_lifetime_s: 60,
            queue_capacity: 64,
        }
    }

    pub fn neighbor_purge_period_s(&self) -> u32 {
        2 * self.discovery_period_s
    }

    pub fn scheme(&self) -> Scheme {
        self.node_endpoint.scheme()
    }
}
