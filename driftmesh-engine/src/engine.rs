use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use driftmesh_bundle::{
    BlockFlags, BlockType, Bundle, BundleFingerprint, CanonicalBlock, CreationTimestamp, CrcType, Eid,
    PrimaryBlock, RetentionConstraint, BUNDLE_PROTOCOL_VERSION, CONTACT_MANAGER_SERVICE_NUM,
};
use driftmesh_neighbors::{self as neighbors, NeighborId, NeighborTable, Observation};
use driftmesh_router::{EpidemicRouter, Router};
use driftmesh_store::{BundleStore, ProcessedSet};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::ack::{self, Ack};
use crate::age;
use crate::application::{Application, RegistrationStatus};
use crate::config::Config;
use crate::link::LinkLayer;
use crate::message::Message;
use crate::stats::Stats;

/// Creates the bounded message queue feeding the convergence loop.
pub fn channel(config: &Config) -> (mpsc::Sender<Message>, mpsc::Receiver<Message>) {
    mpsc::channel(config.queue_capacity)
}

/// Posts a message without blocking; on a full queue the message is
/// dropped and counted rather than letting a slow consumer back up the
/// sender.
pub fn try_post(tx: &mpsc::Sender<Message>, stats: &Stats, msg: Message) {
    if tx.try_send(msg).is_err() {
        Stats::bump(&stats.queue_full);
    }
}

/// Spawns the discovery task: emits `DISCOVERY_TICK` every
/// `discovery_period_s`.
pub fn spawn_discovery_ticker(tx: mpsc::Sender<Message>, stats: Arc<Stats>, period_s: u32) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(period_s.max(1) as u64));
        loop {
            interval.tick().await;
            try_post(&tx, &stats, Message::DiscoveryTick);
        }
    })
}

/// Spawns the retransmit ticker: emits `RETRANSMIT_TICK` every
/// `retransmit_period_s`.
pub fn spawn_retransmit_ticker(tx: mpsc::Sender<Message>, stats: Arc<Stats>, period_s: u32) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(period_s.max(1) as u64));
        loop {
            interval.tick().await;
            try_post(&tx, &stats, Message::RetransmitTick);
        }
    })
}

/// The convergence engine: the single-threaded state machine owning the
/// bundle store, neighbor table and router. Everything else (L2,
/// application registry, timers) is an external collaborator that talks
/// to this type only through messages or the two trait seams
/// ([`LinkLayer`], [`Application`]), rather than through global
/// singletons.
pub struct Engine {
    config: Config,
    link: Arc<dyn LinkLayer>,
    app: Arc<dyn Application>,
    store: BundleStore,
    processed: ProcessedSet,
    neighbors: NeighborTable,
    router: Box<dyn Router + Send>,
    stats: Arc<Stats>,
    tx: mpsc::Sender<Message>,
    expiry_tasks: HashMap<NeighborId, JoinHandle<()>>,
    next_tick: u32,
    next_sequence: u32,
}

impl Engine {
    pub fn new(config: Config, link: Arc<dyn LinkLayer>, app: Arc<dyn Application>, tx: mpsc::Sender<Message>) -> Self {
        let store = BundleStore::new(config.store_capacity);
        Self {
            config,
            link,
            app,
            store,
            processed: ProcessedSet::with_default_capacity(),
            neighbors: NeighborTable::new(),
            router: Box::new(EpidemicRouter::new()),
            stats: Arc::new(Stats::new()),
            tx,
            expiry_tasks: HashMap::new(),
            next_tick: 0,
            next_sequence: 0,
        }
    }

    pub fn stats(&self) -> Arc<Stats> {
        self.stats.clone()
    }

    pub fn sender(&self) -> mpsc::Sender<Message> {
        self.tx.clone()
    }

    /// Runs the loop until the channel is closed. Messages are processed
    /// one at a time to completion; there is no preemption mid-message.
    pub async fn run(&mut self, mut rx: mpsc::Receiver<Message>) {
        while let Some(msg) = rx.recv().await {
            self.handle(msg).await;
        }
    }

    #[instrument(skip(self, msg))]
    pub async fn handle(&mut self, msg: Message) {
        match msg {
            Message::Send { service_num, destination, payload, lifetime_s } => {
                self.handle_send(service_num, destination, payload, lifetime_s).await;
            }
            Message::Recv { l2_src, bytes } => self.handle_recv(l2_src, bytes).await,
            Message::DiscoveryTick => self.handle_discovery_tick().await,
            Message::RetransmitTick => self.handle_retransmit_tick().await,
            Message::NeighborExpired(id) => {
                self.expiry_tasks.remove(&id);
                self.neighbors.remove(id);
            }
        }
    }

    fn next_creation_timestamp(&mut self) -> CreationTimestamp {
        self.next_sequence = self.next_sequence.wrapping_add(1);
        let seconds = if self.config.has_clock {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs() as u32)
                .unwrap_or(0)
        } else {
            0
        };
        CreationTimestamp { seconds, sequence: self.next_sequence }
    }

    fn next_local_tick(&mut self) -> u32 {
        self.next_tick = self.next_tick.wrapping_add(1);
        self.next_tick
    }

    fn destination_is_local(&self, destination: &Eid) -> bool {
        match (destination, &self.config.node_endpoint) {
            (Eid::Ipn { node, .. }, Eid::Ipn { node: local, .. }) => node == local,
            (Eid::Dtn(id), Eid::Dtn(local)) => id == local,
            _ => false,
        }
    }

    // ---- SEND -----------------------------------------------------

    async fn handle_send(&mut self, service_num: u32, destination: Eid, payload: Vec<u8>, lifetime_s: Option<u8>) {
        let registration = self.app.registration(service_num);
        if registration.status != RegistrationStatus::Active {
            debug!(service_num, "SEND dropped: application not active");
            Stats::bump(&self.stats.application_inactive);
            return;
        }
        if payload.len() > driftmesh_bundle::BLOCK_DATA_BUF_SIZE {
            Stats::bump(&self.stats.bundle_too_large);
            return;
        }

        let creation_timestamp = self.next_creation_timestamp();
        let local_creation_time = self.next_local_tick();
        let lifetime = lifetime_s.unwrap_or(self.config.default_lifetime_s);
        let local = self.config.node_endpoint.clone();

        let mut bundle = Bundle {
            primary: PrimaryBlock {
                version: BUNDLE_PROTOCOL_VERSION,
                flags: Default::default(),
                scheme: local.scheme(),
                crc_type: CrcType::Crc32,
                destination,
                source: local.clone(),
                report_to: local,
                service_num,
                creation_timestamp,
                lifetime,
                fragment_offset: 0,
                total_adu_length: payload.len() as u32,
            },
            blocks: vec![CanonicalBlock {
                block_type: BlockType::Payload,
                block_number: 1,
                flags: BlockFlags::default(),
                crc_type: CrcType::Crc32,
                data: payload,
            }],
            local_creation_time,
            previous_endpoint: None,
            retention_constraint: RetentionConstraint::None,
        };
        age::set(&mut bundle, 0);

        let fp = bundle.fingerprint();
        if let Err(e) = self.store.insert(bundle) {
            warn!(error = %e, "SEND dropped: store full");
            Stats::bump(&self.stats.store_full);
            return;
        }

        self.store.set_retention(fp, RetentionConstraint::DispatchPending);
        self.transmit_burst(fp).await;
        self.store.set_retention(fp, RetentionConstraint::None);
    }

    /// Shared "increment age, encode once, unicast to every eligible
    /// neighbor, restore age" burst used by SEND, RETRANSMIT_TICK and
    /// new-neighbor catch-up.
    async fn transmit_burst(&mut self, fp: BundleFingerprint) {
        let Some(bundle) = self.store.find(fp) else { return };
        let previous_endpoint = bundle.previous_endpoint.clone();
        let destination = bundle.primary.destination.clone();
        let age_before = age::get(bundle);
        let age_after = age_before + 1;

        if age_after >= bundle.primary.lifetime as u32 {
            self.expire_bundle(fp);
            return;
        }

        let candidates: Vec<NeighborId> = self
            .router
            .route_receivers(&destination, &self.neighbors)
            .into_iter()
            .filter(|&id| {
                let Some(n) = self.neighbors.get(id) else { return false };
                if previous_endpoint.as_ref() == Some(&n.endpoint) {
                    return false;
                }
                let nfp = n.fingerprint();
                !self.router.already_delivered(fp, &nfp)
            })
            .collect();

        if candidates.is_empty() {
            return;
        }

        let Some(bundle) = self.store.find_mut(fp) else { return };
        age::set(bundle, age_after);
        let encoded = bundle.encode();

        for id in candidates {
            let Some(l2_addr) = self.neighbors.get(id).map(|n| n.l2_addr.clone()) else { continue };
            if let Err(e) = self.link.send_unicast(&l2_addr, &encoded).await {
                warn!(error = %e, "unicast send failed");
                Stats::bump(&self.stats.l2_send_failed);
            } else {
                Stats::bump(&self.stats.forwarded);
            }
        }

        if let Some(bundle) = self.store.find_mut(fp) {
            age::set(bundle, age_before);
        }
    }

    fn expire_bundle(&mut self, fp: BundleFingerprint) {
        self.store.set_retention(fp, RetentionConstraint::None);
        self.store.delete(fp);
        self.router.on_bundle_deleted(fp);
        Stats::bump(&self.stats.expired);
    }

    // ---- RECV -------------------------------------------------------

    async fn handle_recv(&mut self, l2_src: Vec<u8>, bytes: Vec<u8>) {
        if ack::is_ack_frame(&bytes) {
            self.handle_recv_ack(&l2_src, &bytes).await;
        } else {
            self.handle_recv_bundle(l2_src, &bytes).await;
        }
    }

    async fn handle_recv_ack(&mut self, l2_src: &[u8], bytes: &[u8]) {
        let Some(Ack { creation_ts0, creation_ts1, src_num }) = ack::decode(bytes) else {
            Stats::bump(&self.stats.codec_malformed);
            return;
        };
        let Some(sender_id) = self.neighbors.find_by_l2(l2_src) else {
            debug!("ACK from unknown neighbor, dropping");
            return;
        };
        let Some(nfp) = self.neighbors.fingerprint_of(sender_id) else { return };
        let bundle_fp = (src_num, creation_ts0, creation_ts1);
        self.router.record_ack(bundle_fp, nfp);
        Stats::bump(&self.stats.acks_received);
    }

    async fn handle_recv_bundle(&mut self, l2_src: Vec<u8>, bytes: &[u8]) {
        let mut bundle = match Bundle::decode(bytes) {
            Ok(b) => b,
            Err(driftmesh_bundle::CodecError::CrcMismatch) => {
                Stats::bump(&self.stats.codec_crc_mismatch);
                return;
            }
            Err(driftmesh_bundle::CodecError::BundleTooLarge(_, _)) => {
                Stats::bump(&self.stats.bundle_too_large);
                return;
            }
            Err(_) => {
                Stats::bump(&self.stats.codec_malformed);
                return;
            }
        };
        bundle.local_creation_time = self.next_local_tick();

        if age::is_expired(&bundle) {
            Stats::bump(&self.stats.expired);
            return;
        }

        let fp = bundle.fingerprint();
        let is_discovery = neighbors::is_discovery_bundle(&bundle);

        if self.processed.is_redundant(fp) || self.store.find(fp).is_some() {
            Stats::bump(&self.stats.redundant_dropped);
            if is_discovery {
                if let Some(candidate) = neighbors::candidate_from_discovery(&bundle) {
                    self.observe_neighbor(candidate).await;
                }
            } else {
                self.send_ack(&l2_src, bundle.primary.creation_timestamp, bundle.primary.source.node_num().unwrap_or(0))
                    .await;
            }
            return;
        }

        if is_discovery {
            if let Some(candidate) = neighbors::candidate_from_discovery(&bundle) {
                self.observe_neighbor(candidate).await;
            }
            return;
        }

        let previous_hop = self.neighbors.find_by_l2(&l2_src).and_then(|id| self.neighbors.get(id).cloned());
        bundle.previous_endpoint = previous_hop.as_ref().map(|n| n.endpoint.clone());

        self.send_ack(&l2_src, bundle.primary.creation_timestamp, bundle.primary.source.node_num().unwrap_or(0))
            .await;

        if self.destination_is_local(&bundle.primary.destination) {
            self.deliver_locally(bundle, fp).await;
        } else {
            self.forward(bundle, fp).await;
        }
    }

    async fn send_ack(&mut self, l2_src: &[u8], creation_timestamp: CreationTimestamp, src_num: u32) {
        let ack = Ack {
            creation_ts0: creation_timestamp.seconds,
            creation_ts1: creation_timestamp.sequence,
            src_num,
        };
        if let Err(e) = self.link.send_unicast(l2_src, &ack::encode(ack)).await {
            warn!(error = %e, "failed to send ACK");
            Stats::bump(&self.stats.l2_send_failed);
        } else {
            Stats::bump(&self.stats.acks_sent);
        }
    }

    async fn deliver_locally(&mut self, bundle: Bundle, fp: BundleFingerprint) {
        let retention_holder = self.store.insert(bundle);
        if retention_holder.is_err() {
            Stats::bump(&self.stats.store_full);
            return;
        }
        self.store.set_retention(fp, RetentionConstraint::SendAckPending);

        let stored = self.store.find(fp).unwrap();
        let registration = self.app.registration(stored.primary.service_num);
        if registration.status == RegistrationStatus::Active {
            let source = stored.primary.source.clone();
            let payload = self.store.find(fp).and_then(|b| b.payload()).map(|p| p.data.clone());
            if let Some(payload) = payload {
                self.app.deliver(registration.handle, source, payload).await;
                Stats::bump(&self.stats.delivered);
            }
        } else {
            Stats::bump(&self.stats.application_inactive);
        }

        self.processed.mark_processed(fp);
        self.store.set_retention(fp, RetentionConstraint::None);
        self.store.delete(fp);
    }

    async fn forward(&mut self, bundle: Bundle, fp: BundleFingerprint) {
        if self.store.insert(bundle).is_err() {
            Stats::bump(&self.stats.store_full);
            return;
        }
        self.store.set_retention(fp, RetentionConstraint::ForwardPending);
        self.transmit_burst(fp).await;
        self.store.set_retention(fp, RetentionConstraint::None);
    }

    // ---- Discovery ----------------------------------------------------

    async fn observe_neighbor(&mut self, candidate: driftmesh_neighbors::Neighbor) {
        match self.neighbors.observe(candidate) {
            Observation::Refreshed(id) => self.arm_expiry(id),
            Observation::Inserted(id) => {
                self.arm_expiry(id);
                self.send_bundles_to_new_neighbor(id).await;
            }
        }
    }

    fn arm_expiry(&mut self, id: NeighborId) {
        if let Some(old) = self.expiry_tasks.remove(&id) {
            old.abort();
        }
        let tx = self.tx.clone();
        let stats = self.stats.clone();
        let purge_s = self.config.neighbor_purge_period_s();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(purge_s.max(1) as u64)).await;
            try_post(&tx, &stats, Message::NeighborExpired(id));
        });
        self.expiry_tasks.insert(id, handle);
    }

    // ---- Ticks ----------------------------------------------------

    async fn handle_discovery_tick(&mut self) {
        let creation_timestamp = self.next_creation_timestamp();
        let local_creation_time = self.next_local_tick();
        let local = self.config.node_endpoint.clone();
        let l2_addr = self.link.local_address();
        let bundle = neighbors::build_discovery_bundle(&local, &l2_addr, creation_timestamp, 5, local_creation_time);
        let encoded = bundle.encode();
        if let Err(e) = self.link.send_broadcast(&encoded).await {
            warn!(error = %e, "discovery broadcast failed");
            Stats::bump(&self.stats.l2_send_failed);
        }
    }

    async fn handle_retransmit_tick(&mut self) {
        let fps: Vec<BundleFingerprint> = self
            .store
            .list_active()
            .filter(|b| {
                b.retention_constraint == RetentionConstraint::None
                    && !self.destination_is_local(&b.primary.destination)
                    && b.primary.service_num != CONTACT_MANAGER_SERVICE_NUM
            })
            .map(|b| b.fingerprint())
            .collect();

        for fp in fps {
            if self.store.find(fp).is_some_and(age::is_expired) {
                self.expire_bundle(fp);
                continue;
            }
            self.store.set_retention(fp, RetentionConstraint::ForwardPending);
            self.transmit_burst(fp).await;
            self.store.set_retention(fp, RetentionConstraint::None);
        }
    }

    /// Iterates the store and unicasts every eligible bundle to a newly
    /// discovered neighbor, so it catches up on anything already in
    /// flight.
    async fn send_bundles_to_new_neighbor(&mut self, id: NeighborId) {
        let Some(neighbor) = self.neighbors.get(id).cloned() else { return };
        let nfp = neighbor.fingerprint();

        let fps: Vec<BundleFingerprint> = self
            .store
            .list_active()
            .filter(|b| b.primary.destination != Eid::broadcast())
            .map(|b| b.fingerprint())
            .collect();

        for fp in fps {
            if self.router.already_delivered(fp, &nfp) {
                continue;
            }
            let Some(bundle) = self.store.find(fp) else { continue };
            let age_before = age::get(bundle);
            let age_after = age_before + 1;
            if age_after >= bundle.primary.lifetime as u32 {
                self.expire_bundle(fp);
                continue;
            }

            let Some(bundle) = self.store.find_mut(fp) else { continue };
            age::set(bundle, age_after);
            let encoded = bundle.encode();

            if let Err(e) = self.link.send_unicast(&neighbor.l2_addr, &encoded).await {
                warn!(error = %e, "catch-up unicast failed");
                Stats::bump(&self.stats.l2_send_failed);
            } else {
                Stats::bump(&self.stats.forwarded);
            }

            if let Some(bundle) = self.store.find_mut(fp) {
                age::set(bundle, age_before);
            }
        }
    }
}
