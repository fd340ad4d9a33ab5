use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory tally of the error kinds and lifecycle events the engine
/// encounters. Not a reporting pipeline - just the counters the engine
/// bumps so a caller (or a test) can ask "how many frames were dropped
/// and why".
#[derive(Default)]
pub struct Stats {
    pub codec_malformed: AtomicU64,
    pub codec_crc_mismatch: AtomicU64,
    pub bundle_too_large: AtomicU64,
    pub store_full: AtomicU64,
    pub no_route: AtomicU64,
    pub l2_send_failed: AtomicU64,
    pub application_inactive: AtomicU64,
    pub queue_full: AtomicU64,
    pub delivered: AtomicU64,
    pub forwarded: AtomicU64,
    pub acks_sent: AtomicU64,
    pub acks_received: AtomicU64,
    pub redundant_dropped: AtomicU64,
    pub expired: AtomicU64,
}

macro_rules! counter_accessor {
    ($field:ident) => {
        pub fn $field(&self) -> u64 {
            self.$field.load(Ordering::Relaxed)
        }
    };
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    counter_accessor!(codec_malformed);
    counter_accessor!(codec_crc_mismatch);
    counter_accessor!(bundle_too_large);
    counter_accessor!(store_full);
    counter_accessor!(no_route);
    counter_accessor!(l2_send_failed);
    counter_accessor!(application_inactive);
    counter_accessor!(queue_full);
    counter_accessor!(delivered);
    counter_accessor!(forwarded);
    counter_accessor!(acks_sent);
    counter_accessor!(acks_received);
    counter_accessor!(redundant_dropped);
    counter_accessor!(expired);
}
