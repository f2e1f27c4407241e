// src/registry/ids.rs

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use crate::types::{RunId, SubscriberId};

/// Generates run ids of the form `YYYYMMDD-HHMMSS-mmm-<seq>`.
///
/// The timestamp keeps ids readable; the sequence number keeps them unique
/// when several runs start within the same millisecond.
#[derive(Debug, Default)]
pub struct RunIdGenerator {
    seq: AtomicU64,
}

impl RunIdGenerator {
    pub fn next_id(&self) -> RunId {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", Utc::now().format("%Y%m%d-%H%M%S-%3f"), seq)
    }
}

/// The sequence number at the end of a generated run id.
pub(crate) fn run_sequence(id: &str) -> Option<u64> {
    id.rsplit('-').next()?.parse().ok()
}

/// Generates subscriber ids for registry-created event streams.
#[derive(Debug, Default)]
pub struct SubscriberIdGenerator {
    seq: AtomicU64,
}

impl SubscriberIdGenerator {
    pub fn next_id(&self) -> SubscriberId {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        format!("stream-{seq}")
    }
}
