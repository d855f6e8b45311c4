use std::sync::atomic::{AtomicU64, Ordering};

use crate::time_utils::current_unix_timestamp_ms;

/// Correlation-id source for outbound RPC requests.
///
/// Ids are `req-<seed>-<seq>`: a per-process time seed plus a monotonic
/// sequence, so two generators started in different processes do not
/// collide and a single generator never repeats. Correlation only spans a
/// process lifetime, so this is all the uniqueness the protocol needs.
#[derive(Debug)]
pub struct RequestIdGenerator {
    seed: u64,
    sequence: AtomicU64,
}

impl RequestIdGenerator {
    pub fn new() -> Self {
        Self {
            seed: current_unix_timestamp_ms(),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn next_id(&self) -> String {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        format!("req-{:x}-{}", self.seed, sequence)
    }
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
