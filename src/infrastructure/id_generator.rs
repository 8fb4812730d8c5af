// ID Generator - Snowflake-like ids with an embedded node id
// Ids from one generator are strictly increasing, so (created_at, id) orders rows by creation

use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::current_time_millis;

const NODE_BITS: u64 = 10;
const SEQUENCE_BITS: u64 = 12;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;
const TIMESTAMP_MASK: u64 = (1 << 42) - 1;

/// 64-bit id format: [timestamp:42][node_id:10][sequence:12]
#[derive(Debug)]
pub struct IdGenerator {
    node_id: u16,
    /// Last issued (timestamp << 12 | sequence).
    state: AtomicU64,
}

impl IdGenerator {
    /// Create new ID generator for given node
    pub fn new(node_id: u16) -> Self {
        Self {
            node_id: node_id & ((1 << NODE_BITS) - 1) as u16,
            state: AtomicU64::new(0),
        }
    }

    /// Generate next unique ID
    pub fn next_id(&self) -> i64 {
        let now = (current_time_millis().max(0) as u64) & TIMESTAMP_MASK;
        let floor = now << SEQUENCE_BITS;

        // Same millisecond (or a clock step back) advances the sequence; sequence overflow
        // borrows from the next millisecond instead of sleeping.
        let previous = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(floor.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        let next = floor.max(previous + 1);

        let timestamp = next >> SEQUENCE_BITS;
        let sequence = next & SEQUENCE_MASK;
        ((timestamp << (NODE_BITS + SEQUENCE_BITS))
            | ((self.node_id as u64) << SEQUENCE_BITS)
            | sequence) as i64
    }
}
