//! Pending-update accumulation and flush batching.
//!
//! The batcher maps destination record ids to their pending field
//! updates. Inserting for an id that is already pending keeps
//! whichever entry carries the newer comparison timestamp, so a stale
//! metric can never clobber a fresher one inside a batch window.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// A buffered, not-yet-written field update for one destination record.
#[derive(Debug, Clone)]
pub struct PendingUpdate {
    pub record_id: String,
    pub fields: Map<String, Value>,
    /// Comparison timestamp: a candidate for the same record id replaces
    /// the pending entry only if strictly newer on this field.
    pub last_heartbeat_at: DateTime<Utc>,
}

/// Accumulates pending updates up to a fixed capacity.
///
/// [`UpdateBatcher::insert`] hands back a full batch the moment the map
/// reaches capacity; the caller writes it out and the map is already clear,
/// so the pending map never exceeds the capacity at any observable point.
/// Whatever remains at end of run is drained with
/// [`UpdateBatcher::take_remaining`].
#[derive(Debug)]
pub struct UpdateBatcher {
    capacity: usize,
    pending: HashMap<String, PendingUpdate>,
    // Flush order follows first-insert order per record id.
    order: Vec<String>,
}

impl UpdateBatcher {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            pending: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Inserts or supersedes a pending update.
    ///
    /// Returns `Some(batch)` when the insert filled the map to capacity;
    /// the returned batch is in first-insert order and the map is left
    /// empty. Returns `None` otherwise.
    pub fn insert(&mut self, candidate: PendingUpdate) -> Option<Vec<PendingUpdate>> {
        match self.pending.entry(candidate.record_id.clone()) {
            std::collections::hash_map::Entry::Occupied(mut existing) => {
                if candidate.last_heartbeat_at > existing.get().last_heartbeat_at {
                    existing.insert(candidate);
                } else {
                    tracing::debug!(
                        record_id = %candidate.record_id,
                        "discarding candidate not newer than the pending update"
                    );
                }
            }
            std::collections::hash_map::Entry::Vacant(slot) => {
                self.order.push(candidate.record_id.clone());
                slot.insert(candidate);
            }
        }

        if self.pending.len() >= self.capacity {
            Some(self.drain())
        } else {
            None
        }
    }

    /// Drains whatever is pending, in first-insert order. Used for the
    /// unconditional end-of-run flush.
    pub fn take_remaining(&mut self) -> Vec<PendingUpdate> {
        self.drain()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn drain(&mut self) -> Vec<PendingUpdate> {
        let order = std::mem::take(&mut self.order);
        order
            .into_iter()
            .filter_map(|id| self.pending.remove(&id))
            .collect()
    }
}
