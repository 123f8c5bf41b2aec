//! Local change tracking.
//!
//! The tracker records every committed local mutation as a pending
//! change. A record has at most one outstanding entry per table:
//! later writes collapse into the existing entry so that the pending
//! set always equals the net effect of the writes since the last
//! acknowledged push.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use tidedb_core::{ChangeEvent, ChangeKind, CommitObserver, Record, WriteOrigin};

use crate::checkpoint::Checkpoint;

/// A pending local change awaiting server acknowledgment.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEntry {
    /// Table the change applies to.
    pub table: String,
    /// Identifier of the changed record.
    pub record_id: String,
    /// Net kind of the change.
    pub kind: ChangeKind,
    /// Latest local snapshot. None for deletes.
    pub snapshot: Option<Record>,
    /// Monotonic revision, bumped on every merge. Used to clear only
    /// entries that were part of an acknowledged push.
    pub revision: u64,
}

/// A watermarked snapshot of the pending set, handed to the push
/// engine for one round.
#[derive(Debug, Clone, Default)]
pub struct PendingBatch {
    /// Pending entries grouped by table.
    pub by_table: BTreeMap<String, Vec<ChangeEntry>>,
    /// Highest revision contained in the batch. Acknowledging the
    /// batch clears entries at or below this revision only.
    pub watermark: u64,
}

impl PendingBatch {
    /// Total number of entries in the batch.
    pub fn len(&self) -> usize {
        self.by_table.values().map(Vec::len).sum()
    }

    /// Returns true if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.by_table.is_empty()
    }
}

#[derive(Default)]
struct TrackerState {
    entries: BTreeMap<(String, String), ChangeEntry>,
    next_revision: u64,
}

/// Tracks pending local changes, keyed by `(table, record_id)`.
///
/// Registered as a [`CommitObserver`] on the store; only local-origin
/// events are recorded (sync-applied writes must not be re-pushed).
#[derive(Default)]
pub struct ChangeTracker {
    state: Mutex<TrackerState>,
}

impl ChangeTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one committed local mutation, merging with any
    /// outstanding entry for the same record:
    /// - Created then Updated stays Created
    /// - anything then Deleted becomes Deleted
    /// - Deleted then Created becomes Updated (net effect: the record
    ///   exists with new content and the server already knew the id)
    pub fn record(
        &self,
        table: &str,
        record_id: &str,
        kind: ChangeKind,
        snapshot: Option<Record>,
    ) {
        let mut state = self.state.lock();
        state.next_revision += 1;
        let revision = state.next_revision;
        let key = (table.to_string(), record_id.to_string());

        let merged_kind = match (state.entries.get(&key).map(|e| e.kind), kind) {
            (None, kind) => kind,
            (Some(_), ChangeKind::Deleted) => ChangeKind::Deleted,
            (Some(ChangeKind::Created), _) => ChangeKind::Created,
            (Some(ChangeKind::Deleted), ChangeKind::Created) => ChangeKind::Updated,
            (Some(_), _) => ChangeKind::Updated,
        };

        state.entries.insert(
            key,
            ChangeEntry {
                table: table.to_string(),
                record_id: record_id.to_string(),
                kind: merged_kind,
                snapshot: if merged_kind == ChangeKind::Deleted {
                    None
                } else {
                    snapshot
                },
                revision,
            },
        );
    }

    /// The watermarked batch of changes pending against a checkpoint.
    /// Entries are pending by construction since the last acknowledged
    /// push, which is never newer than `_checkpoint`.
    pub fn pending_since(&self, _checkpoint: &Checkpoint) -> PendingBatch {
        self.snapshot()
    }

    /// Takes a watermarked snapshot of the pending set for one push
    /// round. Entries written after the snapshot get higher revisions
    /// and survive the batch's acknowledgment.
    pub fn snapshot(&self) -> PendingBatch {
        let state = self.state.lock();
        let mut batch = PendingBatch::default();
        for entry in state.entries.values() {
            batch.watermark = batch.watermark.max(entry.revision);
            batch
                .by_table
                .entry(entry.table.clone())
                .or_default()
                .push(entry.clone());
        }
        batch
    }

    /// Clears entries at or below the acknowledged watermark. Called
    /// only after the server acknowledged the containing round.
    pub fn acknowledge(&self, watermark: u64) {
        self.state
            .lock()
            .entries
            .retain(|_, entry| entry.revision > watermark);
    }

    /// Returns true if no changes are pending.
    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns true if a delete is pending for this record (the
    /// reconciler treats such records as tombstones).
    pub fn is_pending_delete(&self, table: &str, record_id: &str) -> bool {
        self.state
            .lock()
            .entries
            .get(&(table.to_string(), record_id.to_string()))
            .is_some_and(|e| e.kind == ChangeKind::Deleted)
    }
}

impl CommitObserver for ChangeTracker {
    fn on_commit(&self, events: &[ChangeEvent]) {
        for event in events {
            if event.origin == WriteOrigin::Local {
                self.record(
                    &event.table,
                    &event.record_id,
                    event.kind,
                    event.snapshot.clone(),
                );
            }
        }
    }
}
