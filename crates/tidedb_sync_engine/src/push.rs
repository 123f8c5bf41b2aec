//! Push engine.
//!
//! Serializes pending local changes and transmits them in one request
//! per round, with the checkpoint timestamp attached so the server can
//! detect staleness. Pending entries are cleared only on a success
//! response: any failure or ambiguous outcome leaves the whole round's
//! changes pending for the next round (at-least-once delivery).

use crate::error::SyncResult;
use crate::tracker::{ChangeTracker, PendingBatch};
use crate::transport::SyncTransport;
use std::sync::Arc;
use tidedb_core::ChangeKind;
use tidedb_sync_protocol::{PushBody, TableDelta};

/// Pushes pending local changes to the remote endpoint.
pub struct PushEngine {
    tracker: Arc<ChangeTracker>,
    /// Report freshly created records as "updated" instead. Used when
    /// the server may already know identifiers the client created
    /// before its first sync (turbo-path identifier collisions).
    report_created_as_updated: bool,
}

impl PushEngine {
    /// Creates a push engine over the given tracker.
    pub fn new(tracker: Arc<ChangeTracker>, report_created_as_updated: bool) -> Self {
        Self {
            tracker,
            report_created_as_updated,
        }
    }

    /// Builds the wire body for a pending batch.
    pub fn build_body(&self, batch: &PendingBatch) -> PushBody {
        let mut body = PushBody::default();
        for (table, entries) in &batch.by_table {
            let delta = body.changes.entry(table.clone()).or_insert_with(TableDelta::default);
            for entry in entries {
                match entry.kind {
                    ChangeKind::Created => {
                        if let Some(snapshot) = &entry.snapshot {
                            if self.report_created_as_updated {
                                delta.updated.push(snapshot.clone());
                            } else {
                                delta.created.push(snapshot.clone());
                            }
                        }
                    }
                    ChangeKind::Updated => {
                        if let Some(snapshot) = &entry.snapshot {
                            delta.updated.push(snapshot.clone());
                        }
                    }
                    ChangeKind::Deleted => {
                        delta.deleted.push(entry.record_id.clone());
                    }
                }
            }
        }
        body
    }

    /// Pushes one batch. On success the tracker entries covered by the
    /// batch watermark are cleared; on failure everything stays
    /// pending.
    pub fn push<T: SyncTransport>(
        &self,
        transport: &T,
        batch: &PendingBatch,
        last_pulled_at: i64,
    ) -> SyncResult<usize> {
        if batch.is_empty() {
            return Ok(0);
        }

        let body = self.build_body(batch);
        let pushed = batch.len();
        transport.push(&body, last_pulled_at)?;

        // Only entries snapshotted into this batch are cleared; writes
        // that landed mid-push keep their (higher) revisions.
        self.tracker.acknowledge(batch.watermark);
        tracing::info!(pushed, "push acknowledged");
        Ok(pushed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::transport::MockTransport;
    use std::collections::BTreeMap;
    use tidedb_core::Record;

    fn snapshot(id: &str) -> Option<Record> {
        Some(Record::new(id, BTreeMap::new()).with("name", "x"))
    }

    fn tracker_with_changes() -> Arc<ChangeTracker> {
        let tracker = Arc::new(ChangeTracker::new());
        tracker.record("products", "p1", ChangeKind::Created, snapshot("p1"));
        tracker.record("products", "p2", ChangeKind::Updated, snapshot("p2"));
        tracker.record("products", "p3", ChangeKind::Deleted, None);
        tracker
    }

    #[test]
    fn body_groups_by_table_and_kind() {
        let tracker = tracker_with_changes();
        let engine = PushEngine::new(tracker.clone(), false);
        let body = engine.build_body(&tracker.snapshot());

        let delta = &body.changes["products"];
        assert_eq!(delta.created.len(), 1);
        assert_eq!(delta.created[0].id, "p1");
        assert_eq!(delta.updated.len(), 1);
        assert_eq!(delta.deleted, vec!["p3".to_string()]);
    }

    #[test]
    fn created_reported_as_updated_when_configured() {
        let tracker = tracker_with_changes();
        let engine = PushEngine::new(tracker.clone(), true);
        let body = engine.build_body(&tracker.snapshot());

        let delta = &body.changes["products"];
        assert!(delta.created.is_empty());
        assert_eq!(delta.updated.len(), 2);
    }

    #[test]
    fn success_clears_pending() {
        let tracker = tracker_with_changes();
        let engine = PushEngine::new(tracker.clone(), false);
        let transport = MockTransport::new();
        transport.queue_push(Ok(()));

        let pushed = engine
            .push(&transport, &tracker.snapshot(), 50)
            .unwrap();
        assert_eq!(pushed, 3);
        assert!(tracker.is_empty());

        let bodies = transport.push_bodies();
        assert_eq!(bodies[0].1, 50);
    }

    #[test]
    fn failure_keeps_everything_pending() {
        let tracker = tracker_with_changes();
        let engine = PushEngine::new(tracker.clone(), false);
        let transport = MockTransport::new();
        transport.queue_push(Err(SyncError::transport_retryable("timed out")));

        let err = engine
            .push(&transport, &tracker.snapshot(), 50)
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(tracker.len(), 3);
    }

    #[test]
    fn empty_batch_sends_nothing() {
        let tracker = Arc::new(ChangeTracker::new());
        let engine = PushEngine::new(tracker.clone(), false);
        let transport = MockTransport::new();

        let pushed = engine.push(&transport, &tracker.snapshot(), 1).unwrap();
        assert_eq!(pushed, 0);
        assert!(transport.push_bodies().is_empty());
    }
}
