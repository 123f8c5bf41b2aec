//! Bulk ("turbo") snapshot loading.
//!
//! A one-time, whole-table snapshot transfer used only when the local
//! store has never synced. The payload arrives as an opaque blob; it
//! is decoded here (and nowhere else) and applied as a single bulk
//! insert transaction, bypassing the change tracker entirely: these
//! records did not originate on this client and must not be
//! re-reported as local changes on the next push.

use crate::error::{SyncError, SyncResult};
use crate::tracker::ChangeTracker;
use bytes::Bytes;
use std::sync::Arc;
use tidedb_core::{Store, WriteOrigin};
use tidedb_sync_protocol::RemoteDelta;

/// Result of a bulk load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkReport {
    /// Number of records applied.
    pub applied: usize,
    /// Server timestamp carried by the snapshot, which the checkpoint
    /// advances to.
    pub timestamp: i64,
}

/// Applies the one-time bulk snapshot to an empty client.
pub struct BulkLoader {
    store: Arc<Store>,
    tracker: Arc<ChangeTracker>,
}

impl BulkLoader {
    /// Creates a loader over the given store and tracker.
    pub fn new(store: Arc<Store>, tracker: Arc<ChangeTracker>) -> Self {
        Self { store, tracker }
    }

    /// Applies a full-database snapshot in one transaction.
    ///
    /// Refuses to run when local changes are pending: turbo mode
    /// contractually assumes an empty client. On any apply failure the
    /// tables named by the payload are dropped, so a retry starts from
    /// scratch rather than resuming incrementally.
    pub fn load_bulk_snapshot(&self, payload: &Bytes) -> SyncResult<BulkReport> {
        if !self.tracker.is_empty() {
            return Err(SyncError::PreconditionFailed {
                reason: format!(
                    "bulk load requires an empty client, {} changes pending",
                    self.tracker.len()
                ),
            });
        }

        let snapshot = RemoteDelta::from_json(payload)?;
        let tables: Vec<String> = snapshot.changes.keys().cloned().collect();

        let applied = self
            .store
            .transaction(WriteOrigin::Remote, |txn| {
                let mut applied = 0usize;
                for (table, delta) in &snapshot.changes {
                    // A snapshot is creates-only by construction, but a
                    // server may still classify rows as updated; both
                    // land as fresh rows on an empty client.
                    for record in delta.created.iter().chain(delta.updated.iter()) {
                        txn.insert(table, record.clone())?;
                        applied += 1;
                    }
                }
                Ok(applied)
            })
            .map_err(|err| {
                self.discard_partial(&tables);
                SyncError::from(err)
            })?;

        tracing::info!(applied, timestamp = snapshot.timestamp, "bulk snapshot applied");
        Ok(BulkReport {
            applied,
            timestamp: snapshot.timestamp,
        })
    }

    /// Drops any rows the aborted attempt may have written. The store
    /// transaction is atomic, so this is the retry-from-scratch
    /// contract made explicit rather than a recovery of real state.
    fn discard_partial(&self, tables: &[String]) {
        let result = self.store.transaction(WriteOrigin::Remote, |txn| {
            for table in tables {
                txn.drop_table(table)?;
            }
            Ok(())
        });
        if let Err(err) = result {
            tracing::warn!(%err, "failed to discard partial bulk load");
        }
    }
}
