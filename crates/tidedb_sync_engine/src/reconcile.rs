//! Incremental delta application.
//!
//! Applies the bounded created/updated/deleted sets the server reports
//! since a checkpoint. All tables of one delta commit as a single
//! local transaction: any single-table failure aborts the whole delta
//! so the store never observes a half-applied checkpoint window.

use crate::error::{SyncError, SyncResult};
use crate::tracker::ChangeTracker;
use std::sync::Arc;
use tidedb_core::{Store, WriteOrigin};
use tidedb_sync_protocol::RemoteDelta;

/// Applies incremental remote deltas to the local store.
pub struct Reconciler {
    store: Arc<Store>,
    tracker: Arc<ChangeTracker>,
}

impl Reconciler {
    /// Creates a reconciler over the given store and tracker.
    pub fn new(store: Arc<Store>, tracker: Arc<ChangeTracker>) -> Self {
        Self { store, tracker }
    }

    /// Applies one remote delta atomically. Returns the number of
    /// rows applied.
    ///
    /// Per-table rules:
    /// - `created`: insert by identifier; an identifier that already
    ///   exists locally fails with [`SyncError::DuplicateRecord`].
    /// - `updated`: field-level overwrite by identifier; a record
    ///   absent locally is treated as created, since the server's
    ///   change classification is advisory.
    /// - `deleted`: remove by identifier, tolerating absence.
    ///
    /// A record with a pending local delete is a tombstone: incoming
    /// creates and updates for it are skipped so the delete wins
    /// consistently (it is still pushed this round; the store never
    /// transiently resurrects a record the user deleted).
    pub fn apply_delta(&self, delta: &RemoteDelta) -> SyncResult<usize> {
        let tracker = &self.tracker;
        let applied = self.store.transaction(WriteOrigin::Remote, |txn| {
            let mut applied = 0usize;

            for (table, table_delta) in &delta.changes {
                for record in &table_delta.created {
                    if tracker.is_pending_delete(table, &record.id) {
                        continue;
                    }
                    txn.insert(table, record.clone())?;
                    applied += 1;
                }

                for record in &table_delta.updated {
                    if tracker.is_pending_delete(table, &record.id) {
                        continue;
                    }
                    txn.upsert(table, record.clone())?;
                    applied += 1;
                }

                for record_id in &table_delta.deleted {
                    txn.delete(table, record_id)?;
                    applied += 1;
                }
            }

            Ok(applied)
        });

        match applied {
            Ok(applied) => {
                tracing::debug!(applied, timestamp = delta.timestamp, "delta applied");
                Ok(applied)
            }
            Err(tidedb_core::CoreError::DuplicateId { table, record_id }) => {
                Err(SyncError::DuplicateRecord { table, record_id })
            }
            Err(tidedb_core::CoreError::UnknownColumn { table, column }) => {
                Err(SyncError::ApplyConflict {
                    table,
                    detail: format!("pulled record carries unknown column {column}"),
                })
            }
            Err(tidedb_core::CoreError::TypeMismatch { table, column }) => {
                Err(SyncError::ApplyConflict {
                    table,
                    detail: format!("pulled record has wrong type for column {column}"),
                })
            }
            Err(tidedb_core::CoreError::NullViolation { table, column }) => {
                Err(SyncError::ApplyConflict {
                    table,
                    detail: format!("pulled record nulls non-nullable column {column}"),
                })
            }
            Err(err) => Err(SyncError::from(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tidedb_core::{ChangeKind, ColumnSchema, Record, ScalarType, Schema, TableSchema};
    use tidedb_sync_protocol::TableDelta;

    fn store() -> Arc<Store> {
        Arc::new(Store::new(Schema::new(
            1,
            vec![
                TableSchema::new(
                    "products",
                    vec![
                        ColumnSchema::new("name", ScalarType::Text),
                        ColumnSchema::new("price", ScalarType::Number),
                    ],
                ),
                TableSchema::new(
                    "product_batches",
                    vec![ColumnSchema::new("batch_number", ScalarType::Text)],
                ),
            ],
        )))
    }

    fn record(id: &str, name: &str) -> Record {
        Record::new(id, BTreeMap::new())
            .with("name", name)
            .with("price", 1.0)
    }

    fn delta_with(table: &str, table_delta: TableDelta) -> RemoteDelta {
        let mut changes = BTreeMap::new();
        changes.insert(table.to_string(), table_delta);
        RemoteDelta {
            changes,
            timestamp: 100,
        }
    }

    fn reconciler(store: &Arc<Store>) -> (Reconciler, Arc<ChangeTracker>) {
        let tracker = Arc::new(ChangeTracker::new());
        (
            Reconciler::new(store.clone(), tracker.clone()),
            tracker,
        )
    }

    #[test]
    fn created_inserts() {
        let store = store();
        let (reconciler, tracker) = reconciler(&store);

        let applied = reconciler
            .apply_delta(&delta_with(
                "products",
                TableDelta {
                    created: vec![record("p1", "widget")],
                    ..Default::default()
                },
            ))
            .unwrap();

        assert_eq!(applied, 1);
        assert!(store.contains("products", "p1"));
        // Remote applies never become pending local changes.
        assert!(tracker.is_empty());
    }

    #[test]
    fn duplicate_create_is_policy_error() {
        let store = store();
        let (reconciler, _tracker) = reconciler(&store);
        store
            .transaction(WriteOrigin::Local, |txn| {
                txn.insert("products", record("p1", "mine"))
            })
            .unwrap();

        let err = reconciler
            .apply_delta(&delta_with(
                "products",
                TableDelta {
                    created: vec![record("p1", "theirs")],
                    ..Default::default()
                },
            ))
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::DuplicateRecord { ref table, .. } if table == "products"
        ));
        // Local row untouched.
        let local = store.get("products", "p1").unwrap();
        assert_eq!(local.get("name").unwrap().as_str(), Some("mine"));
    }

    #[test]
    fn pending_delete_wins_over_remote_create() {
        let store = store();
        let (reconciler, tracker) = reconciler(&store);
        store
            .transaction(WriteOrigin::Local, |txn| {
                txn.insert("products", record("p1", "mine"))?;
                txn.delete("products", "p1")
            })
            .unwrap();
        tracker.record("products", "p1", ChangeKind::Deleted, None);

        let applied = reconciler
            .apply_delta(&delta_with(
                "products",
                TableDelta {
                    created: vec![record("p1", "theirs")],
                    ..Default::default()
                },
            ))
            .unwrap();

        // The remote row never lands, even transiently; the local
        // delete stays pending for this round's push.
        assert_eq!(applied, 0);
        assert!(!store.contains("products", "p1"));
        assert!(tracker.is_pending_delete("products", "p1"));
    }

    #[test]
    fn pending_delete_wins_over_remote_update() {
        let store = store();
        let (reconciler, tracker) = reconciler(&store);
        tracker.record("products", "p1", ChangeKind::Deleted, None);

        let applied = reconciler
            .apply_delta(&delta_with(
                "products",
                TableDelta {
                    updated: vec![record("p1", "resurrected")],
                    ..Default::default()
                },
            ))
            .unwrap();

        assert_eq!(applied, 0);
        assert!(!store.contains("products", "p1"));
    }

    #[test]
    fn schema_shape_failure_is_apply_conflict() {
        let store = store();
        let (reconciler, _tracker) = reconciler(&store);

        // A pulled record whose "name" is numeric does not fit the
        // local schema.
        let bad = Record::new("p1", BTreeMap::new()).with("name", 4.0);
        let err = reconciler
            .apply_delta(&delta_with(
                "products",
                TableDelta {
                    created: vec![bad],
                    ..Default::default()
                },
            ))
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::ApplyConflict { ref table, .. } if table == "products"
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn updated_upserts_when_absent() {
        let store = store();
        let (reconciler, _tracker) = reconciler(&store);

        reconciler
            .apply_delta(&delta_with(
                "products",
                TableDelta {
                    updated: vec![record("p7", "late-arrival")],
                    ..Default::default()
                },
            ))
            .unwrap();

        assert!(store.contains("products", "p7"));
    }

    #[test]
    fn updated_overwrites_field_level() {
        let store = store();
        let (reconciler, _tracker) = reconciler(&store);
        store
            .transaction(WriteOrigin::Local, |txn| {
                txn.insert("products", record("p1", "widget"))
            })
            .unwrap();

        let incoming = Record::new("p1", BTreeMap::new()).with("price", 9.0);
        reconciler
            .apply_delta(&delta_with(
                "products",
                TableDelta {
                    updated: vec![incoming],
                    ..Default::default()
                },
            ))
            .unwrap();

        let row = store.get("products", "p1").unwrap();
        assert_eq!(row.get("price").unwrap().as_f64(), Some(9.0));
        assert_eq!(row.get("name").unwrap().as_str(), Some("widget"));
    }

    #[test]
    fn delete_is_idempotent() {
        let store = store();
        let (reconciler, _tracker) = reconciler(&store);

        let delta = delta_with(
            "products",
            TableDelta {
                deleted: vec!["nonexistent".into()],
                ..Default::default()
            },
        );
        // Applying twice changes nothing and fails nothing.
        assert_eq!(reconciler.apply_delta(&delta).unwrap(), 1);
        assert_eq!(reconciler.apply_delta(&delta).unwrap(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn single_table_failure_aborts_whole_delta() {
        let store = store();
        let (reconciler, _tracker) = reconciler(&store);
        store
            .transaction(WriteOrigin::Local, |txn| {
                txn.insert("products", record("dup", "mine"))
            })
            .unwrap();

        let mut changes = BTreeMap::new();
        changes.insert(
            "product_batches".to_string(),
            TableDelta {
                created: vec![Record::new("b1", BTreeMap::new()).with("batch_number", "B-1")],
                ..Default::default()
            },
        );
        changes.insert(
            "products".to_string(),
            TableDelta {
                created: vec![record("dup", "theirs")],
                ..Default::default()
            },
        );

        let err = reconciler
            .apply_delta(&RemoteDelta {
                changes,
                timestamp: 1,
            })
            .unwrap_err();
        assert!(matches!(err, SyncError::DuplicateRecord { .. }));

        // Neither table's changes landed.
        assert_eq!(store.len("product_batches"), 0);
        assert_eq!(store.len("products"), 1);
    }
}
