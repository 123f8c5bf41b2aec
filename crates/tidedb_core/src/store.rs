//! The in-memory table store and its transaction API.

use crate::change_feed::{ChangeEvent, ChangeFeed, ChangeKind};
use crate::error::{CoreError, CoreResult};
use crate::schema::Schema;
use crate::value::Record;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::sync::mpsc::Receiver;

type Table = BTreeMap<String, Record>;
type Tables = BTreeMap<String, Table>;

/// Where a transaction's writes originate.
///
/// Remote-origin writes are those applied by the sync layer on behalf
/// of the server; they must not be re-reported as local changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOrigin {
    /// A write made by the embedding application.
    Local,
    /// A write applied from remote state by the sync layer.
    Remote,
}

/// An observer notified synchronously after every commit.
///
/// Unlike change-feed subscribers (which receive events over a
/// channel), observers run inline on the committing thread, before
/// the transaction call returns. The sync layer's change tracker is
/// an observer so that a committed local write is tracked by the time
/// the caller sees the commit succeed.
pub trait CommitObserver: Send + Sync {
    /// Called once per commit with the events it produced.
    fn on_commit(&self, events: &[ChangeEvent]);
}

/// The local store: schema-validated tables with atomic batch writes.
///
/// The store is an explicit handle; pass `Arc<Store>` to every
/// component that needs it.
pub struct Store {
    schema: RwLock<Schema>,
    tables: Mutex<Tables>,
    feed: ChangeFeed,
    observers: RwLock<Vec<Arc<dyn CommitObserver>>>,
    sequence: AtomicU64,
}

impl Store {
    /// Creates a store with the given schema. Declared tables start
    /// empty.
    pub fn new(schema: Schema) -> Self {
        let mut tables = Tables::new();
        for table in &schema.tables {
            tables.insert(table.name.clone(), Table::new());
        }
        Self {
            schema: RwLock::new(schema),
            tables: Mutex::new(tables),
            feed: ChangeFeed::new(),
            observers: RwLock::new(Vec::new()),
            sequence: AtomicU64::new(0),
        }
    }

    /// Returns a clone of the current schema.
    pub fn schema(&self) -> Schema {
        self.schema.read().clone()
    }

    /// Replaces the schema (after a migration has been applied).
    /// Newly declared tables are created empty; existing data is kept.
    pub fn set_schema(&self, schema: Schema) {
        let mut tables = self.tables.lock();
        for table in &schema.tables {
            tables.entry(table.name.clone()).or_default();
        }
        *self.schema.write() = schema;
    }

    /// Subscribes to committed change events.
    pub fn subscribe(&self) -> Receiver<ChangeEvent> {
        self.feed.subscribe()
    }

    /// Registers a synchronous commit observer.
    pub fn add_observer(&self, observer: Arc<dyn CommitObserver>) {
        self.observers.write().push(observer);
    }

    /// Runs a transaction. The closure stages writes against a working
    /// copy; on `Ok` the copy replaces the live tables and the staged
    /// events are emitted, on `Err` nothing is visible.
    pub fn transaction<F, T>(&self, origin: WriteOrigin, f: F) -> CoreResult<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> CoreResult<T>,
    {
        let schema = self.schema.read().clone();
        let mut tables = self.tables.lock();
        let mut working = tables.clone();

        let sequence = self.sequence.load(Ordering::SeqCst) + 1;
        let mut txn = Transaction {
            schema: &schema,
            tables: &mut working,
            events: Vec::new(),
            origin,
            sequence,
        };

        let value = f(&mut txn)?;
        let events = txn.events;

        *tables = working;
        self.sequence.store(sequence, Ordering::SeqCst);
        drop(tables);

        if !events.is_empty() {
            for observer in self.observers.read().iter() {
                observer.on_commit(&events);
            }
            self.feed.emit(&events);
        }

        Ok(value)
    }

    /// Reads a record by table and identifier.
    pub fn get(&self, table: &str, record_id: &str) -> Option<Record> {
        self.tables.lock().get(table)?.get(record_id).cloned()
    }

    /// Returns true if the record exists.
    pub fn contains(&self, table: &str, record_id: &str) -> bool {
        self.tables
            .lock()
            .get(table)
            .is_some_and(|t| t.contains_key(record_id))
    }

    /// Number of records in a table (0 for undeclared tables).
    pub fn len(&self, table: &str) -> usize {
        self.tables.lock().get(table).map_or(0, |t| t.len())
    }

    /// Returns true if every table is empty.
    pub fn is_empty(&self) -> bool {
        self.tables.lock().values().all(|t| t.is_empty())
    }
}

/// A staged batch of writes, committed atomically by
/// [`Store::transaction`].
pub struct Transaction<'a> {
    schema: &'a Schema,
    tables: &'a mut Tables,
    events: Vec<ChangeEvent>,
    origin: WriteOrigin,
    sequence: u64,
}

impl Transaction<'_> {
    fn validate(&self, table: &str, record: &Record) -> CoreResult<()> {
        let table_schema =
            self.schema
                .table(table)
                .ok_or_else(|| CoreError::TableNotFound {
                    name: table.to_string(),
                })?;

        for (column, value) in &record.fields {
            let column_schema =
                table_schema
                    .column(column)
                    .ok_or_else(|| CoreError::UnknownColumn {
                        table: table.to_string(),
                        column: column.clone(),
                    })?;
            if value.is_null() {
                if !column_schema.nullable {
                    return Err(CoreError::NullViolation {
                        table: table.to_string(),
                        column: column.clone(),
                    });
                }
            } else if !column_schema.column_type.admits(value) {
                return Err(CoreError::TypeMismatch {
                    table: table.to_string(),
                    column: column.clone(),
                });
            }
        }
        Ok(())
    }

    fn table_mut(&mut self, table: &str) -> CoreResult<&mut Table> {
        if self.schema.table(table).is_none() {
            return Err(CoreError::TableNotFound {
                name: table.to_string(),
            });
        }
        Ok(self.tables.entry(table.to_string()).or_default())
    }

    fn push_event(&mut self, table: &str, record_id: &str, kind: ChangeKind, snapshot: Option<Record>) {
        self.events.push(ChangeEvent {
            sequence: self.sequence,
            table: table.to_string(),
            record_id: record_id.to_string(),
            kind,
            origin: self.origin,
            snapshot,
        });
    }

    /// Reads a record as staged so far in this transaction.
    pub fn get(&self, table: &str, record_id: &str) -> Option<&Record> {
        self.tables.get(table)?.get(record_id)
    }

    /// Inserts a new record. Fails if the identifier already exists.
    pub fn insert(&mut self, table: &str, record: Record) -> CoreResult<()> {
        self.validate(table, &record)?;
        let rows = self.table_mut(table)?;
        if rows.contains_key(&record.id) {
            return Err(CoreError::DuplicateId {
                table: table.to_string(),
                record_id: record.id,
            });
        }
        let id = record.id.clone();
        rows.insert(id.clone(), record.clone());
        self.push_event(table, &id, ChangeKind::Created, Some(record));
        Ok(())
    }

    /// Updates an existing record with a field-level overwrite.
    /// Fails if the identifier does not exist.
    pub fn update(&mut self, table: &str, record: Record) -> CoreResult<()> {
        self.validate(table, &record)?;
        let rows = self.table_mut(table)?;
        let existing = rows
            .get_mut(&record.id)
            .ok_or_else(|| CoreError::RecordNotFound {
                table: table.to_string(),
                record_id: record.id.clone(),
            })?;
        existing.merge_fields(&record);
        let snapshot = existing.clone();
        let id = record.id;
        self.push_event(table, &id, ChangeKind::Updated, Some(snapshot));
        Ok(())
    }

    /// Inserts or field-level-overwrites a record.
    pub fn upsert(&mut self, table: &str, record: Record) -> CoreResult<()> {
        if self
            .tables
            .get(table)
            .is_some_and(|t| t.contains_key(&record.id))
        {
            self.update(table, record)
        } else {
            self.insert(table, record)
        }
    }

    /// Deletes a record, returning whether it existed (deleting an
    /// absent identifier is a no-op).
    pub fn delete(&mut self, table: &str, record_id: &str) -> CoreResult<bool> {
        let rows = self.table_mut(table)?;
        let existed = rows.remove(record_id).is_some();
        if existed {
            self.push_event(table, record_id, ChangeKind::Deleted, None);
        }
        Ok(existed)
    }

    /// Drops every record in a table. Emits no per-record events; used
    /// by the sync layer to discard a partially written bulk load.
    pub fn drop_table(&mut self, table: &str) -> CoreResult<usize> {
        let rows = self.table_mut(table)?;
        let dropped = rows.len();
        rows.clear();
        Ok(dropped)
    }
}
