//! Change feed for observing committed operations.
//!
//! The change feed emits events for all committed store operations,
//! enabling:
//! - Sync layer integration (the change tracker is an observer)
//! - Reactive UI updates (re-render a query when its table changes)
//!
//! Events are emitted only after a transaction commits, in commit
//! order, tagged with the origin of the transaction.

use crate::store::WriteOrigin;
use crate::value::Record;
use parking_lot::RwLock;
use std::sync::mpsc::{self, Receiver, Sender};

/// The kind of change a committed operation made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Record was inserted (no previous version existed).
    Created,
    /// Record was updated (previous version existed).
    Updated,
    /// Record was deleted.
    Deleted,
}

/// A single change event from the change feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// Sequence number of the commit this event belongs to.
    pub sequence: u64,
    /// Table the change applies to.
    pub table: String,
    /// Identifier of the changed record.
    pub record_id: String,
    /// Kind of change.
    pub kind: ChangeKind,
    /// Origin of the committing transaction.
    pub origin: WriteOrigin,
    /// Post-change snapshot of the record. None for deletes.
    pub snapshot: Option<Record>,
}

/// A change feed that distributes committed operations to subscribers.
///
/// Subscribers receive events over an mpsc channel; a subscriber whose
/// receiver has been dropped is pruned on the next emit.
pub struct ChangeFeed {
    subscribers: RwLock<Vec<Sender<ChangeEvent>>>,
}

impl ChangeFeed {
    /// Creates a new change feed.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Subscribes to the change feed, returning the receiving end.
    pub fn subscribe(&self) -> Receiver<ChangeEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Emits a batch of committed events to all live subscribers.
    pub fn emit(&self, events: &[ChangeEvent]) {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| {
            for event in events {
                if tx.send(event.clone()).is_err() {
                    return false;
                }
            }
            true
        });
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}
