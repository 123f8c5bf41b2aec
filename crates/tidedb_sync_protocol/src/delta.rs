//! Delta and push-body wire types.

use crate::error::ProtocolResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tidedb_core::Record;

/// The per-table change sets the server reports since a checkpoint,
/// and the shape the client pushes its own pending changes in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableDelta {
    /// Records the server classifies as created since the checkpoint.
    #[serde(default)]
    pub created: Vec<Record>,
    /// Records the server classifies as updated since the checkpoint.
    #[serde(default)]
    pub updated: Vec<Record>,
    /// Identifiers of records deleted since the checkpoint.
    #[serde(default)]
    pub deleted: Vec<String>,
}

impl TableDelta {
    /// Total number of changed rows in this delta.
    pub fn len(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len()
    }

    /// Returns true if no rows changed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The incremental pull response: per-table deltas plus the server
/// timestamp the checkpoint advances to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteDelta {
    /// Changed rows, keyed by table name.
    #[serde(default)]
    pub changes: BTreeMap<String, TableDelta>,
    /// Server-reported timestamp for this pull window.
    pub timestamp: i64,
}

impl RemoteDelta {
    /// Decodes an incremental pull response body.
    pub fn from_json(body: &[u8]) -> ProtocolResult<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Total number of changed rows across all tables.
    pub fn len(&self) -> usize {
        self.changes.values().map(TableDelta::len).sum()
    }

    /// Returns true if no table has changes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The push request body: the client's pending changes, shaped like a
/// delta.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushBody {
    /// Pending local changes, keyed by table name.
    pub changes: BTreeMap<String, TableDelta>,
}

impl PushBody {
    /// Encodes the push body as JSON.
    pub fn to_json(&self) -> ProtocolResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Total number of changed rows being pushed.
    pub fn len(&self) -> usize {
        self.changes.values().map(TableDelta::len).sum()
    }

    /// Returns true if nothing is being pushed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
