//! Pull query construction.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary of a schema transition the client has applied locally,
/// attached to a pull so the server can shape its delta accordingly
/// (e.g. omit columns the client did not know about at the old
/// version, include rows for newly created tables).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationSummary {
    /// Schema version the client migrated from.
    pub from_version: u32,
    /// Schema version the client is now at.
    pub to_version: u32,
    /// Tables created by the transition.
    pub tables: Vec<String>,
    /// Columns added by the transition, keyed by table name.
    pub columns: BTreeMap<String, Vec<String>>,
}

impl MigrationSummary {
    /// Returns true if the transition created or widened nothing.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.columns.is_empty()
    }
}

/// The parameters of a pull request.
///
/// Serialized as a query string:
/// `last_pulled_at=<int|0>&schema_version=<int>&turbo=<bool>` plus an
/// optional URL-encoded `migration=<json>` when a schema transition
/// happened since the last sync.
#[derive(Debug, Clone, PartialEq)]
pub struct PullQuery {
    /// Checkpoint timestamp, 0 when the client has never synced.
    pub last_pulled_at: i64,
    /// Client's current schema version.
    pub schema_version: u32,
    /// Whether the client requests the bulk ("turbo") payload.
    pub turbo: bool,
    /// Schema transition applied since the last sync, if any.
    pub migration: Option<MigrationSummary>,
}

impl PullQuery {
    /// Creates a pull query with no migration info.
    pub fn new(last_pulled_at: i64, schema_version: u32, turbo: bool) -> Self {
        Self {
            last_pulled_at,
            schema_version,
            turbo,
            migration: None,
        }
    }

    /// Attaches a migration summary.
    pub fn with_migration(mut self, migration: MigrationSummary) -> Self {
        self.migration = Some(migration);
        self
    }

    /// Renders the query string (no leading `?`).
    pub fn to_query_string(&self) -> String {
        let mut query = format!(
            "last_pulled_at={}&schema_version={}&turbo={}",
            self.last_pulled_at, self.schema_version, self.turbo
        );
        if let Some(migration) = &self.migration {
            if let Ok(json) = serde_json::to_string(migration) {
                query.push_str("&migration=");
                query.push_str(&percent_encode(&json));
            }
        }
        query
    }
}

/// Minimal percent-encoding for a query-string value.
fn percent_encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
