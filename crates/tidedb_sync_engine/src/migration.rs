//! Schema migration bookkeeping for sync.
//!
//! The engine does not run migrations itself; it maps schema-version
//! transitions to the table/column changes the remote endpoint must be
//! told about, so the server can shape its delta for a client that
//! just moved versions.

use crate::error::{SyncError, SyncResult};
use std::collections::BTreeMap;
use tidedb_core::{ColumnSchema, TableSchema};
use tidedb_sync_protocol::MigrationSummary;

/// A single schema change carried by a migration step.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaChange {
    /// A table was created.
    CreatedTable {
        /// Descriptor of the new table.
        schema: TableSchema,
    },
    /// Columns were added to an existing table.
    AddedColumns {
        /// Table the columns were added to.
        table: String,
        /// The added columns.
        columns: Vec<ColumnSchema>,
    },
}

/// One schema-version transition and the changes it made.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationStep {
    /// Version the step upgrades from.
    pub from_version: u32,
    /// Version the step upgrades to.
    pub to_version: u32,
    /// The table/column changes the step made.
    pub changes: Vec<SchemaChange>,
}

/// Registry of known migration steps, ordered by version.
#[derive(Debug, Default)]
pub struct MigrationManager {
    steps: Vec<MigrationStep>,
}

impl MigrationManager {
    /// Creates an empty manager (schema has never migrated).
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a step. Steps must be registered in version order
    /// and chain contiguously.
    pub fn register(&mut self, step: MigrationStep) {
        debug_assert!(
            self.steps
                .last()
                .map_or(true, |last| last.to_version == step.from_version),
            "migration steps must chain contiguously"
        );
        self.steps.push(step);
    }

    /// Highest schema version the registry knows about.
    pub fn highest_known(&self) -> u32 {
        self.steps.last().map_or(0, |s| s.to_version)
    }

    /// Ordered steps covering the transition `from` → `to`.
    ///
    /// Fails with [`SyncError::SchemaMismatch`] if `from` exceeds the
    /// highest known version: the client binary is newer than its own
    /// migration table, a packaging defect.
    pub fn migrations_for(&self, from: u32, to: u32) -> SyncResult<Vec<&MigrationStep>> {
        let highest = self.highest_known();
        if from > highest {
            return Err(SyncError::SchemaMismatch {
                from_version: from,
                highest_known: highest,
            });
        }
        Ok(self
            .steps
            .iter()
            .filter(|s| s.from_version >= from && s.to_version <= to)
            .collect())
    }

    /// Folds the steps for `from` → `to` into the wire summary the
    /// pull request carries.
    pub fn summary_for(&self, from: u32, to: u32) -> SyncResult<MigrationSummary> {
        let steps = self.migrations_for(from, to)?;
        let mut tables = Vec::new();
        let mut columns: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for step in steps {
            for change in &step.changes {
                match change {
                    SchemaChange::CreatedTable { schema } => {
                        tables.push(schema.name.clone());
                    }
                    SchemaChange::AddedColumns {
                        table,
                        columns: added,
                    } => {
                        columns
                            .entry(table.clone())
                            .or_default()
                            .extend(added.iter().map(|c| c.name.clone()));
                    }
                }
            }
        }

        Ok(MigrationSummary {
            from_version: from,
            to_version: to,
            tables,
            columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidedb_core::ScalarType;

    fn manager() -> MigrationManager {
        let mut manager = MigrationManager::new();
        manager.register(MigrationStep {
            from_version: 1,
            to_version: 2,
            changes: vec![SchemaChange::AddedColumns {
                table: "products".into(),
                columns: vec![ColumnSchema::new("sku", ScalarType::Text)],
            }],
        });
        manager.register(MigrationStep {
            from_version: 2,
            to_version: 3,
            changes: vec![SchemaChange::CreatedTable {
                schema: TableSchema::new(
                    "product_batches",
                    vec![ColumnSchema::new("batch_number", ScalarType::Text)],
                ),
            }],
        });
        manager
    }

    #[test]
    fn steps_are_ordered_and_bounded() {
        let manager = manager();
        let steps = manager.migrations_for(1, 3).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].to_version, 2);
        assert_eq!(steps[1].to_version, 3);

        let steps = manager.migrations_for(2, 3).unwrap();
        assert_eq!(steps.len(), 1);

        let steps = manager.migrations_for(3, 3).unwrap();
        assert!(steps.is_empty());
    }

    #[test]
    fn client_newer_than_registry_is_a_mismatch() {
        let manager = manager();
        let err = manager.migrations_for(5, 5).unwrap_err();
        assert!(matches!(err, SyncError::SchemaMismatch { from_version: 5, .. }));
    }

    #[test]
    fn summary_folds_steps() {
        let manager = manager();
        let summary = manager.summary_for(1, 3).unwrap();
        assert_eq!(summary.from_version, 1);
        assert_eq!(summary.to_version, 3);
        assert_eq!(summary.tables, vec!["product_batches".to_string()]);
        assert_eq!(summary.columns["products"], vec!["sku".to_string()]);
    }

    #[test]
    fn empty_registry_knows_nothing() {
        let manager = MigrationManager::new();
        assert_eq!(manager.highest_known(), 0);
        // from == to at an unknown version is still a defect.
        assert!(manager.migrations_for(2, 2).is_err());
        assert!(manager.migrations_for(0, 0).is_ok());
    }
}
