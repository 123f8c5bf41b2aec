//! Checkpoint persistence.
//!
//! The checkpoint marks the last successfully reconciled point between
//! local and remote state. It advances only after a round's apply and
//! push have both succeeded, so a crash between "apply succeeded" and
//! "checkpoint persisted" re-pulls the same window (idempotent) rather
//! than losing applied data.

use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// The sync checkpoint: last pull timestamp plus local schema version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Server timestamp of the last successful round. None means the
    /// store has never synced (the sole trigger for turbo mode).
    pub last_pulled_at: Option<i64>,
    /// Schema version the store was at when the checkpoint was
    /// written.
    pub schema_version: u32,
}

impl Checkpoint {
    /// The never-synced checkpoint at the given schema version.
    pub fn initial(schema_version: u32) -> Self {
        Self {
            last_pulled_at: None,
            schema_version,
        }
    }

    /// Returns true if the store has never completed a sync round.
    pub fn is_first_sync(&self) -> bool {
        self.last_pulled_at.unwrap_or(0) == 0
    }
}

/// Persistence contract for the checkpoint.
///
/// `read` must never return a checkpoint newer than what was durably
/// committed.
pub trait CheckpointStore: Send + Sync {
    /// Reads the current checkpoint.
    fn read(&self) -> SyncResult<Checkpoint>;

    /// Durably persists a checkpoint.
    fn write(&self, checkpoint: Checkpoint) -> SyncResult<()>;
}

/// File-backed checkpoint store.
///
/// Writes go to a sibling file which is fsynced and renamed over the
/// target, so a crash mid-write leaves the previous checkpoint intact.
pub struct FileCheckpointStore {
    path: PathBuf,
    initial: Checkpoint,
    // Serializes writers; reads go to the file so a fresh process
    // resumes from the last committed checkpoint.
    write_lock: Mutex<()>,
}

impl FileCheckpointStore {
    /// Opens (or initializes) a checkpoint file at `path`.
    pub fn open(path: impl AsRef<Path>, initial_schema_version: u32) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            initial: Checkpoint::initial(initial_schema_version),
            write_lock: Mutex::new(()),
        }
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn read(&self) -> SyncResult<Checkpoint> {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                SyncError::PreconditionFailed {
                    reason: format!("checkpoint file corrupt: {e}"),
                }
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(self.initial),
            Err(e) => Err(SyncError::PreconditionFailed {
                reason: format!("checkpoint file unreadable: {e}"),
            }),
        }
    }

    fn write(&self, checkpoint: Checkpoint) -> SyncResult<()> {
        let _guard = self.write_lock.lock();
        let bytes = serde_json::to_vec(&checkpoint).map_err(|e| {
            SyncError::PreconditionFailed {
                reason: format!("checkpoint encode failed: {e}"),
            }
        })?;

        let staging = self.path.with_extension("tmp");
        let io_err = |e: std::io::Error| SyncError::PreconditionFailed {
            reason: format!("checkpoint write failed: {e}"),
        };

        let mut file = fs::File::create(&staging).map_err(io_err)?;
        file.write_all(&bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);
        fs::rename(&staging, &self.path).map_err(io_err)?;
        Ok(())
    }
}

/// In-memory checkpoint store for tests.
#[derive(Debug)]
pub struct MemoryCheckpointStore {
    checkpoint: Mutex<Checkpoint>,
}

impl MemoryCheckpointStore {
    /// Creates a never-synced in-memory checkpoint.
    pub fn new(initial_schema_version: u32) -> Self {
        Self {
            checkpoint: Mutex::new(Checkpoint::initial(initial_schema_version)),
        }
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn read(&self) -> SyncResult<Checkpoint> {
        Ok(*self.checkpoint.lock())
    }

    fn write(&self, checkpoint: Checkpoint) -> SyncResult<()> {
        *self.checkpoint.lock() = checkpoint;
        Ok(())
    }
}
