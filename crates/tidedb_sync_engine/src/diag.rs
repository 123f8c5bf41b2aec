//! Diagnostics ring log.
//!
//! A bounded, process-wide (per engine instance) record of the last N
//! sync attempts, kept for postmortem inspection. Not persisted across
//! restarts.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::SystemTime;

/// Which step of a round an outcome refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    /// Reading the checkpoint.
    ReadCheckpoint,
    /// Pulling from the remote endpoint.
    Pull,
    /// Applying pulled state locally.
    Apply,
    /// Pushing pending local changes.
    Push,
    /// Advancing the checkpoint.
    AdvanceCheckpoint,
}

/// Which pull path a round took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// One-time bulk snapshot load.
    Turbo,
    /// Bounded delta application.
    Incremental,
}

/// Row counts for one round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncCounts {
    /// Rows received from the pull.
    pub pulled: usize,
    /// Rows applied to the local store.
    pub applied: usize,
    /// Pending entries pushed.
    pub pushed: usize,
}

/// Outcome of one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// The round completed and the checkpoint advanced.
    Success,
    /// The round aborted at `step`.
    Failed {
        /// Step the round aborted at.
        step: SyncStep,
        /// Error detail, including the table where applicable.
        error: String,
    },
}

/// One entry in the diagnostics log.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncLogEntry {
    /// When the round started.
    pub started_at: SystemTime,
    /// When the round finished (success or failure).
    pub finished_at: SystemTime,
    /// Outcome of the round.
    pub outcome: RoundOutcome,
    /// Row counts observed before the round ended.
    pub counts: SyncCounts,
    /// Pull path the round took, if it got that far.
    pub mode: Option<SyncMode>,
}

/// Fixed-capacity ring buffer of sync attempts, oldest evicted first.
pub struct DiagnosticsLog {
    entries: Mutex<VecDeque<SyncLogEntry>>,
    capacity: usize,
}

impl DiagnosticsLog {
    /// Default ring capacity.
    pub const DEFAULT_CAPACITY: usize = 10;

    /// Creates a log with the given capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Records an attempt, evicting the oldest entry when full.
    pub fn record(&self, entry: SyncLogEntry) {
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Returns the logged attempts, newest first.
    pub fn snapshot(&self) -> Vec<SyncLogEntry> {
        self.entries.lock().iter().rev().cloned().collect()
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing has been logged.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for DiagnosticsLog {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
