//! The sync orchestrator state machine.
//!
//! Gates when a round may run (at most one concurrently; overlapping
//! triggers coalesce into the in-flight round) and wires
//! pull → apply → push → advance-checkpoint as one unit of work. Any
//! step's failure aborts the remaining steps, leaves the checkpoint
//! untouched, logs the outcome, and returns to idle without retry
//! scheduling — retry is the trigger layer's responsibility.

use crate::bulk::BulkLoader;
use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::config::SyncConfig;
use crate::diag::{
    DiagnosticsLog, RoundOutcome, SyncCounts, SyncLogEntry, SyncMode, SyncStep,
};
use crate::error::{SyncError, SyncResult};
use crate::migration::MigrationManager;
use crate::push::PushEngine;
use crate::reconcile::Reconciler;
use crate::tracker::ChangeTracker;
use crate::transport::{PullResponse, SyncTransport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tidedb_core::Store;
use tidedb_sync_protocol::PullQuery;

/// The orchestrator's externally visible state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No round in flight.
    Idle,
    /// A round is in flight; new triggers coalesce into it.
    Syncing,
}

/// Result of one completed round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundReport {
    /// Pull path the round took.
    pub mode: SyncMode,
    /// Row counts for the round.
    pub counts: SyncCounts,
    /// Server timestamp the checkpoint advanced to.
    pub timestamp: i64,
}

/// What a trigger produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A round ran to completion.
    Completed(RoundReport),
    /// A round was already in flight; this trigger was dropped, not
    /// queued.
    AlreadySyncing,
}

struct RoundFailure {
    step: SyncStep,
    error: SyncError,
    counts: SyncCounts,
    mode: Option<SyncMode>,
}

impl RoundFailure {
    fn at(step: SyncStep) -> impl FnOnce(SyncError) -> RoundFailure {
        move |error| RoundFailure {
            step,
            error,
            counts: SyncCounts::default(),
            mode: None,
        }
    }
}

/// The sync orchestrator: one instance per store.
pub struct SyncOrchestrator<T: SyncTransport, C: CheckpointStore> {
    store: Arc<Store>,
    tracker: Arc<ChangeTracker>,
    checkpoints: C,
    migrations: MigrationManager,
    transport: T,
    bulk: BulkLoader,
    reconciler: Reconciler,
    push: PushEngine,
    diagnostics: DiagnosticsLog,
    config: SyncConfig,
    syncing: AtomicBool,
}

impl<T: SyncTransport, C: CheckpointStore> SyncOrchestrator<T, C> {
    /// Creates an orchestrator over the given store. Registers its
    /// change tracker as a commit observer so local writes are
    /// pending from the moment they commit.
    pub fn new(
        store: Arc<Store>,
        transport: T,
        checkpoints: C,
        migrations: MigrationManager,
        config: SyncConfig,
    ) -> Self {
        let tracker = Arc::new(ChangeTracker::new());
        store.add_observer(tracker.clone());

        Self {
            bulk: BulkLoader::new(store.clone(), tracker.clone()),
            reconciler: Reconciler::new(store.clone(), tracker.clone()),
            push: PushEngine::new(tracker.clone(), config.report_created_as_updated),
            diagnostics: DiagnosticsLog::new(config.log_capacity),
            store,
            tracker,
            checkpoints,
            migrations,
            transport,
            config,
            syncing: AtomicBool::new(false),
        }
    }

    /// Current state.
    pub fn state(&self) -> SyncState {
        if self.syncing.load(Ordering::SeqCst) {
            SyncState::Syncing
        } else {
            SyncState::Idle
        }
    }

    /// The change tracker recording this store's pending mutations.
    pub fn tracker(&self) -> &Arc<ChangeTracker> {
        &self.tracker
    }

    /// The diagnostics ring log.
    pub fn diagnostics(&self) -> &DiagnosticsLog {
        &self.diagnostics
    }

    /// The transport this orchestrator pulls and pushes through.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Reads the current durable checkpoint.
    pub fn checkpoint(&self) -> SyncResult<Checkpoint> {
        self.checkpoints.read()
    }

    /// Attempts to run one sync round.
    ///
    /// If a round is already in flight this is a no-op returning
    /// [`SyncOutcome::AlreadySyncing`] — the primary concurrency
    /// guard. Otherwise the round runs to completion (success or
    /// failure) before idle is re-entered; there is no cancellation.
    pub fn try_sync(&self) -> SyncResult<SyncOutcome> {
        if self
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("sync trigger coalesced into in-flight round");
            return Ok(SyncOutcome::AlreadySyncing);
        }

        let started_at = SystemTime::now();
        let result = self.run_round();
        let finished_at = SystemTime::now();

        let entry = match &result {
            Ok(report) => SyncLogEntry {
                started_at,
                finished_at,
                outcome: RoundOutcome::Success,
                counts: report.counts,
                mode: Some(report.mode),
            },
            Err(failure) => SyncLogEntry {
                started_at,
                finished_at,
                outcome: RoundOutcome::Failed {
                    step: failure.step,
                    error: failure.error.to_string(),
                },
                counts: failure.counts,
                mode: failure.mode,
            },
        };
        self.diagnostics.record(entry);
        self.syncing.store(false, Ordering::SeqCst);

        match result {
            Ok(report) => {
                tracing::info!(
                    mode = ?report.mode,
                    pulled = report.counts.pulled,
                    pushed = report.counts.pushed,
                    "sync round completed"
                );
                Ok(SyncOutcome::Completed(report))
            }
            Err(failure) => {
                tracing::warn!(step = ?failure.step, error = %failure.error, "sync round failed");
                Err(failure.error)
            }
        }
    }

    fn run_round(&self) -> Result<RoundReport, RoundFailure> {
        let checkpoint = self
            .checkpoints
            .read()
            .map_err(RoundFailure::at(SyncStep::ReadCheckpoint))?;

        let schema_version = self.store.schema().version;
        let turbo = self.config.turbo_enabled && checkpoint.is_first_sync();

        let mut query = PullQuery::new(
            checkpoint.last_pulled_at.unwrap_or(0),
            schema_version,
            turbo,
        );
        if checkpoint.schema_version != schema_version {
            let summary = self
                .migrations
                .summary_for(checkpoint.schema_version, schema_version)
                .map_err(RoundFailure::at(SyncStep::Pull))?;
            query = query.with_migration(summary);
        }

        let response = self
            .transport
            .pull(&query)
            .map_err(RoundFailure::at(SyncStep::Pull))?;

        let (mode, pulled, applied, timestamp) = match response {
            PullResponse::Turbo(payload) => {
                if !turbo {
                    return Err(RoundFailure {
                        step: SyncStep::Apply,
                        error: SyncError::PreconditionFailed {
                            reason: "server sent a bulk payload for a non-turbo pull".into(),
                        },
                        counts: SyncCounts::default(),
                        mode: Some(SyncMode::Turbo),
                    });
                }
                let report = self
                    .bulk
                    .load_bulk_snapshot(&payload)
                    .map_err(|error| RoundFailure {
                        step: SyncStep::Apply,
                        error,
                        counts: SyncCounts::default(),
                        mode: Some(SyncMode::Turbo),
                    })?;
                (SyncMode::Turbo, report.applied, report.applied, report.timestamp)
            }
            PullResponse::Incremental(delta) => {
                let pulled = delta.len();
                let applied =
                    self.reconciler
                        .apply_delta(&delta)
                        .map_err(|error| RoundFailure {
                            step: SyncStep::Apply,
                            error,
                            counts: SyncCounts {
                                pulled,
                                ..Default::default()
                            },
                            mode: Some(SyncMode::Incremental),
                        })?;
                (SyncMode::Incremental, pulled, applied, delta.timestamp)
            }
        };

        let batch = self.tracker.pending_since(&checkpoint);
        let pushed = self
            .push
            .push(&self.transport, &batch, timestamp)
            .map_err(|error| RoundFailure {
                step: SyncStep::Push,
                error,
                counts: SyncCounts {
                    pulled,
                    applied,
                    pushed: 0,
                },
                mode: Some(mode),
            })?;

        // Monotonic advance: a stale server timestamp never moves the
        // checkpoint backward.
        let advanced = Checkpoint {
            last_pulled_at: Some(timestamp.max(checkpoint.last_pulled_at.unwrap_or(0))),
            schema_version,
        };
        self.checkpoints
            .write(advanced)
            .map_err(|error| RoundFailure {
                step: SyncStep::AdvanceCheckpoint,
                error,
                counts: SyncCounts {
                    pulled,
                    applied,
                    pushed,
                },
                mode: Some(mode),
            })?;

        Ok(RoundReport {
            mode,
            counts: SyncCounts {
                pulled,
                applied,
                pushed,
            },
            timestamp,
        })
    }
}
