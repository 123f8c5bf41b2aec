//! Trigger layer: periodic and on-demand sync scheduling.
//!
//! External triggers (a periodic timer, connectivity regained, an
//! explicit user action) are producers that each attempt to start a
//! round. A trigger arriving while a round is in flight is dropped,
//! not deferred: the scheduler only reacts to triggers while it is
//! idle and waiting, and the orchestrator's own guard is the backstop
//! for any other overlap. Retry after a failed round happens here
//! implicitly: the next tick or trigger attempts a fresh round.

use crate::checkpoint::CheckpointStore;
use crate::orchestrator::{SyncOrchestrator, SyncOutcome};
use crate::transport::SyncTransport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Drives an orchestrator from a periodic timer and explicit triggers.
pub struct SyncScheduler {
    trigger: Arc<Notify>,
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl SyncScheduler {
    /// Spawns the scheduling task on the current tokio runtime.
    ///
    /// `interval` of None disables the periodic timer; the scheduler
    /// then only reacts to explicit triggers.
    pub fn start<T, C>(
        orchestrator: Arc<SyncOrchestrator<T, C>>,
        interval: Option<Duration>,
    ) -> Self
    where
        T: SyncTransport + 'static,
        C: CheckpointStore + 'static,
    {
        let trigger = Arc::new(Notify::new());
        let shutdown = Arc::new(Notify::new());

        let task = {
            let trigger = trigger.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                loop {
                    let fired = async {
                        match interval {
                            Some(period) => tokio::select! {
                                _ = tokio::time::sleep(period) => true,
                                _ = trigger.notified() => true,
                                _ = shutdown.notified() => false,
                            },
                            None => tokio::select! {
                                _ = trigger.notified() => true,
                                _ = shutdown.notified() => false,
                            },
                        }
                    }
                    .await;

                    if !fired {
                        break;
                    }
                    run_once(&orchestrator).await;
                }
            })
        };

        Self {
            trigger,
            shutdown,
            task,
        }
    }

    /// Requests a sync round (connectivity regained, user action).
    /// Non-blocking. Wakes the scheduler only if it is idle and
    /// waiting; a trigger arriving mid-round stores no permit, so it
    /// is dropped rather than deferred into a follow-up round.
    pub fn trigger(&self) {
        self.trigger.notify_waiters();
    }

    /// Stops the scheduler. An in-flight round runs to completion.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        let _ = self.task.await;
    }
}

async fn run_once<T, C>(orchestrator: &Arc<SyncOrchestrator<T, C>>)
where
    T: SyncTransport + 'static,
    C: CheckpointStore + 'static,
{
    let orchestrator = orchestrator.clone();
    // The engine blocks on network and store I/O; keep it off the
    // async worker threads.
    let result = tokio::task::spawn_blocking(move || orchestrator.try_sync()).await;

    match result {
        Ok(Ok(SyncOutcome::Completed(report))) => {
            tracing::debug!(pulled = report.counts.pulled, "scheduled sync completed");
        }
        Ok(Ok(SyncOutcome::AlreadySyncing)) => {
            tracing::debug!("scheduled sync coalesced");
        }
        Ok(Err(error)) => {
            tracing::warn!(%error, retryable = error.is_retryable(), "scheduled sync failed");
        }
        Err(join_error) => {
            tracing::error!(%join_error, "sync task panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::MemoryCheckpointStore;
    use crate::config::SyncConfig;
    use crate::migration::MigrationManager;
    use crate::transport::{MockTransport, PullResponse};
    use tidedb_core::{ColumnSchema, ScalarType, Schema, Store, TableSchema};
    use tidedb_sync_protocol::RemoteDelta;

    fn orchestrator() -> Arc<SyncOrchestrator<MockTransport, MemoryCheckpointStore>> {
        let store = Arc::new(Store::new(Schema::new(
            1,
            vec![TableSchema::new(
                "products",
                vec![ColumnSchema::new("name", ScalarType::Text)],
            )],
        )));
        Arc::new(SyncOrchestrator::new(
            store,
            MockTransport::new(),
            MemoryCheckpointStore::new(1),
            MigrationManager::new(),
            SyncConfig::new("https://sync.example.com/api/sync").with_turbo(false),
        ))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn explicit_trigger_runs_a_round() {
        let orch = orchestrator();
        orch.transport()
            .queue_pull(Ok(PullResponse::Incremental(RemoteDelta {
                changes: Default::default(),
                timestamp: 10,
            })));

        let scheduler = SyncScheduler::start(orch.clone(), None);

        // Re-trigger until the round lands: a trigger fired before the
        // scheduler task first parks wakes nothing by design.
        for _ in 0..100 {
            if !orch.diagnostics().is_empty() {
                break;
            }
            scheduler.trigger();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(orch.diagnostics().len(), 1);

        scheduler.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn mid_round_trigger_is_dropped_not_deferred() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::{Condvar, Mutex as StdMutex};
        use tidedb_sync_protocol::{PullQuery, PushBody};

        struct GatedTransport {
            pulls: AtomicUsize,
            started: (StdMutex<bool>, Condvar),
            release: (StdMutex<bool>, Condvar),
        }

        impl GatedTransport {
            fn new() -> Self {
                Self {
                    pulls: AtomicUsize::new(0),
                    started: (StdMutex::new(false), Condvar::new()),
                    release: (StdMutex::new(false), Condvar::new()),
                }
            }

            fn wait_until_pulling(&self) {
                let (lock, cvar) = &self.started;
                let mut started = lock.lock().unwrap();
                while !*started {
                    started = cvar.wait(started).unwrap();
                }
            }

            fn release_pull(&self) {
                let (lock, cvar) = &self.release;
                *lock.lock().unwrap() = true;
                cvar.notify_all();
            }
        }

        impl crate::transport::SyncTransport for GatedTransport {
            fn pull(&self, _query: &PullQuery) -> crate::error::SyncResult<PullResponse> {
                if self.pulls.fetch_add(1, Ordering::SeqCst) == 0 {
                    {
                        let (lock, cvar) = &self.started;
                        *lock.lock().unwrap() = true;
                        cvar.notify_all();
                    }
                    let (lock, cvar) = &self.release;
                    let mut released = lock.lock().unwrap();
                    while !*released {
                        released = cvar.wait(released).unwrap();
                    }
                }
                Ok(PullResponse::Incremental(RemoteDelta {
                    changes: Default::default(),
                    timestamp: 1,
                }))
            }

            fn push(
                &self,
                _body: &PushBody,
                _last_pulled_at: i64,
            ) -> crate::error::SyncResult<()> {
                Ok(())
            }
        }

        let store = Arc::new(Store::new(Schema::new(
            1,
            vec![TableSchema::new(
                "products",
                vec![ColumnSchema::new("name", ScalarType::Text)],
            )],
        )));
        let orch = Arc::new(SyncOrchestrator::new(
            store,
            GatedTransport::new(),
            MemoryCheckpointStore::new(1),
            MigrationManager::new(),
            SyncConfig::new("https://sync.example.com/api/sync").with_turbo(false),
        ));

        let scheduler = SyncScheduler::start(orch.clone(), None);

        // Start round 1 and block it inside pull.
        {
            let orch = orch.clone();
            let scheduler_started = tokio::task::spawn_blocking(move || {
                orch.transport().wait_until_pulling();
            });
            while !scheduler_started.is_finished() {
                scheduler.trigger();
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            scheduler_started.await.unwrap();
        }

        // This trigger arrives mid-round; it must not queue a
        // follow-up round.
        scheduler.trigger();
        orch.transport().release_pull();

        for _ in 0..100 {
            if !orch.diagnostics().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        // Settle time for any wrongly deferred round to surface.
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(orch.transport().pulls.load(Ordering::SeqCst), 1);
        assert_eq!(orch.diagnostics().len(), 1);

        scheduler.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn periodic_timer_fires() {
        let orch = orchestrator();
        orch.transport()
            .queue_pull(Ok(PullResponse::Incremental(RemoteDelta {
                changes: Default::default(),
                timestamp: 10,
            })));

        let scheduler = SyncScheduler::start(orch.clone(), Some(Duration::from_millis(20)));

        for _ in 0..100 {
            if !orch.diagnostics().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!orch.diagnostics().is_empty());

        scheduler.shutdown().await;
    }
}
