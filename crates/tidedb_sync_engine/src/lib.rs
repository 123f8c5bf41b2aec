//! # TideDB Sync Engine
//!
//! Checkpoint-based pull/push synchronization for TideDB.
//!
//! This crate provides:
//! - Checkpoint persistence (last successful pull timestamp + schema
//!   version)
//! - Change tracking of local mutations, collapsed to net effect
//! - A one-time bulk ("turbo") load for empty databases
//! - Incremental reconciliation of server-reported deltas
//! - A push engine with at-least-once delivery of pending changes
//! - The sync orchestrator state machine gating rounds
//! - A diagnostics ring log of recent attempts
//! - HTTP transport binding and a tokio-based trigger layer
//!
//! ## Architecture
//!
//! One sync **round** is: read checkpoint → pull → apply → push →
//! advance checkpoint. The server is authoritative for ordering: pull
//! always happens before push, and the checkpoint only advances after
//! both apply and push succeed.
//!
//! ## Key invariants
//!
//! - At most one round runs at a time; overlapping triggers coalesce
//! - The checkpoint is monotonically non-decreasing
//! - The bulk path runs at most once per install lifetime
//! - Remote applies are atomic per round and never re-reported as
//!   local changes
//! - Any failure leaves the local store fully usable offline

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bulk;
mod checkpoint;
mod config;
mod credential;
mod diag;
mod error;
mod http;
mod migration;
mod orchestrator;
mod push;
mod reconcile;
mod scheduler;
mod tracker;
mod transport;

pub use bulk::{BulkLoader, BulkReport};
pub use checkpoint::{Checkpoint, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use config::SyncConfig;
pub use credential::{BearerToken, CredentialCell};
pub use diag::{DiagnosticsLog, RoundOutcome, SyncCounts, SyncLogEntry, SyncMode, SyncStep};
pub use error::{SyncError, SyncResult};
pub use http::{HttpClient, HttpResponse, HttpTransport};
pub use migration::{MigrationManager, MigrationStep, SchemaChange};
pub use orchestrator::{RoundReport, SyncOrchestrator, SyncOutcome, SyncState};
pub use push::PushEngine;
pub use reconcile::Reconciler;
pub use scheduler::SyncScheduler;
pub use tracker::{ChangeEntry, ChangeTracker, PendingBatch};
pub use transport::{MockTransport, PullResponse, SyncTransport};
