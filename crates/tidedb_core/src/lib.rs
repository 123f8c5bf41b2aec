//! # TideDB Core
//!
//! Embedded local store for TideDB.
//!
//! This crate provides:
//! - Typed scalar values and records
//! - Schema descriptors (tables, columns, nullability, indexing)
//! - An atomic batch-transaction API over in-memory tables
//! - A post-commit change feed for reactive observation
//!
//! ## Architecture
//!
//! The store is an explicit handle passed to every consumer. There is
//! no process-wide singleton: tests and embedders may hold any number
//! of independent stores.
//!
//! All writes go through [`Store::transaction`], which commits either
//! every buffered operation or none of them. Committed operations are
//! broadcast through the [`ChangeFeed`] and to registered
//! [`CommitObserver`]s, tagged with the [`WriteOrigin`] of the
//! transaction so that sync-applied writes can be told apart from
//! local user writes.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change_feed;
mod error;
mod schema;
mod store;
mod value;

pub use change_feed::{ChangeEvent, ChangeFeed, ChangeKind};
pub use error::{CoreError, CoreResult};
pub use schema::{ColumnSchema, ScalarType, Schema, TableSchema};
pub use store::{CommitObserver, Store, Transaction, WriteOrigin};
pub use value::{Record, Value};
