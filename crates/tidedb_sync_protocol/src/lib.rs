//! # TideDB Sync Protocol
//!
//! Wire types and JSON codecs for the TideDB sync protocol.
//!
//! This crate provides:
//! - [`TableDelta`] / [`RemoteDelta`] for the incremental pull response
//! - [`PushBody`] for the push request
//! - [`PullQuery`] for building the pull query string
//! - [`MigrationSummary`] describing a schema transition to the server
//!
//! This is a pure protocol crate with no I/O operations. The wire
//! encoding is JSON throughout:
//!
//! ```text
//! GET  <endpoint>/pull?last_pulled_at=<int|0>&schema_version=<int>&turbo=<bool>
//! POST <endpoint>/push?last_pulled_at=<int>
//! ```
//!
//! In turbo mode the pull response body is opaque to this crate: it is
//! handed to the bulk loader without field-level parsing here.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod delta;
mod error;
mod pull;

pub use delta::{PushBody, RemoteDelta, TableDelta};
pub use error::{ProtocolError, ProtocolResult};
pub use pull::{MigrationSummary, PullQuery};
