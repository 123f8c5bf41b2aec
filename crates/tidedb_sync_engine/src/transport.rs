//! Transport layer abstraction for sync operations.

use crate::error::{SyncError, SyncResult};
use bytes::Bytes;
use parking_lot::Mutex;
use tidedb_sync_protocol::{PullQuery, PushBody, RemoteDelta};

/// What a pull returned.
#[derive(Debug, Clone)]
pub enum PullResponse {
    /// Parsed incremental delta.
    Incremental(RemoteDelta),
    /// Opaque bulk export body for the turbo path. The transport must
    /// not attempt field-level parsing of this body.
    Turbo(Bytes),
}

/// A sync transport handles network communication with the remote
/// endpoint.
///
/// This trait abstracts the network layer, allowing different
/// implementations (HTTP, loopback to an in-process server, mock for
/// testing). Pull and push are the engine's only suspension points;
/// implementations must enforce a timeout and surface it as a
/// transport error like any other network failure.
pub trait SyncTransport: Send + Sync {
    /// Pulls changes since the checkpoint carried by `query`.
    fn pull(&self, query: &PullQuery) -> SyncResult<PullResponse>;

    /// Pushes pending local changes, one request per round.
    fn push(&self, body: &PushBody, last_pulled_at: i64) -> SyncResult<()>;
}

/// A mock transport for testing.
///
/// Responses are queued; each call consumes one. An empty queue
/// yields a transport error.
#[derive(Default)]
pub struct MockTransport {
    pull_responses: Mutex<Vec<SyncResult<PullResponse>>>,
    push_responses: Mutex<Vec<SyncResult<()>>>,
    pull_queries: Mutex<Vec<PullQuery>>,
    push_bodies: Mutex<Vec<(PushBody, i64)>>,
}

impl MockTransport {
    /// Creates an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a pull response.
    pub fn queue_pull(&self, response: SyncResult<PullResponse>) {
        self.pull_responses.lock().push(response);
    }

    /// Queues a push response.
    pub fn queue_push(&self, response: SyncResult<()>) {
        self.push_responses.lock().push(response);
    }

    /// Pull queries the engine sent, in order.
    pub fn pull_queries(&self) -> Vec<PullQuery> {
        self.pull_queries.lock().clone()
    }

    /// Push bodies the engine sent, in order, with the attached
    /// checkpoint timestamp.
    pub fn push_bodies(&self) -> Vec<(PushBody, i64)> {
        self.push_bodies.lock().clone()
    }
}

impl SyncTransport for MockTransport {
    fn pull(&self, query: &PullQuery) -> SyncResult<PullResponse> {
        self.pull_queries.lock().push(query.clone());
        let mut responses = self.pull_responses.lock();
        if responses.is_empty() {
            return Err(SyncError::transport_retryable("no mock pull response"));
        }
        responses.remove(0)
    }

    fn push(&self, body: &PushBody, last_pulled_at: i64) -> SyncResult<()> {
        self.push_bodies.lock().push((body.clone(), last_pulled_at));
        let mut responses = self.push_responses.lock();
        if responses.is_empty() {
            return Err(SyncError::transport_retryable("no mock push response"));
        }
        responses.remove(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_replays_queued_responses() {
        let mock = MockTransport::new();
        mock.queue_pull(Ok(PullResponse::Incremental(RemoteDelta {
            changes: Default::default(),
            timestamp: 9,
        })));

        let query = PullQuery::new(0, 1, false);
        match mock.pull(&query).unwrap() {
            PullResponse::Incremental(delta) => assert_eq!(delta.timestamp, 9),
            PullResponse::Turbo(_) => panic!("expected incremental"),
        }

        // Queue exhausted.
        assert!(mock.pull(&query).is_err());
        assert_eq!(mock.pull_queries().len(), 2);
    }

    #[test]
    fn mock_records_push_bodies() {
        let mock = MockTransport::new();
        mock.queue_push(Ok(()));
        mock.push(&PushBody::default(), 42).unwrap();

        let bodies = mock.push_bodies();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0].1, 42);
    }
}
