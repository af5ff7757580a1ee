//! # Mock Backend & Testing Guide
//!
//! Utilities for testing code that sits on top of a [`Backend`](super::Backend) without
//! running a store.
//!
//! ## When to use Mocks vs the Store
//!
//! | Feature | Mock | [`StoreActor`](super::StoreActor) |
//! |---------|------|------------|
//! | **Inspect requests** | Yes, every query and payload | No |
//! | **Error Injection** | Easy (`return_err`) | Only not-found cases |
//! | **State** | None | Real objects, ids, timestamps |
//! | **Use Case** | Asserting what the adapter sends | End-to-end behavior |
//!
//! ## Two styles
//!
//! - [`create_mock_backend`] hands you the receiving end of the channel. Pull requests off it
//!   with [`expect_find`], [`expect_save`], ... and answer them yourself. Use this when the test
//!   needs to look at the request (the query's `skip`, the fields of a save).
//! - [`MockBackend`] answers from a queue of canned responses set up front. Use this when only
//!   the responses matter.
//!
//! ```rust
//! use query_adapter::backend::mock::MockBackend;
//! use query_adapter::backend::{Backend, BackendError, ParseObject};
//! use serde_json::Map;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut mock = MockBackend::new();
//!     mock.expect_get("a").return_ok(ParseObject::new("a", Map::new()));
//!     mock.expect_get("b").return_err(BackendError::Rejected("offline".into()));
//!
//!     let backend = mock.client();
//!     assert!(backend.get("Post", "a").await.is_ok());
//!     assert!(backend.get("Post", "b").await.is_err());
//!     mock.verify();
//! }
//! ```

use super::{BackendClient, BackendError, BackendRequest, ParseObject, Query, Response};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

/// A canned response waiting for its request.
enum Expectation {
    Count(Result<u64, BackendError>),
    Find(Result<Vec<ParseObject>, BackendError>),
    Get {
        id: String,
        response: Result<ParseObject, BackendError>,
    },
    Save(Result<ParseObject, BackendError>),
    Destroy {
        id: String,
        response: Result<(), BackendError>,
    },
}

type Expectations = Arc<Mutex<VecDeque<Expectation>>>;

/// A mock backend answering requests, in order, from a queue of expectations.
///
/// Requests that do not match the next expectation panic the mock task, which the caller sees
/// as [`BackendError::BackendDropped`].
pub struct MockBackend {
    client: BackendClient,
    expectations: Expectations,
    _handle: tokio::task::JoinHandle<()>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Creates a new mock backend with no expectations.
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::channel::<BackendRequest>(100);
        let expectations: Expectations = Arc::new(Mutex::new(VecDeque::new()));
        let expectations_clone = expectations.clone();

        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                let expectation = expectations_clone.lock().unwrap().pop_front();

                match (request, expectation) {
                    (BackendRequest::Count { respond_to, .. }, Some(Expectation::Count(response))) => {
                        let _ = respond_to.send(response);
                    }
                    (BackendRequest::Find { respond_to, .. }, Some(Expectation::Find(response))) => {
                        let _ = respond_to.send(response);
                    }
                    (
                        BackendRequest::Get { id, respond_to, .. },
                        Some(Expectation::Get { id: expected, response }),
                    ) => {
                        assert_eq!(id, expected, "Unexpected get id");
                        let _ = respond_to.send(response);
                    }
                    (BackendRequest::Save { respond_to, .. }, Some(Expectation::Save(response))) => {
                        let _ = respond_to.send(response);
                    }
                    (
                        BackendRequest::Destroy { id, respond_to, .. },
                        Some(Expectation::Destroy { id: expected, response }),
                    ) => {
                        assert_eq!(id, expected, "Unexpected destroy id");
                        let _ = respond_to.send(response);
                    }
                    _ => {
                        panic!("Unexpected request or expectation mismatch");
                    }
                }
            }
        });

        Self {
            client: BackendClient::new(sender),
            expectations,
            _handle: handle,
        }
    }

    /// Returns the client for use in tests.
    pub fn client(&self) -> BackendClient {
        self.client.clone()
    }

    pub fn expect_count(&mut self) -> ExpectationBuilder<u64> {
        self.builder(Expectation::Count)
    }

    pub fn expect_find(&mut self) -> ExpectationBuilder<Vec<ParseObject>> {
        self.builder(Expectation::Find)
    }

    pub fn expect_get(&mut self, id: impl Into<String>) -> ExpectationBuilder<ParseObject> {
        let id = id.into();
        self.builder(move |response| Expectation::Get { id, response })
    }

    pub fn expect_save(&mut self) -> ExpectationBuilder<ParseObject> {
        self.builder(Expectation::Save)
    }

    pub fn expect_destroy(&mut self, id: impl Into<String>) -> ExpectationBuilder<()> {
        let id = id.into();
        self.builder(move |response| Expectation::Destroy { id, response })
    }

    fn builder<T>(
        &mut self,
        wrap: impl FnOnce(Result<T, BackendError>) -> Expectation + 'static,
    ) -> ExpectationBuilder<T> {
        ExpectationBuilder {
            expectations: self.expectations.clone(),
            wrap: Box::new(wrap),
        }
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            panic!("Not all expectations were met. {} remaining", exps.len());
        }
    }
}

/// Builder for one expectation; finish it with `return_ok` or `return_err`.
pub struct ExpectationBuilder<T> {
    expectations: Expectations,
    wrap: Box<dyn FnOnce(Result<T, BackendError>) -> Expectation>,
}

impl<T> ExpectationBuilder<T> {
    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, value: T) {
        self.push(Ok(value));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: BackendError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<T, BackendError>) {
        let expectation = (self.wrap)(response);
        self.expectations.lock().unwrap().push_back(expectation);
    }
}

// =============================================================================
// CHANNEL HELPERS
// =============================================================================

/// Creates a backend client and the receiver its requests arrive on.
///
/// The test plays the backend: it receives each request, asserts on it, and answers through
/// the request's responder. Nothing is answered unless the test does so.
pub fn create_mock_backend(buffer_size: usize) -> (BackendClient, mpsc::Receiver<BackendRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (BackendClient::new(sender), receiver)
}

/// Helper to verify that the next message is a Count request
pub async fn expect_count(
    receiver: &mut mpsc::Receiver<BackendRequest>,
) -> Option<(Query, Response<u64>)> {
    match receiver.recv().await {
        Some(BackendRequest::Count { query, respond_to }) => Some((query, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Find request
pub async fn expect_find(
    receiver: &mut mpsc::Receiver<BackendRequest>,
) -> Option<(Query, Response<Vec<ParseObject>>)> {
    match receiver.recv().await {
        Some(BackendRequest::Find { query, respond_to }) => Some((query, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Get request
pub async fn expect_get(
    receiver: &mut mpsc::Receiver<BackendRequest>,
) -> Option<(String, String, Response<ParseObject>)> {
    match receiver.recv().await {
        Some(BackendRequest::Get {
            class,
            id,
            respond_to,
        }) => Some((class, id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Save request
pub async fn expect_save(
    receiver: &mut mpsc::Receiver<BackendRequest>,
) -> Option<(Option<String>, Map<String, Value>, Response<ParseObject>)> {
    match receiver.recv().await {
        Some(BackendRequest::Save {
            id,
            data,
            respond_to,
            ..
        }) => Some((id, data, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Destroy request
pub async fn expect_destroy(
    receiver: &mut mpsc::Receiver<BackendRequest>,
) -> Option<(String, Response<()>)> {
    match receiver.recv().await {
        Some(BackendRequest::Destroy { id, respond_to, .. }) => Some((id, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;

    #[tokio::test]
    async fn test_mock_backend_channel() {
        let (client, mut receiver) = create_mock_backend(10);

        let count_task = tokio::spawn(async move {
            let mut query = Query::new("Post");
            query.limit(5);
            client.count(&query).await
        });

        let (query, responder) = expect_count(&mut receiver)
            .await
            .expect("Expected Count request");
        assert_eq!(query.class(), "Post");
        assert_eq!(query.max_results(), Some(5));
        responder.send(Ok(3)).unwrap();

        assert_eq!(count_task.await.unwrap().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_mock_backend_with_expectations() {
        let mut mock = MockBackend::new();
        mock.expect_save()
            .return_ok(ParseObject::new("p1", Map::new()));
        mock.expect_destroy("p1").return_ok(());

        let backend = mock.client();
        let saved = backend.save("Post", None, Map::new()).await.unwrap();
        assert_eq!(saved.id, "p1");
        backend.destroy("Post", "p1").await.unwrap();

        mock.verify();
    }
}
