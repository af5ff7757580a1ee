//! # Object-Query Backends
//!
//! The adapter never talks to a concrete database. It talks to the [`Backend`] trait, which
//! captures the handful of primitives every object-collection store offers: count and find
//! over a [`Query`], fetch one object by id, save, destroy, and (optionally) a live event feed.
//!
//! # Main Components
//!
//! - [`Backend`] - The seam between the adapter and a store
//! - [`Query`] - Backend-neutral query builder
//! - [`StoreActor`] / [`BackendClient`] - In-memory store running as an actor task
//! - [`RestBackend`] - Remote Parse Server over HTTP
//! - [`BackendError`] - Errors raised at the boundary
//!
//! # Testing
//!
//! See [`mock`] for a channel-backed client whose requests can be inspected and answered by
//! the test itself.

pub mod client;
pub mod error;
pub mod message;
pub mod mock;
pub mod query;
pub mod rest;
pub mod store;

pub use client::BackendClient;
pub use error::BackendError;
pub use message::{BackendRequest, Response};
pub use query::{Constraint, Direction, Query, SortKey};
pub use rest::RestBackend;
pub use store::StoreActor;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

/// Attribute names the backend manages itself.
pub const OBJECT_ID: &str = "objectId";
pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

/// One stored object: its backend-assigned identifier plus every attribute, timestamps included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseObject {
    pub id: String,
    pub attributes: Map<String, Value>,
}

impl ParseObject {
    pub fn new(id: impl Into<String>, attributes: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            attributes,
        }
    }
}

/// Change notification published on a live subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectEvent {
    Create(ParseObject),
    Update(ParseObject),
    Delete(ParseObject),
}

/// The primitives the adapter needs from an object-query store.
///
/// Implementations must be cheap to share: the adapter holds one behind an `Arc` and issues
/// calls from many tasks at once.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Number of objects matching the query's constraints, ignoring `limit` and `skip`.
    async fn count(&self, query: &Query) -> Result<u64, BackendError>;

    /// Objects matching the query, ordered and paged as the query says.
    async fn find(&self, query: &Query) -> Result<Vec<ParseObject>, BackendError>;

    /// Fetch one object. A missing object is [`BackendError::ObjectNotFound`].
    async fn get(&self, class: &str, id: &str) -> Result<ParseObject, BackendError>;

    /// Save `data` on the object `id`, or create a new object when `id` is `None`.
    /// Returns the object as stored after the save.
    async fn save(
        &self,
        class: &str,
        id: Option<&str>,
        data: Map<String, Value>,
    ) -> Result<ParseObject, BackendError>;

    async fn destroy(&self, class: &str, id: &str) -> Result<(), BackendError>;

    /// Open a live feed of changes on `class`. Dropping the receiver releases it.
    async fn subscribe(&self, _class: &str) -> Result<broadcast::Receiver<ObjectEvent>, BackendError> {
        Err(BackendError::Unsupported("live subscriptions"))
    }
}
