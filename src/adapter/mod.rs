//! # Query Adapter
//!
//! Translates the nine generic data-access operations of an admin UI into backend queries and
//! normalizes the answers into an [`Envelope`].
//!
//! ## Entry Points
//!
//! - [`QueryAdapter::dispatch`] takes the operation name, the resource and the JSON parameter
//!   object exactly as the UI sends them.
//! - Typed methods ([`get_list`](QueryAdapter::get_list), [`create`](QueryAdapter::create), ...)
//!   take the parameter structs from [`params`] directly.
//!
//! ## Operations
//!
//! | Kind | Handler | Result |
//! |------|---------|--------|
//! | `GET_LIST` | count, then page + sort + find | `{data: [..], total}` |
//! | `GET_ONE` | get by id | `{data: {..}}` |
//! | `GET_MANY` | parallel gets | `{data: [..], total}` |
//! | `GET_MANY_REFERENCE` | equality on `target`, count, page + sort + find | `{data: [..], total}` |
//! | `CREATE` | save new object | `{data: {..}}` |
//! | `UPDATE` | get, strip read-only fields, save | `{data: {..}}` |
//! | `UPDATE_MANY` | parallel gets, parallel saves | `{data: [ids]}` |
//! | `DELETE` | get, destroy, return the pre-deletion record | `{data: {..}}` |
//! | `DELETE_MANY` | parallel gets, parallel destroys | `{data: [ids]}` |
//!
//! Every batch operation waits for all of its requests and fails as a whole if any one fails.
//!
//! ```rust
//! use query_adapter::adapter::QueryAdapter;
//! use query_adapter::backend::StoreActor;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (store, client) = StoreActor::new(32);
//!     tokio::spawn(store.run());
//!     let adapter = QueryAdapter::new(Arc::new(client));
//!
//!     let created = adapter
//!         .dispatch("CREATE", "users", json!({"data": {"username": "bob"}}))
//!         .await
//!         .unwrap();
//!     assert_eq!(created.record().unwrap()["username"], json!("bob"));
//! }
//! ```

pub mod envelope;
pub mod error;
pub mod params;
mod read;
mod write;

pub use envelope::{to_record, Envelope, EnvelopeData, Record};
pub use error::AdapterError;
pub use params::*;
pub use write::writable_fields;

use crate::backend::Backend;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// The nine operations the UI can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    GetList,
    GetOne,
    GetMany,
    GetManyReference,
    Create,
    Update,
    UpdateMany,
    Delete,
    DeleteMany,
}

impl OperationKind {
    pub const ALL: [OperationKind; 9] = [
        OperationKind::GetList,
        OperationKind::GetOne,
        OperationKind::GetMany,
        OperationKind::GetManyReference,
        OperationKind::Create,
        OperationKind::Update,
        OperationKind::UpdateMany,
        OperationKind::Delete,
        OperationKind::DeleteMany,
    ];

    /// The wire name of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::GetList => "GET_LIST",
            OperationKind::GetOne => "GET_ONE",
            OperationKind::GetMany => "GET_MANY",
            OperationKind::GetManyReference => "GET_MANY_REFERENCE",
            OperationKind::Create => "CREATE",
            OperationKind::Update => "UPDATE",
            OperationKind::UpdateMany => "UPDATE_MANY",
            OperationKind::Delete => "DELETE",
            OperationKind::DeleteMany => "DELETE_MANY",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = AdapterError;

    /// Exact, case-sensitive match on the wire name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| AdapterError::UnsupportedOperation(s.to_string()))
    }
}

/// Stateless translator from UI operations to backend calls.
///
/// Holds nothing but a shared handle on the backend, so it is cheap to clone and every call
/// builds its own query.
pub struct QueryAdapter<B: Backend> {
    backend: Arc<B>,
}

impl<B: Backend> Clone for QueryAdapter<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
        }
    }
}

impl<B: Backend> QueryAdapter<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Routes one UI call to its handler.
    ///
    /// Unknown operation names are [`AdapterError::UnsupportedOperation`]; parameter objects
    /// that do not fit the operation are [`AdapterError::InvalidParams`].
    pub async fn dispatch(
        &self,
        kind: &str,
        resource: &str,
        params: Value,
    ) -> Result<Envelope, AdapterError> {
        let operation = match kind.parse::<OperationKind>() {
            Ok(operation) => operation,
            Err(e) => {
                warn!(kind, resource, "Unsupported operation");
                return Err(e);
            }
        };
        debug!(%operation, resource, "Dispatch");

        match operation {
            OperationKind::GetList => self.get_list(resource, decode(operation, params)?).await,
            OperationKind::GetOne => self.get_one(resource, decode(operation, params)?).await,
            OperationKind::GetMany => self.get_many(resource, decode(operation, params)?).await,
            OperationKind::GetManyReference => {
                self.get_many_reference(resource, decode(operation, params)?)
                    .await
            }
            OperationKind::Create => self.create(resource, decode(operation, params)?).await,
            OperationKind::Update => self.update(resource, decode(operation, params)?).await,
            OperationKind::UpdateMany => self.update_many(resource, decode(operation, params)?).await,
            OperationKind::Delete => self.delete(resource, decode(operation, params)?).await,
            OperationKind::DeleteMany => self.delete_many(resource, decode(operation, params)?).await,
        }
    }
}

fn decode<T: DeserializeOwned>(operation: OperationKind, params: Value) -> Result<T, AdapterError> {
    serde_json::from_value(params).map_err(|e| AdapterError::InvalidParams {
        operation,
        reason: e.to_string(),
    })
}
