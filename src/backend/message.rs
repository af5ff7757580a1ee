//! # Backend Messages
//!
//! The requests a [`BackendClient`](super::BackendClient) sends over its channel. Whoever
//! holds the receiving end (the [`StoreActor`](super::StoreActor), or a test through
//! [`mock`](super::mock)) answers each one on its `respond_to` channel.

use super::{BackendError, ObjectEvent, ParseObject, Query};
use serde_json::{Map, Value};
use tokio::sync::{broadcast, oneshot};

/// Type alias for the one-shot response channel carried by every request.
pub type Response<T> = oneshot::Sender<Result<T, BackendError>>;

/// One backend primitive, with its reply channel.
///
/// The variants map 1:1 onto the [`Backend`](super::Backend) methods.
#[derive(Debug)]
pub enum BackendRequest {
    Count {
        query: Query,
        respond_to: Response<u64>,
    },
    Find {
        query: Query,
        respond_to: Response<Vec<ParseObject>>,
    },
    Get {
        class: String,
        id: String,
        respond_to: Response<ParseObject>,
    },
    Save {
        class: String,
        id: Option<String>,
        data: Map<String, Value>,
        respond_to: Response<ParseObject>,
    },
    Destroy {
        class: String,
        id: String,
        respond_to: Response<()>,
    },
    Subscribe {
        class: String,
        respond_to: Response<broadcast::Receiver<ObjectEvent>>,
    },
}
