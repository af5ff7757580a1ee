//! # Channel Client
//!
//! [`BackendClient`] implements [`Backend`] by forwarding every call as a
//! [`BackendRequest`] over a Tokio mpsc channel and awaiting the reply on a oneshot.

use super::{Backend, BackendError, BackendRequest, ObjectEvent, ParseObject, Query, Response};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{broadcast, mpsc, oneshot};

/// A cloneable handle on a channel-served backend.
///
/// * **Cloneable** – holds only a sender, so cloning is inexpensive.
/// * **Server-agnostic** – the receiving end can be a [`StoreActor`](super::StoreActor) or a test.
#[derive(Clone)]
pub struct BackendClient {
    sender: mpsc::Sender<BackendRequest>,
}

impl BackendClient {
    pub fn new(sender: mpsc::Sender<BackendRequest>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Response<T>) -> BackendRequest,
    ) -> Result<T, BackendError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| BackendError::BackendClosed)?;
        response.await.map_err(|_| BackendError::BackendDropped)?
    }
}

#[async_trait]
impl Backend for BackendClient {
    async fn count(&self, query: &Query) -> Result<u64, BackendError> {
        let query = query.clone();
        self.request(|respond_to| BackendRequest::Count { query, respond_to })
            .await
    }

    async fn find(&self, query: &Query) -> Result<Vec<ParseObject>, BackendError> {
        let query = query.clone();
        self.request(|respond_to| BackendRequest::Find { query, respond_to })
            .await
    }

    async fn get(&self, class: &str, id: &str) -> Result<ParseObject, BackendError> {
        self.request(|respond_to| BackendRequest::Get {
            class: class.to_string(),
            id: id.to_string(),
            respond_to,
        })
        .await
    }

    async fn save(
        &self,
        class: &str,
        id: Option<&str>,
        data: Map<String, Value>,
    ) -> Result<ParseObject, BackendError> {
        self.request(|respond_to| BackendRequest::Save {
            class: class.to_string(),
            id: id.map(str::to_string),
            data,
            respond_to,
        })
        .await
    }

    async fn destroy(&self, class: &str, id: &str) -> Result<(), BackendError> {
        self.request(|respond_to| BackendRequest::Destroy {
            class: class.to_string(),
            id: id.to_string(),
            respond_to,
        })
        .await
    }

    async fn subscribe(&self, class: &str) -> Result<broadcast::Receiver<ObjectEvent>, BackendError> {
        self.request(|respond_to| BackendRequest::Subscribe {
            class: class.to_string(),
            respond_to,
        })
        .await
    }
}
