//! # Backend Connection
//!
//! A [`Connection`] is the explicit context every adapter call runs against: the configuration
//! it was built from, the shared backend handle, and the live watches opened on it.
//!
//! [`Bootstrap`] makes establishing it idempotent. The first `initialize` wins; later calls
//! log and return the existing connection without touching the backend again.
//!
//! ```rust
//! use query_adapter::backend::StoreActor;
//! use query_adapter::lifecycle::{Bootstrap, ConnectionConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let bootstrap = Bootstrap::new();
//!     let connection = bootstrap
//!         .initialize(ConnectionConfig::default(), |_| {
//!             let (store, client) = StoreActor::new(32);
//!             tokio::spawn(store.run());
//!             Ok(client)
//!         })
//!         .await
//!         .unwrap();
//!
//!     let adapter = connection.adapter();
//!     connection.shutdown().await;
//! #   drop(adapter);
//! }
//! ```

use crate::adapter::QueryAdapter;
use crate::backend::{Backend, BackendError, ObjectEvent};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, OnceCell};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub const SERVER_URL_VAR: &str = "PARSE_SERVER_URL";
pub const APPLICATION_ID_VAR: &str = "PARSE_APP_ID";
pub const CLIENT_KEY_VAR: &str = "PARSE_CLIENT_KEY";

/// Where the backend lives and how to identify to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    pub server_url: String,
    pub application_id: String,
    pub client_key: String,
}

impl ConnectionConfig {
    pub fn new(
        server_url: impl Into<String>,
        application_id: impl Into<String>,
        client_key: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            application_id: application_id.into(),
            client_key: client_key.into(),
        }
    }

    /// Reads `PARSE_SERVER_URL`, `PARSE_APP_ID` and `PARSE_CLIENT_KEY`. Unset variables are empty.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).unwrap_or_default();
        Self::new(var(SERVER_URL_VAR), var(APPLICATION_ID_VAR), var(CLIENT_KEY_VAR))
    }

    /// Names of the fields left empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("serverUrl", &self.server_url),
            ("applicationId", &self.application_id),
            ("clientKey", &self.client_key),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// A running watch on one resource.
struct Watch {
    handle: JoinHandle<()>,
    created: Arc<AtomicU64>,
}

/// The shared context adapter calls run against.
pub struct Connection<B: Backend> {
    config: ConnectionConfig,
    backend: Arc<B>,
    watches: Mutex<HashMap<String, Watch>>,
}

impl<B: Backend> Connection<B> {
    /// Wraps an already-built backend. Empty credentials are logged, not rejected.
    pub fn establish(config: ConnectionConfig, backend: B) -> Self {
        for field in config.missing_fields() {
            warn!(field, "Connection configured with an empty value");
        }
        info!(server_url = %config.server_url, "Connection established");
        Self {
            config,
            backend: Arc::new(backend),
            watches: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// A fresh adapter over this connection's backend.
    pub fn adapter(&self) -> QueryAdapter<B> {
        QueryAdapter::new(self.backend.clone())
    }

    /// Opens a live watch on `resource` that logs every object created in it.
    ///
    /// At most one watch exists per resource; repeated calls are no-ops. A backend without a
    /// live feed is logged and tolerated.
    pub async fn watch(&self, resource: &str) -> Result<(), BackendError> {
        let mut watches = self.watches.lock().await;
        if watches.contains_key(resource) {
            debug!(resource, "Already watching");
            return Ok(());
        }

        let mut events = match self.backend.subscribe(resource).await {
            Ok(events) => events,
            Err(BackendError::Unsupported(what)) => {
                warn!(resource, what, "Live updates unavailable");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let name = resource.to_string();
        let created = Arc::new(AtomicU64::new(0));
        let seen = created.clone();
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(ObjectEvent::Create(object)) => {
                        seen.fetch_add(1, Ordering::Relaxed);
                        info!(resource = %name, id = %object.id, "Object created");
                    }
                    Ok(event) => debug!(resource = %name, ?event, "Object changed"),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(resource = %name, skipped, "Watch fell behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!(resource = %name, "Watch ended");
        });

        info!(resource, "Watching");
        watches.insert(resource.to_string(), Watch { handle, created });
        Ok(())
    }

    /// Number of creations the watch on `resource` has logged, if one is open.
    pub async fn created_count(&self, resource: &str) -> Option<u64> {
        self.watches
            .lock()
            .await
            .get(resource)
            .map(|watch| watch.created.load(Ordering::Relaxed))
    }

    /// Resources with an open watch.
    pub async fn watched(&self) -> Vec<String> {
        let mut resources: Vec<_> = self.watches.lock().await.keys().cloned().collect();
        resources.sort();
        resources
    }

    /// Releases every watch.
    pub async fn shutdown(&self) {
        info!("Shutting down connection...");
        let watches: Vec<_> = self.watches.lock().await.drain().collect();
        for (resource, Watch { handle, .. }) in watches {
            handle.abort();
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    error!(%resource, "Watch task failed: {:?}", e);
                }
            }
        }
        info!("Connection closed.");
    }
}

/// One-time, race-free initialization of a [`Connection`].
pub struct Bootstrap<B: Backend> {
    cell: OnceCell<Arc<Connection<B>>>,
}

impl<B: Backend> Default for Bootstrap<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> Bootstrap<B> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Establishes the connection unless one already exists.
    ///
    /// `connect` builds the backend and only runs for the winning call. If it fails, nothing is
    /// stored and a later call may try again.
    pub async fn initialize<F>(
        &self,
        config: ConnectionConfig,
        connect: F,
    ) -> Result<Arc<Connection<B>>, BackendError>
    where
        F: FnOnce(&ConnectionConfig) -> Result<B, BackendError>,
    {
        if let Some(existing) = self.cell.get() {
            info!("Connection already initialized, skipping");
            return Ok(existing.clone());
        }

        let connection = self
            .cell
            .get_or_try_init(|| async move {
                let backend = connect(&config)?;
                Ok::<_, BackendError>(Arc::new(Connection::establish(config, backend)))
            })
            .await?;
        Ok(connection.clone())
    }

    pub fn get(&self) -> Option<Arc<Connection<B>>> {
        self.cell.get().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendClient, RestBackend, StoreActor};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn store() -> BackendClient {
        let (store, client) = StoreActor::new(32);
        tokio::spawn(store.run());
        client
    }

    #[test]
    fn test_config_deserializes_camel_case() {
        let config: ConnectionConfig = serde_json::from_value(json!({
            "serverUrl": "http://localhost:1337/parse",
            "applicationId": "app",
            "clientKey": "",
        }))
        .unwrap();
        assert_eq!(config.server_url, "http://localhost:1337/parse");
        assert_eq!(config.missing_fields(), vec!["clientKey"]);
    }

    #[tokio::test]
    async fn test_second_initialize_is_skipped() {
        let bootstrap = Bootstrap::new();
        let calls = AtomicUsize::new(0);

        let first = bootstrap
            .initialize(ConnectionConfig::new("a", "app", "key"), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(store())
            })
            .await
            .unwrap();
        let second = bootstrap
            .initialize(ConnectionConfig::new("b", "other", "key"), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(store())
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.config().server_url, "a");
    }

    #[tokio::test]
    async fn test_failed_initialize_can_be_retried() {
        let bootstrap: Bootstrap<BackendClient> = Bootstrap::new();
        let failed = bootstrap
            .initialize(ConnectionConfig::default(), |_| {
                Err(BackendError::InvalidConfig("no server".into()))
            })
            .await;
        assert!(failed.is_err());
        assert!(bootstrap.get().is_none());

        bootstrap
            .initialize(ConnectionConfig::default(), |_| Ok(store()))
            .await
            .unwrap();
        assert!(bootstrap.get().is_some());
    }

    #[tokio::test]
    async fn test_watch_once_per_resource_and_release() {
        let connection = Connection::establish(ConnectionConfig::default(), store());
        connection.watch("posts").await.unwrap();
        connection.watch("posts").await.unwrap();
        connection.watch("users").await.unwrap();
        assert_eq!(connection.watched().await, vec!["posts", "users"]);

        connection.shutdown().await;
        assert!(connection.watched().await.is_empty());
    }

    #[tokio::test]
    async fn test_watch_sees_creations() {
        let connection = Connection::establish(ConnectionConfig::default(), store());
        connection.watch("posts").await.unwrap();
        assert_eq!(connection.created_count("posts").await, Some(0));
        assert_eq!(connection.created_count("users").await, None);

        let adapter = connection.adapter();
        for title in ["a", "b"] {
            adapter
                .dispatch("CREATE", "posts", json!({"data": {"title": title}}))
                .await
                .unwrap();
        }
        adapter
            .dispatch("CREATE", "users", json!({"data": {"name": "bob"}}))
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(1), async {
            while connection.created_count("posts").await != Some(2) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("Watch should log both creations");

        connection.shutdown().await;
        assert_eq!(connection.created_count("posts").await, None);
    }

    #[tokio::test]
    async fn test_watch_tolerates_backend_without_live_feed() {
        let backend = RestBackend::new("http://localhost:1337/parse", "app", "key").unwrap();
        let connection = Connection::establish(ConnectionConfig::default(), backend);
        connection.watch("posts").await.unwrap();
        assert!(connection.watched().await.is_empty());
    }
}
