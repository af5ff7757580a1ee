//! Walks one resource through create, list, update and delete.
//!
//! Uses the in-memory store unless `PARSE_SERVER_URL` is set.

use query_adapter::backend::{Backend, BackendError, RestBackend, StoreActor};
use query_adapter::lifecycle::{setup_tracing, Bootstrap, Connection, ConnectionConfig};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, Instrument};

const RESOURCE: &str = "posts";

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = ConnectionConfig::from_env();
    if config.server_url.is_empty() {
        info!("No server configured, using the in-memory store");
        let bootstrap = Bootstrap::new();
        let connection = bootstrap
            .initialize(config, |_| {
                let (store, client) = StoreActor::new(64);
                tokio::spawn(store.run());
                Ok(client)
            })
            .await
            .map_err(|e| e.to_string())?;
        walkthrough(connection).await
    } else {
        let bootstrap = Bootstrap::new();
        let connection = bootstrap
            .initialize(config, |config| {
                RestBackend::new(&config.server_url, &config.application_id, &config.client_key)
            })
            .await
            .map_err(|e: BackendError| e.to_string())?;
        walkthrough(connection).await
    }
}

async fn walkthrough<B: Backend>(connection: Arc<Connection<B>>) -> Result<(), String> {
    connection.watch(RESOURCE).await.map_err(|e| e.to_string())?;
    let adapter = connection.adapter();

    let mut ids = Vec::new();
    let span = tracing::info_span!("seeding");
    async {
        for title in ["Hello", "Second post", "hello again"] {
            let created = adapter
                .dispatch("CREATE", RESOURCE, json!({"data": {"title": title}}))
                .await
                .map_err(|e| e.to_string())?;
            if let Some(id) = created.record().and_then(|r| r["id"].as_str()) {
                ids.push(id.to_string());
            }
        }
        Ok::<_, String>(())
    }
    .instrument(span)
    .await?;
    info!(count = ids.len(), "Posts created");

    let listed = adapter
        .dispatch(
            "GET_LIST",
            RESOURCE,
            json!({
                "pagination": {"page": 1, "perPage": 10},
                "sort": {"field": "title", "order": "ASC"},
                "filter": {"title": "hello"},
            }),
        )
        .instrument(tracing::info_span!("listing"))
        .await
        .map_err(|e| e.to_string())?;
    info!(result = %listed.to_json(), "Matching posts");

    if let Some(first) = ids.first() {
        let updated = adapter
            .dispatch(
                "UPDATE",
                RESOURCE,
                json!({"id": first, "data": {"title": "Hello, edited"}}),
            )
            .await
            .map_err(|e| e.to_string())?;
        info!(result = %updated.to_json(), "Post updated");
    }

    let deleted = adapter
        .dispatch("DELETE_MANY", RESOURCE, json!({"ids": ids}))
        .instrument(tracing::info_span!("cleanup"))
        .await
        .map_err(|e| e.to_string())?;
    info!(result = %deleted.to_json(), "Posts deleted");

    connection.shutdown().await;
    Ok(())
}
