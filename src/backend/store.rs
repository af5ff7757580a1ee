//! # In-Memory Object Store
//!
//! [`StoreActor`] is an object-collection store that lives in its own Tokio task. It owns every
//! class and object, processes [`BackendRequest`]s one at a time, and answers over oneshot
//! channels. Pair it with the [`BackendClient`] returned by [`StoreActor::new`].
//!
//! It behaves like a small Parse Server: ids and timestamps are assigned by the store, queries
//! are evaluated with the same semantics the REST backend requests remotely, and every change is
//! published to live subscribers of the class.

use super::query::compare_values;
use super::{
    BackendClient, BackendError, BackendRequest, Direction, ObjectEvent, ParseObject, Query,
    CREATED_AT, OBJECT_ID, UPDATED_AT,
};
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

const EVENT_BUFFER: usize = 64;

/// The server half of the in-memory backend.
///
/// **Concurrency Model**:
/// Requests are processed sequentially inside one task, so the collections need no
/// `Mutex`. Many adapter calls can be in flight at once; they simply queue on the channel.
///
/// ```rust
/// use query_adapter::backend::{Backend, StoreActor};
/// use serde_json::{json, Map};
///
/// #[tokio::main]
/// async fn main() {
///     let (store, client) = StoreActor::new(16);
///     tokio::spawn(store.run());
///
///     let mut data = Map::new();
///     data.insert("title".into(), json!("Hello"));
///     let saved = client.save("Post", None, data).await.unwrap();
///     assert!(saved.attributes.contains_key("createdAt"));
/// }
/// ```
pub struct StoreActor {
    receiver: mpsc::Receiver<BackendRequest>,
    // BTreeMap keeps the default (unsorted) result order equal to insertion order.
    classes: HashMap<String, BTreeMap<String, Map<String, Value>>>,
    channels: HashMap<String, broadcast::Sender<ObjectEvent>>,
    next_id: u64,
}

impl StoreActor {
    /// Creates a new `StoreActor` and its associated `BackendClient`.
    ///
    /// `buffer_size` is the capacity of the request channel; callers wait when it is full.
    pub fn new(buffer_size: usize) -> (Self, BackendClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let store = Self {
            receiver,
            classes: HashMap::new(),
            channels: HashMap::new(),
            next_id: 1,
        };
        (store, BackendClient::new(sender))
    }

    /// Runs the store's event loop until every client has been dropped.
    pub async fn run(mut self) {
        info!("Store started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                BackendRequest::Count { query, respond_to } => {
                    let result = self.select(&query).map(|objects| objects.len() as u64);
                    debug!(class = query.class(), ?result, "Count");
                    let _ = respond_to.send(result);
                }
                BackendRequest::Find { query, respond_to } => {
                    let result = self.find(&query);
                    if let Ok(objects) = &result {
                        debug!(class = query.class(), found = objects.len(), "Find");
                    }
                    let _ = respond_to.send(result);
                }
                BackendRequest::Get {
                    class,
                    id,
                    respond_to,
                } => {
                    let result = self.get(&class, &id);
                    debug!(%class, %id, found = result.is_ok(), "Get");
                    let _ = respond_to.send(result);
                }
                BackendRequest::Save {
                    class,
                    id,
                    data,
                    respond_to,
                } => {
                    let result = match id {
                        Some(id) => self.update(&class, id, data),
                        None => Ok(self.insert(&class, data)),
                    };
                    let _ = respond_to.send(result);
                }
                BackendRequest::Destroy {
                    class,
                    id,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.destroy(&class, &id));
                }
                BackendRequest::Subscribe { class, respond_to } => {
                    let receiver = self
                        .channels
                        .entry(class.clone())
                        .or_insert_with(|| broadcast::channel(EVENT_BUFFER).0)
                        .subscribe();
                    debug!(%class, "Subscribed");
                    let _ = respond_to.send(Ok(receiver));
                }
            }
        }

        let size: usize = self.classes.values().map(BTreeMap::len).sum();
        info!(size, "Shutdown");
    }

    fn select(&self, query: &Query) -> Result<Vec<ParseObject>, BackendError> {
        let compiled = query.compile()?;
        let Some(objects) = self.classes.get(query.class()) else {
            return Ok(Vec::new());
        };
        Ok(objects
            .iter()
            .filter(|(id, attributes)| compiled.accepts(id, attributes))
            .map(|(id, attributes)| ParseObject::new(id.clone(), attributes.clone()))
            .collect())
    }

    fn find(&self, query: &Query) -> Result<Vec<ParseObject>, BackendError> {
        let mut objects = self.select(query)?;
        if let Some(key) = query.sort_key() {
            objects.sort_by(|a, b| {
                let cmp = compare_values(a.attributes.get(&key.field), b.attributes.get(&key.field));
                match key.direction {
                    Direction::Ascending => cmp,
                    Direction::Descending => cmp.reverse(),
                }
            });
        }
        let limit = query.max_results().unwrap_or(usize::MAX);
        Ok(objects
            .into_iter()
            .skip(query.offset())
            .take(limit)
            .collect())
    }

    fn get(&self, class: &str, id: &str) -> Result<ParseObject, BackendError> {
        self.classes
            .get(class)
            .and_then(|objects| objects.get(id))
            .map(|attributes| ParseObject::new(id, attributes.clone()))
            .ok_or_else(|| not_found(class, id))
    }

    fn insert(&mut self, class: &str, data: Map<String, Value>) -> ParseObject {
        let id = format!("{:010}", self.next_id);
        self.next_id += 1;

        let now = timestamp();
        let mut attributes = writable(data);
        attributes.insert(CREATED_AT.into(), Value::String(now.clone()));
        attributes.insert(UPDATED_AT.into(), Value::String(now));

        let objects = self.classes.entry(class.to_string()).or_default();
        objects.insert(id.clone(), attributes.clone());
        info!(%class, %id, size = objects.len(), "Created");

        let object = ParseObject::new(id, attributes);
        self.publish(class, ObjectEvent::Create(object.clone()));
        object
    }

    fn update(
        &mut self,
        class: &str,
        id: String,
        data: Map<String, Value>,
    ) -> Result<ParseObject, BackendError> {
        let Some(attributes) = self.classes.get_mut(class).and_then(|o| o.get_mut(&id)) else {
            warn!(%class, %id, "Not found");
            return Err(not_found(class, &id));
        };
        attributes.extend(writable(data));
        attributes.insert(UPDATED_AT.into(), Value::String(timestamp()));
        info!(%class, %id, "Updated");

        let object = ParseObject::new(id, attributes.clone());
        self.publish(class, ObjectEvent::Update(object.clone()));
        Ok(object)
    }

    fn destroy(&mut self, class: &str, id: &str) -> Result<(), BackendError> {
        let Some(objects) = self.classes.get_mut(class) else {
            warn!(%class, %id, "Not found");
            return Err(not_found(class, id));
        };
        match objects.remove(id) {
            Some(attributes) => {
                info!(%class, %id, size = objects.len(), "Deleted");
                self.publish(class, ObjectEvent::Delete(ParseObject::new(id, attributes)));
                Ok(())
            }
            None => {
                warn!(%class, %id, "Not found");
                Err(not_found(class, id))
            }
        }
    }

    fn publish(&mut self, class: &str, event: ObjectEvent) {
        if let Some(channel) = self.channels.get(class) {
            if channel.send(event).is_err() {
                // Every subscriber is gone.
                self.channels.remove(class);
            }
        }
    }
}

fn not_found(class: &str, id: &str) -> BackendError {
    BackendError::ObjectNotFound {
        class: class.to_string(),
        id: id.to_string(),
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Drops the attributes the store assigns itself.
fn writable(mut data: Map<String, Value>) -> Map<String, Value> {
    for key in [OBJECT_ID, CREATED_AT, UPDATED_AT] {
        data.remove(key);
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use serde_json::json;

    fn data(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_store_full_lifecycle() {
        let (store, client) = StoreActor::new(10);
        let handle = tokio::spawn(store.run());

        // 1. Create
        let created = client
            .save("Post", None, data(json!({"title": "Hello", "createdAt": "forged"})))
            .await
            .unwrap();
        assert_eq!(created.id, "0000000001");
        assert_ne!(created.attributes["createdAt"], json!("forged"));
        assert_eq!(created.attributes["createdAt"], created.attributes["updatedAt"]);

        // 2. Get
        let fetched = client.get("Post", &created.id).await.unwrap();
        assert_eq!(fetched, created);

        // 3. Update
        let updated = client
            .save("Post", Some(&created.id), data(json!({"title": "Bye"})))
            .await
            .unwrap();
        assert_eq!(updated.attributes["title"], json!("Bye"));
        assert_eq!(updated.attributes["createdAt"], created.attributes["createdAt"]);

        // 4. Delete
        client.destroy("Post", &created.id).await.unwrap();
        let missing = client.get("Post", &created.id).await;
        assert!(matches!(missing, Err(BackendError::ObjectNotFound { .. })));

        drop(client);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_find_sorts_then_pages() {
        let (store, client) = StoreActor::new(10);
        tokio::spawn(store.run());

        for name in ["carol", "alice", "bob", "dave"] {
            client
                .save("User", None, data(json!({ "name": name })))
                .await
                .unwrap();
        }

        let mut query = Query::new("User");
        query.ascending("name").skip(1).limit(2);
        let names: Vec<_> = client
            .find(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.attributes["name"].clone())
            .collect();
        assert_eq!(names, vec![json!("bob"), json!("carol")]);

        // count ignores paging
        assert_eq!(client.count(&query).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_update_of_missing_object_fails() {
        let (store, client) = StoreActor::new(10);
        tokio::spawn(store.run());

        let result = client.save("Post", Some("nope"), Map::new()).await;
        assert!(matches!(result, Err(BackendError::ObjectNotFound { .. })));
        assert!(client.destroy("Post", "nope").await.is_err());
    }

    #[tokio::test]
    async fn test_subscribers_receive_create_events() {
        let (store, client) = StoreActor::new(10);
        tokio::spawn(store.run());

        let mut events = client.subscribe("Post").await.unwrap();
        let saved = client
            .save("Post", None, data(json!({"title": "Live"})))
            .await
            .unwrap();

        match events.recv().await.unwrap() {
            ObjectEvent::Create(object) => assert_eq!(object, saved),
            other => panic!("unexpected event {other:?}"),
        }
    }
}
