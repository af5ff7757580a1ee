use query_adapter::adapter::{AdapterError, QueryAdapter};
use query_adapter::backend::mock::{
    create_mock_backend, expect_count, expect_find, expect_get, expect_save, MockBackend,
};
use query_adapter::backend::{BackendError, Constraint, Direction, ParseObject, SortKey};
use serde_json::{json, Map, Value};
use std::sync::Arc;

fn object(id: &str, attributes: Value) -> ParseObject {
    match attributes {
        Value::Object(map) => ParseObject::new(id, map),
        _ => ParseObject::new(id, Map::new()),
    }
}

/// The backend sees the count first, then a find with `skip`, `limit` and sort applied.
#[tokio::test]
async fn test_list_paging_reaches_backend() {
    let (client, mut receiver) = create_mock_backend(10);
    let adapter = QueryAdapter::new(Arc::new(client));

    let list_task = tokio::spawn(async move {
        adapter
            .dispatch(
                "GET_LIST",
                "posts",
                json!({
                    "pagination": { "page": 3, "perPage": 10 },
                    "sort": { "field": "title", "order": "DESC" },
                    "filter": { "title": "rust" },
                }),
            )
            .await
    });

    let (count_query, responder) = expect_count(&mut receiver)
        .await
        .expect("Expected Count request");
    assert_eq!(count_query.class(), "posts");
    assert_eq!(count_query.max_results(), None);
    assert_eq!(count_query.offset(), 0);
    assert_eq!(
        count_query.constraints(),
        &[Constraint::Matches {
            field: "title".into(),
            pattern: "rust".into(),
            flags: "i".into(),
        }]
    );
    responder.send(Ok(42)).unwrap();

    let (find_query, responder) = expect_find(&mut receiver)
        .await
        .expect("Expected Find request");
    assert_eq!(find_query.offset(), 20);
    assert_eq!(find_query.max_results(), Some(10));
    assert_eq!(
        find_query.sort_key(),
        Some(&SortKey {
            field: "title".into(),
            direction: Direction::Descending,
        })
    );
    assert_eq!(find_query.constraints(), count_query.constraints());
    responder
        .send(Ok(vec![object("p21", json!({ "title": "Rust 21" }))]))
        .unwrap();

    let page = list_task.await.unwrap().unwrap();
    assert_eq!(page.total, Some(42));
    assert_eq!(page.records().unwrap()[0]["id"], json!("p21"));
}

#[tokio::test]
async fn test_unknown_sort_order_leaves_backend_default() {
    let (client, mut receiver) = create_mock_backend(10);
    let adapter = QueryAdapter::new(Arc::new(client));

    let list_task = tokio::spawn(async move {
        adapter
            .dispatch(
                "GET_LIST",
                "posts",
                json!({
                    "pagination": { "page": 1, "perPage": 5 },
                    "sort": { "field": "title", "order": "sideways" },
                }),
            )
            .await
    });

    let (_, responder) = expect_count(&mut receiver).await.unwrap();
    responder.send(Ok(0)).unwrap();
    let (query, responder) = expect_find(&mut receiver).await.unwrap();
    assert_eq!(query.sort_key(), None);
    responder.send(Ok(Vec::new())).unwrap();

    assert_eq!(list_task.await.unwrap().unwrap().total, Some(0));
}

/// Only writable fields reach the backend on update.
#[tokio::test]
async fn test_update_sends_only_writable_fields() {
    let (client, mut receiver) = create_mock_backend(10);
    let adapter = QueryAdapter::new(Arc::new(client));

    let update_task = tokio::spawn(async move {
        adapter
            .dispatch(
                "UPDATE",
                "products",
                json!({
                    "id": "abc",
                    "data": {
                        "id": "abc",
                        "createdAt": "2024-01-01T00:00:00.000Z",
                        "updatedAt": "2024-01-02T00:00:00.000Z",
                        "name": "x",
                    },
                }),
            )
            .await
    });

    let (class, id, responder) = expect_get(&mut receiver).await.expect("Expected Get request");
    assert_eq!(class, "products");
    assert_eq!(id, "abc");
    responder
        .send(Ok(object("abc", json!({ "name": "old" }))))
        .unwrap();

    let (id, data, responder) = expect_save(&mut receiver)
        .await
        .expect("Expected Save request");
    assert_eq!(id.as_deref(), Some("abc"));
    assert_eq!(Value::Object(data), json!({ "name": "x" }));
    responder
        .send(Ok(object("abc", json!({ "name": "x" }))))
        .unwrap();

    let updated = update_task.await.unwrap().unwrap();
    assert_eq!(updated.record().unwrap()["name"], json!("x"));
}

#[tokio::test]
async fn test_create_failure_is_an_error() {
    let mut mock = MockBackend::new();
    mock.expect_save()
        .return_err(BackendError::Rejected("142: name is required".into()));
    let adapter = QueryAdapter::new(Arc::new(mock.client()));

    let result = adapter
        .dispatch("CREATE", "products", json!({ "data": {} }))
        .await;

    match result {
        Err(AdapterError::Rejected { resource, source }) => {
            assert_eq!(resource, "products");
            assert!(source.to_string().contains("name is required"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
    mock.verify();
}

#[tokio::test]
async fn test_delete_keeps_backend_cause() {
    let mut mock = MockBackend::new();
    mock.expect_get("abc")
        .return_ok(object("abc", json!({ "title": "X" })));
    mock.expect_destroy("abc")
        .return_err(BackendError::Rejected("119: permission denied".into()));
    let adapter = QueryAdapter::new(Arc::new(mock.client()));

    let err = adapter
        .dispatch("DELETE", "posts", json!({ "id": "abc" }))
        .await
        .expect_err("Delete should fail");

    assert_eq!(err.to_string(), "Unable to delete");
    assert!(matches!(
        err,
        AdapterError::Delete {
            source: BackendError::Rejected(_)
        }
    ));
    mock.verify();
}

#[tokio::test]
async fn test_update_many_fails_when_a_save_fails() {
    let mut mock = MockBackend::new();
    mock.expect_get("a").return_ok(object("a", json!({})));
    mock.expect_save()
        .return_err(BackendError::Rejected("offline".into()));
    let adapter = QueryAdapter::new(Arc::new(mock.client()));

    let err = adapter
        .dispatch("UPDATE_MANY", "posts", json!({ "ids": ["a"], "data": { "x": 1 } }))
        .await
        .expect_err("Batch should fail");

    assert_eq!(err.to_string(), "Failed to update all");
    mock.verify();
}
