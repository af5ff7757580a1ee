//! # Parse Server REST Backend
//!
//! [`RestBackend`] executes queries against a remote Parse Server through its REST API.
//!
//! | Primitive | Request |
//! |-----------|---------|
//! | `find` | `GET /classes/{class}?where=..&limit=..&skip=..&order=..` |
//! | `count` | `GET /classes/{class}?where=..&count=1&limit=0` |
//! | `get` | `GET /classes/{class}/{id}` |
//! | `save` (new) | `POST /classes/{class}` |
//! | `save` (existing) | `PUT /classes/{class}/{id}` then `GET` for the stored state |
//! | `destroy` | `DELETE /classes/{class}/{id}` |
//!
//! Live subscriptions need the separate LiveQuery websocket server and are not provided here.

use super::{
    Backend, BackendError, Constraint, Direction, ParseObject, Query, CREATED_AT, OBJECT_ID,
    UPDATED_AT,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

const APPLICATION_ID_HEADER: &str = "X-Parse-Application-Id";
const CLIENT_KEY_HEADER: &str = "X-Parse-Javascript-Key";
const OBJECT_NOT_FOUND_CODE: i64 = 101;

#[derive(Debug, Deserialize)]
struct FindResponse {
    #[serde(default)]
    results: Vec<Value>,
    count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    #[serde(rename = "objectId")]
    object_id: String,
    #[serde(rename = "createdAt")]
    created_at: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    code: i64,
    error: String,
}

/// HTTP client for one Parse Server application.
#[derive(Clone)]
pub struct RestBackend {
    http: Client,
    server_url: String,
}

impl RestBackend {
    pub fn new(
        server_url: impl Into<String>,
        application_id: &str,
        client_key: &str,
    ) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert(APPLICATION_ID_HEADER, header_value(application_id)?);
        headers.insert(CLIENT_KEY_HEADER, header_value(client_key)?);
        let http = Client::builder().default_headers(headers).build()?;

        let server_url = server_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, server_url })
    }

    fn class_url(&self, class: &str) -> String {
        format!("{}/classes/{}", self.server_url, class)
    }

    fn object_url(&self, class: &str, id: &str) -> String {
        format!("{}/classes/{}/{}", self.server_url, class, id)
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
        class: &str,
        id: Option<&str>,
    ) -> Result<T, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body: Option<ErrorResponse> = response.json().await.ok();
        debug!(%status, ?body, "Request failed");
        match (body, id) {
            (Some(ErrorResponse { code, .. }), Some(id)) if code == OBJECT_NOT_FOUND_CODE => {
                Err(BackendError::ObjectNotFound {
                    class: class.to_string(),
                    id: id.to_string(),
                })
            }
            (None, Some(id)) if status == reqwest::StatusCode::NOT_FOUND => {
                Err(BackendError::ObjectNotFound {
                    class: class.to_string(),
                    id: id.to_string(),
                })
            }
            (Some(ErrorResponse { code, error }), _) => {
                Err(BackendError::Rejected(format!("{code}: {error}")))
            }
            (None, _) => Err(BackendError::Rejected(format!("HTTP {status}"))),
        }
    }
}

#[async_trait]
impl Backend for RestBackend {
    #[instrument(skip(self, query), fields(class = query.class()))]
    async fn count(&self, query: &Query) -> Result<u64, BackendError> {
        let params = query_params(query, true)?;
        let request = self.http.get(self.class_url(query.class())).query(&params);
        let response: FindResponse = self.send(request, query.class(), None).await?;
        response
            .count
            .ok_or_else(|| BackendError::Rejected("count missing from response".into()))
    }

    #[instrument(skip(self, query), fields(class = query.class()))]
    async fn find(&self, query: &Query) -> Result<Vec<ParseObject>, BackendError> {
        let params = query_params(query, false)?;
        let request = self.http.get(self.class_url(query.class())).query(&params);
        let response: FindResponse = self.send(request, query.class(), None).await?;
        response.results.into_iter().map(object_from_json).collect()
    }

    #[instrument(skip(self))]
    async fn get(&self, class: &str, id: &str) -> Result<ParseObject, BackendError> {
        let request = self.http.get(self.object_url(class, id));
        let body: Value = self.send(request, class, Some(id)).await?;
        object_from_json(body)
    }

    #[instrument(skip(self, data))]
    async fn save(
        &self,
        class: &str,
        id: Option<&str>,
        data: Map<String, Value>,
    ) -> Result<ParseObject, BackendError> {
        match id {
            Some(id) => {
                let request = self.http.put(self.object_url(class, id)).json(&data);
                let _: Value = self.send(request, class, Some(id)).await?;
                self.get(class, id).await
            }
            None => {
                let request = self.http.post(self.class_url(class)).json(&data);
                let created: CreateResponse = self.send(request, class, None).await?;
                let mut attributes = data;
                attributes.insert(CREATED_AT.into(), Value::String(created.created_at.clone()));
                attributes.insert(UPDATED_AT.into(), Value::String(created.created_at));
                Ok(ParseObject::new(created.object_id, attributes))
            }
        }
    }

    #[instrument(skip(self))]
    async fn destroy(&self, class: &str, id: &str) -> Result<(), BackendError> {
        let request = self.http.delete(self.object_url(class, id));
        let _: Value = self.send(request, class, Some(id)).await?;
        Ok(())
    }
}

fn header_value(value: &str) -> Result<HeaderValue, BackendError> {
    HeaderValue::from_str(value).map_err(|e| BackendError::InvalidConfig(e.to_string()))
}

/// Encodes the constraints as the `where` JSON document.
pub fn encode_where(constraints: &[Constraint]) -> Value {
    let mut clauses = Map::new();
    for constraint in constraints {
        let (field, clause) = match constraint {
            Constraint::EqualTo { field, value } => (field, value.clone()),
            Constraint::Matches {
                field,
                pattern,
                flags,
            } => {
                let mut regex = Map::new();
                regex.insert("$regex".into(), Value::String(pattern.clone()));
                if !flags.is_empty() {
                    regex.insert("$options".into(), Value::String(flags.clone()));
                }
                (field, Value::Object(regex))
            }
        };
        // Operators on the same field combine into one clause.
        if let (Some(Value::Object(existing)), Value::Object(operators)) =
            (clauses.get_mut(field), &clause)
        {
            existing.extend(operators.clone());
            continue;
        }
        clauses.insert(field.clone(), clause);
    }
    Value::Object(clauses)
}

/// Query-string parameters for a find (or, with `counting`, a count) request.
pub fn query_params(query: &Query, counting: bool) -> Result<Vec<(String, String)>, BackendError> {
    let mut params = Vec::new();
    if !query.constraints().is_empty() {
        let clauses = serde_json::to_string(&encode_where(query.constraints()))
            .map_err(|e| BackendError::InvalidQuery(e.to_string()))?;
        params.push(("where".to_string(), clauses));
    }
    if counting {
        params.push(("count".to_string(), "1".to_string()));
        params.push(("limit".to_string(), "0".to_string()));
        return Ok(params);
    }
    if let Some(limit) = query.max_results() {
        params.push(("limit".to_string(), limit.to_string()));
    }
    if query.offset() > 0 {
        params.push(("skip".to_string(), query.offset().to_string()));
    }
    if let Some(key) = query.sort_key() {
        let order = match key.direction {
            Direction::Ascending => key.field.clone(),
            Direction::Descending => format!("-{}", key.field),
        };
        params.push(("order".to_string(), order));
    }
    Ok(params)
}

/// Splits a REST object (`objectId` + attributes) into a [`ParseObject`].
pub fn object_from_json(value: Value) -> Result<ParseObject, BackendError> {
    let Value::Object(mut attributes) = value else {
        return Err(BackendError::Rejected("expected a JSON object".into()));
    };
    match attributes.remove(OBJECT_ID) {
        Some(Value::String(id)) => Ok(ParseObject::new(id, attributes)),
        _ => Err(BackendError::Rejected("object without objectId".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_where_encodes_regex_and_equality() {
        let mut query = Query::new("Comment");
        query
            .matches("body", "hello", "i")
            .equal_to("post_id", json!("p1"));

        assert_eq!(
            encode_where(query.constraints()),
            json!({
                "body": {"$regex": "hello", "$options": "i"},
                "post_id": "p1",
            })
        );
    }

    #[test]
    fn test_find_params_carry_paging_and_order() {
        let mut query = Query::new("Post");
        query.limit(10).skip(10).descending("name");

        let params = query_params(&query, false).unwrap();
        assert_eq!(
            params,
            vec![
                ("limit".to_string(), "10".to_string()),
                ("skip".to_string(), "10".to_string()),
                ("order".to_string(), "-name".to_string()),
            ]
        );
    }

    #[test]
    fn test_count_params_ignore_paging() {
        let mut query = Query::new("Post");
        query.equal_to("author", json!("bob")).limit(10).skip(30);

        let params = query_params(&query, true).unwrap();
        assert_eq!(params[0].0, "where");
        assert_eq!(params[1], ("count".to_string(), "1".to_string()));
        assert_eq!(params[2], ("limit".to_string(), "0".to_string()));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_object_from_json_splits_id() {
        let object = object_from_json(json!({
            "objectId": "abc123",
            "title": "X",
            "createdAt": "2024-01-01T00:00:00.000Z",
        }))
        .unwrap();
        assert_eq!(object.id, "abc123");
        assert!(!object.attributes.contains_key("objectId"));
        assert_eq!(object.attributes["title"], json!("X"));

        assert!(object_from_json(json!({"title": "X"})).is_err());
    }

    #[test]
    fn test_urls_drop_trailing_slash() {
        let backend = RestBackend::new("http://localhost:1337/parse/", "app", "key").unwrap();
        assert_eq!(
            backend.object_url("Post", "p1"),
            "http://localhost:1337/parse/classes/Post/p1"
        );
    }
}
