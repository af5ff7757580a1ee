//! Write operations: create, update, update-many, delete, delete-many.

use super::envelope::{to_record, Envelope, Record};
use super::params::{CreateParams, DeleteManyParams, DeleteParams, UpdateManyParams, UpdateParams};
use super::{AdapterError, QueryAdapter};
use crate::backend::{Backend, BackendError, CREATED_AT, UPDATED_AT};
use futures_util::future::try_join_all;
use serde_json::{Map, Value};
use tracing::{info, instrument};

/// Fields a caller can never write.
const READ_ONLY_FIELDS: [&str; 3] = ["id", CREATED_AT, UPDATED_AT];

/// The submitted field map without `id`, `createdAt` and `updatedAt`.
pub fn writable_fields(mut data: Map<String, Value>) -> Map<String, Value> {
    for field in READ_ONLY_FIELDS {
        data.remove(field);
    }
    data
}

impl<B: Backend> QueryAdapter<B> {
    #[instrument(skip(self, params))]
    pub async fn create(&self, resource: &str, params: CreateParams) -> Result<Envelope, AdapterError> {
        let saved = self
            .backend
            .save(resource, None, params.data)
            .await
            .map_err(|source| AdapterError::Rejected {
                resource: resource.to_string(),
                source,
            })?;
        info!(id = %saved.id, "Created");
        Ok(Envelope::one(to_record(saved)))
    }

    #[instrument(skip(self, params), fields(id = %params.id))]
    pub async fn update(&self, resource: &str, params: UpdateParams) -> Result<Envelope, AdapterError> {
        let rejected = |source: BackendError| AdapterError::Rejected {
            resource: resource.to_string(),
            source,
        };
        let existing = self
            .backend
            .get(resource, &params.id)
            .await
            .map_err(|e| AdapterError::lookup(resource, &params.id, e, rejected))?;

        let saved = self
            .backend
            .save(resource, Some(&existing.id), writable_fields(params.data))
            .await
            .map_err(rejected)?;
        info!("Updated");
        Ok(Envelope::one(to_record(saved)))
    }

    /// Applies the same fields to every id and waits for every save before answering.
    #[instrument(skip(self, params), fields(count = params.ids.len()))]
    pub async fn update_many(
        &self,
        resource: &str,
        params: UpdateManyParams,
    ) -> Result<Envelope, AdapterError> {
        let batch_failure = |source: BackendError| AdapterError::BatchFailure {
            message: "Failed to update all",
            source,
        };
        let objects = try_join_all(params.ids.iter().map(|id| self.backend.get(resource, id)))
            .await
            .map_err(batch_failure)?;

        let data = writable_fields(params.data);
        try_join_all(
            objects
                .iter()
                .map(|object| self.backend.save(resource, Some(&object.id), data.clone())),
        )
        .await
        .map_err(batch_failure)?;

        info!("Updated all");
        Ok(Envelope::ids(params.ids))
    }

    /// Removes one record and returns it as it was just before deletion.
    #[instrument(skip(self, params), fields(id = %params.id))]
    pub async fn delete(&self, resource: &str, params: DeleteParams) -> Result<Envelope, AdapterError> {
        let object = self
            .backend
            .get(resource, &params.id)
            .await
            .map_err(|e| {
                AdapterError::lookup(resource, &params.id, e, |source| AdapterError::Delete { source })
            })?;

        let object_id = object.id.clone();
        let record: Record = to_record(object);
        self.backend
            .destroy(resource, &object_id)
            .await
            .map_err(|source| AdapterError::Delete { source })?;
        info!("Deleted");
        Ok(Envelope::one(record))
    }

    #[instrument(skip(self, params), fields(count = params.ids.len()))]
    pub async fn delete_many(
        &self,
        resource: &str,
        params: DeleteManyParams,
    ) -> Result<Envelope, AdapterError> {
        let batch_failure = |source: BackendError| AdapterError::BatchFailure {
            message: "Unable to delete all",
            source,
        };
        let objects = try_join_all(params.ids.iter().map(|id| self.backend.get(resource, id)))
            .await
            .map_err(batch_failure)?;

        try_join_all(
            objects
                .iter()
                .map(|object| self.backend.destroy(resource, &object.id)),
        )
        .await
        .map_err(batch_failure)?;

        info!("Deleted all");
        Ok(Envelope::ids(params.ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_only_fields_are_stripped() {
        let data = match json!({
            "id": "abc",
            "createdAt": "2024-01-01T00:00:00.000Z",
            "updatedAt": "2024-01-02T00:00:00.000Z",
            "name": "x",
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        let writable = writable_fields(data);
        assert_eq!(Value::Object(writable), json!({"name": "x"}));
    }
}
