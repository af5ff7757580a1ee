//! Read operations: list, get-one, get-many, get-many-reference.

use super::envelope::{to_record, Envelope};
use super::params::{GetManyParams, GetManyReferenceParams, GetOneParams, ListParams, Pagination, Sort};
use super::{AdapterError, OperationKind, QueryAdapter};
use crate::backend::{Backend, Query};
use futures_util::future::try_join_all;
use serde_json::Value;
use tracing::{debug, instrument};

impl<B: Backend> QueryAdapter<B> {
    /// One page of `resource`, filtered by case-insensitive substring per field.
    #[instrument(skip(self, params))]
    pub async fn get_list(&self, resource: &str, params: ListParams) -> Result<Envelope, AdapterError> {
        params.pagination.validate(OperationKind::GetList)?;

        let mut query = Query::new(resource);
        for (field, pattern) in &params.filter {
            match pattern {
                Value::Null => continue,
                Value::String(text) => query.matches(field, text, "i"),
                other => query.matches(field, other.to_string(), "i"),
            };
        }
        self.page(query, &params.pagination, &params.sort).await
    }

    #[instrument(skip(self, params), fields(id = %params.id))]
    pub async fn get_one(&self, resource: &str, params: GetOneParams) -> Result<Envelope, AdapterError> {
        let object = self
            .backend
            .get(resource, &params.id)
            .await
            .map_err(|e| AdapterError::lookup(resource, &params.id, e, AdapterError::Backend))?;
        Ok(Envelope::one(to_record(object)))
    }

    /// Fetches every id in parallel. `total` is the number of ids requested.
    #[instrument(skip(self, params), fields(count = params.ids.len()))]
    pub async fn get_many(&self, resource: &str, params: GetManyParams) -> Result<Envelope, AdapterError> {
        let objects = try_join_all(params.ids.iter().map(|id| self.backend.get(resource, id)))
            .await
            .map_err(|source| AdapterError::BatchFailure {
                message: "Unable to fetch all",
                source,
            })?;
        let records = objects.into_iter().map(to_record).collect();
        Ok(Envelope::list(records, params.ids.len() as u64))
    }

    /// One page of the records of `resource` whose `target` field equals `id`.
    #[instrument(skip(self, params), fields(target = %params.target))]
    pub async fn get_many_reference(
        &self,
        resource: &str,
        params: GetManyReferenceParams,
    ) -> Result<Envelope, AdapterError> {
        params.pagination.validate(OperationKind::GetManyReference)?;

        let mut query = Query::new(resource);
        query.equal_to(&params.target, params.id);
        self.page(query, &params.pagination, &params.sort).await
    }

    /// Counts the constrained query, then pages, sorts and fetches it.
    async fn page(
        &self,
        mut query: Query,
        pagination: &Pagination,
        sort: &Sort,
    ) -> Result<Envelope, AdapterError> {
        let total = self.backend.count(&query).await?;

        query.limit(pagination.limit()).skip(pagination.skip());
        sort.apply(&mut query);

        let records: Vec<_> = self
            .backend
            .find(&query)
            .await?
            .into_iter()
            .map(to_record)
            .collect();
        debug!(total, returned = records.len(), "Page fetched");
        Ok(Envelope::list(records, total))
    }
}
