//! Per-operation parameter objects, deserialized from the JSON the UI sends.

use super::{AdapterError, OperationKind};
use crate::backend::Query;
use serde::Deserialize;
use serde_json::{Map, Value};

/// 1-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
}

impl Pagination {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self { page, per_page }
    }

    /// Number of records before the requested page: `(page - 1) * perPage`, saturating.
    pub fn skip(&self) -> usize {
        self.offset()
            .and_then(|skip| usize::try_from(skip).ok())
            .unwrap_or(usize::MAX)
    }

    pub fn limit(&self) -> usize {
        usize::try_from(self.per_page).unwrap_or(usize::MAX)
    }

    fn offset(&self) -> Option<u64> {
        self.page.saturating_sub(1).checked_mul(self.per_page)
    }

    pub(crate) fn validate(&self, operation: OperationKind) -> Result<(), AdapterError> {
        if self.page == 0 || self.per_page == 0 {
            return Err(AdapterError::InvalidParams {
                operation,
                reason: format!(
                    "pagination needs page >= 1 and perPage >= 1, got page={} perPage={}",
                    self.page, self.per_page
                ),
            });
        }
        let in_range = self
            .offset()
            .and_then(|skip| skip.checked_add(self.per_page))
            .is_some_and(|end| usize::try_from(end).is_ok());
        if !in_range {
            return Err(AdapterError::InvalidParams {
                operation,
                reason: format!(
                    "pagination out of range: page={} perPage={}",
                    self.page, self.per_page
                ),
            });
        }
        Ok(())
    }
}

/// Requested ordering.
///
/// `ASEC` is accepted as a spelling of `ASC`; clients in the wild send it. Any other value
/// leaves the backend's default order in place.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum SortOrder {
    Asc,
    Desc,
    Unrecognized(String),
}

impl From<String> for SortOrder {
    fn from(order: String) -> Self {
        match order.as_str() {
            "ASC" | "ASEC" => SortOrder::Asc,
            "DESC" => SortOrder::Desc,
            _ => SortOrder::Unrecognized(order),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

impl Sort {
    pub fn new(field: impl Into<String>, order: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::from(order.into()),
        }
    }

    pub(crate) fn apply(&self, query: &mut Query) {
        match self.order {
            SortOrder::Asc => {
                query.ascending(&self.field);
            }
            SortOrder::Desc => {
                query.descending(&self.field);
            }
            SortOrder::Unrecognized(_) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListParams {
    pub pagination: Pagination,
    pub sort: Sort,
    /// Field name to case-insensitive substring pattern.
    #[serde(default)]
    pub filter: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GetOneParams {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GetManyParams {
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GetManyReferenceParams {
    /// Field on the listed resource holding the reference.
    pub target: String,
    /// Value the reference must equal.
    pub id: Value,
    pub pagination: Pagination,
    pub sort: Sort,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateParams {
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpdateParams {
    pub id: String,
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpdateManyParams {
    pub ids: Vec<String>,
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeleteParams {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeleteManyParams {
    pub ids: Vec<String>,
}
