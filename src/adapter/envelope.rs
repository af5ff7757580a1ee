//! The uniform result shape returned to the UI.

use crate::backend::ParseObject;
use serde::Serialize;
use serde_json::{Map, Value};

/// A flat record: every backend attribute plus `id`.
pub type Record = Map<String, Value>;

/// Flattens a backend object into a [`Record`].
///
/// `id` is written last so it is always the backend identifier, even if the object happens to
/// store an attribute of the same name.
pub fn to_record(object: ParseObject) -> Record {
    let mut record = object.attributes;
    record.insert("id".into(), Value::String(object.id));
    record
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EnvelopeData {
    Record(Record),
    Records(Vec<Record>),
    Ids(Vec<String>),
}

/// `{ data, total? }`. `total` is present for list-style reads only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub data: EnvelopeData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl Envelope {
    pub fn list(records: Vec<Record>, total: u64) -> Self {
        Self {
            data: EnvelopeData::Records(records),
            total: Some(total),
        }
    }

    pub fn one(record: Record) -> Self {
        Self {
            data: EnvelopeData::Record(record),
            total: None,
        }
    }

    pub fn ids(ids: Vec<String>) -> Self {
        Self {
            data: EnvelopeData::Ids(ids),
            total: None,
        }
    }

    pub fn record(&self) -> Option<&Record> {
        match &self.data {
            EnvelopeData::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn records(&self) -> Option<&[Record]> {
        match &self.data {
            EnvelopeData::Records(records) => Some(records),
            _ => None,
        }
    }

    pub fn id_list(&self) -> Option<&[String]> {
        match &self.data {
            EnvelopeData::Ids(ids) => Some(ids),
            _ => None,
        }
    }

    /// The envelope as the JSON value handed to the UI.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
