//! # Query Builder
//!
//! A backend-neutral description of one object query: which class, which constraints, how many
//! results, how many to skip and in which order. The adapter builds a [`Query`] through the
//! builder methods; each [`Backend`](super::Backend) decides how to execute it.
//!
//! The in-memory store evaluates queries locally through [`Query::compile`], the REST backend
//! encodes them as request parameters.

use super::BackendError;
use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// A single predicate on one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    EqualTo {
        field: String,
        value: Value,
    },
    /// Regular-expression match; `flags` follow the backend convention (`"i"` = ignore case).
    Matches {
        field: String,
        pattern: String,
        flags: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: Direction,
}

/// An object query over one class.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    class: String,
    constraints: Vec<Constraint>,
    limit: Option<usize>,
    skip: usize,
    sort: Option<SortKey>,
}

impl Query {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            constraints: Vec::new(),
            limit: None,
            skip: 0,
            sort: None,
        }
    }

    pub fn equal_to(&mut self, field: impl Into<String>, value: Value) -> &mut Self {
        self.constraints.push(Constraint::EqualTo {
            field: field.into(),
            value,
        });
        self
    }

    pub fn matches(
        &mut self,
        field: impl Into<String>,
        pattern: impl Into<String>,
        flags: impl Into<String>,
    ) -> &mut Self {
        self.constraints.push(Constraint::Matches {
            field: field.into(),
            pattern: pattern.into(),
            flags: flags.into(),
        });
        self
    }

    pub fn limit(&mut self, limit: usize) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(&mut self, skip: usize) -> &mut Self {
        self.skip = skip;
        self
    }

    /// Sorts ascending on `field`, replacing any previous ordering.
    pub fn ascending(&mut self, field: impl Into<String>) -> &mut Self {
        self.sort = Some(SortKey {
            field: field.into(),
            direction: Direction::Ascending,
        });
        self
    }

    /// Sorts descending on `field`, replacing any previous ordering.
    pub fn descending(&mut self, field: impl Into<String>) -> &mut Self {
        self.sort = Some(SortKey {
            field: field.into(),
            direction: Direction::Descending,
        });
        self
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn max_results(&self) -> Option<usize> {
        self.limit
    }

    pub fn offset(&self) -> usize {
        self.skip
    }

    pub fn sort_key(&self) -> Option<&SortKey> {
        self.sort.as_ref()
    }

    /// Compiles the constraints into a predicate usable against raw attribute maps.
    pub fn compile(&self) -> Result<CompiledQuery, BackendError> {
        let predicates = self
            .constraints
            .iter()
            .map(Predicate::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CompiledQuery { predicates })
    }
}

enum Predicate {
    Equal { field: String, value: Value },
    Regex { field: String, regex: Regex },
}

impl Predicate {
    fn compile(constraint: &Constraint) -> Result<Self, BackendError> {
        match constraint {
            Constraint::EqualTo { field, value } => Ok(Predicate::Equal {
                field: field.clone(),
                value: value.clone(),
            }),
            Constraint::Matches {
                field,
                pattern,
                flags,
            } => {
                let mut builder = RegexBuilder::new(pattern);
                for flag in flags.chars() {
                    match flag {
                        'i' => builder.case_insensitive(true),
                        'm' => builder.multi_line(true),
                        's' => builder.dot_matches_new_line(true),
                        'x' => builder.ignore_whitespace(true),
                        other => {
                            return Err(BackendError::InvalidQuery(format!(
                                "unknown regex flag '{other}'"
                            )))
                        }
                    };
                }
                let regex = builder
                    .build()
                    .map_err(|e| BackendError::InvalidQuery(e.to_string()))?;
                Ok(Predicate::Regex {
                    field: field.clone(),
                    regex,
                })
            }
        }
    }

    fn accepts(&self, id: &str, attributes: &Map<String, Value>) -> bool {
        match self {
            Predicate::Equal { field, value } => match field_value(id, attributes, field) {
                Some(found) => found == *value,
                None => value.is_null(),
            },
            Predicate::Regex { field, regex } => matches!(
                field_value(id, attributes, field),
                Some(Value::String(s)) if regex.is_match(&s)
            ),
        }
    }
}

/// Constraints of a [`Query`] ready to be evaluated.
pub struct CompiledQuery {
    predicates: Vec<Predicate>,
}

impl CompiledQuery {
    /// All constraints are combined with AND.
    pub fn accepts(&self, id: &str, attributes: &Map<String, Value>) -> bool {
        self.predicates.iter().all(|p| p.accepts(id, attributes))
    }
}

// `objectId` addresses the identifier, which is not stored among the attributes.
fn field_value(id: &str, attributes: &Map<String, Value>, field: &str) -> Option<Value> {
    if field == "objectId" {
        return Some(Value::String(id.to_string()));
    }
    attributes.get(field).cloned()
}

/// Ordering used when sorting attribute values. Missing values sort last.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .unwrap_or(0.0)
            .partial_cmp(&b.as_f64().unwrap_or(0.0))
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
