//! Filter types for keyed store queries
//!
//! A `RecordFilter` is evaluated against the JSON form of a record, so the
//! same filter works for the in-memory backend and can be compiled to a
//! parameterized query for database backends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{StorageError, StorageResult};

/// Backend-neutral predicate over stored records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordFilter {
    /// Matches every record
    #[default]
    All,

    /// Field (dotted path) equals value
    Eq { field: String, value: Value },

    /// Timestamp field is strictly before the given instant
    Before { field: String, time: DateTime<Utc> },

    /// Every sub-filter matches
    And(Vec<RecordFilter>),

    /// At least one sub-filter matches
    Or(Vec<RecordFilter>),
}

impl RecordFilter {
    /// Filter that matches every record
    pub fn all() -> Self {
        RecordFilter::All
    }

    /// Filter on a field being equal to a value.
    ///
    /// Identifiers convert into the same JSON they serialize to inside a
    /// record.
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        RecordFilter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Filter on a timestamp field being strictly before `time`
    pub fn before(field: impl Into<String>, time: DateTime<Utc>) -> Self {
        RecordFilter::Before {
            field: field.into(),
            time,
        }
    }

    /// Combine with another filter; both must match
    pub fn and(self, other: RecordFilter) -> Self {
        match self {
            RecordFilter::All => other,
            RecordFilter::And(mut filters) => {
                filters.push(other);
                RecordFilter::And(filters)
            }
            filter => RecordFilter::And(vec![filter, other]),
        }
    }

    /// Combine with another filter; either may match
    pub fn or(self, other: RecordFilter) -> Self {
        match self {
            RecordFilter::Or(mut filters) => {
                filters.push(other);
                RecordFilter::Or(filters)
            }
            filter => RecordFilter::Or(vec![filter, other]),
        }
    }

    /// Evaluate the filter against a record's JSON form
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            RecordFilter::All => true,
            RecordFilter::Eq { field, value } => lookup(doc, field) == Some(value),
            RecordFilter::Before { field, time } => lookup(doc, field)
                .and_then(Value::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .is_some_and(|t| t.with_timezone(&Utc) < *time),
            RecordFilter::And(filters) => filters.iter().all(|f| f.matches(doc)),
            RecordFilter::Or(filters) => filters.iter().any(|f| f.matches(doc)),
        }
    }

    /// Reject field paths that are not plain identifiers.
    ///
    /// Database backends interpolate field paths into queries, values are
    /// always bound as parameters.
    pub fn validate(&self) -> StorageResult<()> {
        match self {
            RecordFilter::All => Ok(()),
            RecordFilter::Eq { field, .. } | RecordFilter::Before { field, .. } => {
                let valid = !field.is_empty()
                    && field.split('.').all(|segment| {
                        !segment.is_empty()
                            && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                    });
                if valid {
                    Ok(())
                } else {
                    Err(StorageError::Validation(format!(
                        "Invalid filter field: '{}'",
                        field
                    )))
                }
            }
            RecordFilter::And(filters) | RecordFilter::Or(filters) => {
                filters.iter().try_for_each(RecordFilter::validate)
            }
        }
    }
}

fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(doc, |current, segment| current.get(segment))
}
