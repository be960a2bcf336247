//! Query results
//!
//! A `QueryResult` is the row set one execution produced plus how long it
//! took. Rows map column names to typed values; a row only carries the columns
//! that were selected.

use crate::ir::Timestamp;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// One cell of a result row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultValue {
    Double(f64),
    Int(i64),
    String(String),
    Date(#[serde(serialize_with = "rfc3339")] Timestamp),
    Null,
}

impl std::fmt::Display for ResultValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Double(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::String(s) => f.write_str(s),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
            Self::Null => f.write_str("NULL"),
        }
    }
}

impl From<f64> for ResultValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<i64> for ResultValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<String> for ResultValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for ResultValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Timestamp> for ResultValue {
    fn from(v: Timestamp) -> Self {
        Self::Date(v)
    }
}

impl<T: Into<ResultValue>> From<Option<T>> for ResultValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// A single result row, keyed by column name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultRow {
    values: BTreeMap<String, ResultValue>,
}

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column, replacing any previous value
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<ResultValue>) {
        self.values.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&ResultValue> {
        self.values.get(column)
    }

    pub fn double(&self, column: &str) -> Option<f64> {
        match self.values.get(column) {
            Some(ResultValue::Double(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn int(&self, column: &str) -> Option<i64> {
        match self.values.get(column) {
            Some(ResultValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn string(&self, column: &str) -> Option<&str> {
        match self.values.get(column) {
            Some(ResultValue::String(v)) => Some(v),
            _ => None,
        }
    }

    pub fn date(&self, column: &str) -> Option<Timestamp> {
        match self.values.get(column) {
            Some(ResultValue::Date(v)) => Some(*v),
            _ => None,
        }
    }

    /// True for an explicit null and for a column the row does not carry
    pub fn is_null(&self, column: &str) -> bool {
        matches!(self.values.get(column), None | Some(ResultValue::Null))
    }

    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    /// Column names in sorted order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<ResultValue>> FromIterator<(K, V)> for ResultRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Rows produced by one query execution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub rows: Vec<ResultRow>,
    /// Wall-clock time spent in the store
    #[serde(with = "duration_secs")]
    pub execution_time: Duration,
}

impl QueryResult {
    pub fn new(rows: Vec<ResultRow>, execution_time: Duration) -> Self {
        Self {
            rows,
            execution_time,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResultRow> {
        self.rows.iter()
    }

    /// Sorted union of every row's columns
    pub fn columns(&self) -> Vec<String> {
        let columns: BTreeSet<&str> = self.rows.iter().flat_map(ResultRow::columns).collect();
        columns.into_iter().map(str::to_string).collect()
    }
}

impl IntoIterator for QueryResult {
    type Item = ResultRow;
    type IntoIter = std::vec::IntoIter<ResultRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = &'a ResultRow;
    type IntoIter = std::slice::Iter<'a, ResultRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

fn rfc3339<S: serde::Serializer>(date: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&date.to_rfc3339())
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }
}
