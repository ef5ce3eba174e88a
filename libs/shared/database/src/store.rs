use std::cmp::Ordering;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Collection-addressed JSON document storage.
///
/// Documents are JSON objects carrying a string `id`. Backends must keep
/// `find` results in insertion order before applying `sort`, so equal sort
/// keys fall back to creation order.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, collection: &str, document: Value) -> Result<Value>;

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    async fn find(&self, collection: &str, query: &StoreQuery) -> Result<Vec<Value>>;

    async fn count(&self, collection: &str, query: &StoreQuery) -> Result<u64>;

    /// Shallow-merges `patch` into the document. `None` when no such id.
    async fn update_by_id(&self, collection: &str, id: &str, patch: Value) -> Result<Option<Value>>;

    /// Replaces the whole document identified by its `id` field.
    async fn save(&self, collection: &str, document: Value) -> Result<Value>;
}

pub type DynDocumentStore = Arc<dyn DocumentStore>;

/// Fixed-width UTC timestamp, so string order in the store matches time order.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
    /// Case-insensitive substring match on a string field.
    Contains(String, String),
}

impl Filter {
    pub fn field(&self) -> &str {
        match self {
            Filter::Eq(field, _) | Filter::In(field, _) | Filter::Contains(field, _) => field,
        }
    }

    pub fn matches(&self, document: &Value) -> bool {
        let actual = document.get(self.field()).unwrap_or(&Value::Null);
        match self {
            Filter::Eq(_, expected) => actual == expected,
            Filter::In(_, options) => options.iter().any(|o| o == actual),
            Filter::Contains(_, needle) => actual
                .as_str()
                .map(|s| s.to_lowercase().contains(&needle.to_lowercase()))
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: String,
    pub order: SortOrder,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreQuery {
    pub filters: Vec<Filter>,
    pub sort: Vec<SortKey>,
    pub limit: Option<usize>,
}

impl StoreQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(field.to_string(), value.into()));
        self
    }

    pub fn one_of<V: Into<Value>>(mut self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.filters.push(Filter::In(field.to_string(), values));
        self
    }

    pub fn contains(mut self, field: &str, needle: &str) -> Self {
        self.filters.push(Filter::Contains(field.to_string(), needle.to_string()));
        self
    }

    pub fn sort_asc(mut self, field: &str) -> Self {
        self.sort.push(SortKey { field: field.to_string(), order: SortOrder::Asc });
        self
    }

    pub fn sort_desc(mut self, field: &str) -> Self {
        self.sort.push(SortKey { field: field.to_string(), order: SortOrder::Desc });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, document: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(document))
    }

    /// Ordering of two documents under this query's sort keys.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        for key in &self.sort {
            let left = a.get(&key.field).unwrap_or(&Value::Null);
            let right = b.get(&key.field).unwrap_or(&Value::Null);
            let ordering = match key.order {
                SortOrder::Asc => compare_values(left, right),
                SortOrder::Desc => compare_values(right, left),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

// Nulls sort first; mismatched types compare equal.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}
