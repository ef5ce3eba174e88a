use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Method,
};
use serde_json::Value;
use tracing::debug;

use shared_config::AppConfig;

use crate::store::{DocumentStore, Filter, SortOrder, StoreQuery};
use crate::supabase::SupabaseClient;

/// `DocumentStore` over the PostgREST API of a Supabase project. Each
/// collection maps to a table under `/rest/v1/`.
pub struct SupabaseStore {
    supabase: SupabaseClient,
}

impl SupabaseStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    fn first_row(rows: Vec<Value>) -> Option<Value> {
        rows.into_iter().next()
    }
}

/// Renders filters, ordering and limit as PostgREST query parameters.
pub fn render_query(query: &StoreQuery) -> Vec<String> {
    let mut parts: Vec<String> = query.filters.iter().map(render_filter).collect();

    if !query.sort.is_empty() {
        let order = query.sort.iter()
            .map(|key| match key.order {
                SortOrder::Asc => format!("{}.asc", key.field),
                SortOrder::Desc => format!("{}.desc", key.field),
            })
            .collect::<Vec<_>>()
            .join(",");
        parts.push(format!("order={}", order));
    }

    if let Some(limit) = query.limit {
        parts.push(format!("limit={}", limit));
    }

    parts
}

fn render_filter(filter: &Filter) -> String {
    match filter {
        Filter::Eq(field, value) => format!("{}=eq.{}", field, encode_value(value)),
        Filter::In(field, values) => {
            let list = values.iter()
                .map(|v| format!("%22{}%22", encode_value(v)))
                .collect::<Vec<_>>()
                .join(",");
            format!("{}=in.({})", field, list)
        }
        Filter::Contains(field, needle) => {
            format!("{}=ilike.*{}*", field, urlencoding::encode(needle))
        }
    }
}

fn encode_value(value: &Value) -> String {
    match value {
        Value::String(s) => urlencoding::encode(s).into_owned(),
        Value::Null => "null".to_string(),
        other => urlencoding::encode(&other.to_string()).into_owned(),
    }
}

fn table_path(collection: &str, params: &[String]) -> String {
    if params.is_empty() {
        format!("/rest/v1/{}", collection)
    } else {
        format!("/rest/v1/{}?{}", collection, params.join("&"))
    }
}

fn document_id(document: &Value) -> Result<String> {
    document
        .get("id")
        .and_then(|id| id.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Document has no string id"))
}

#[async_trait]
impl DocumentStore for SupabaseStore {
    async fn insert(&self, collection: &str, document: Value) -> Result<Value> {
        debug!("Inserting document into {}", collection);

        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            &table_path(collection, &[]),
            None,
            Some(document),
            Some(Self::representation_headers()),
        ).await?;

        Self::first_row(rows).ok_or_else(|| anyhow!("Insert into {} returned no rows", collection))
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let query = StoreQuery::new().eq("id", id).limit(1);
        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            &table_path(collection, &render_query(&query)),
            None,
            None,
        ).await?;

        Ok(Self::first_row(rows))
    }

    async fn find(&self, collection: &str, query: &StoreQuery) -> Result<Vec<Value>> {
        self.supabase.request(
            Method::GET,
            &table_path(collection, &render_query(query)),
            None,
            None,
        ).await
    }

    async fn count(&self, collection: &str, query: &StoreQuery) -> Result<u64> {
        let mut params = render_query(query);
        params.insert(0, "select=id".to_string());
        params.push("limit=0".to_string());

        self.supabase.count(&table_path(collection, &params), None).await
    }

    async fn update_by_id(&self, collection: &str, id: &str, patch: Value) -> Result<Option<Value>> {
        debug!("Updating {} document {}", collection, id);

        let query = StoreQuery::new().eq("id", id);
        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &table_path(collection, &render_query(&query)),
            None,
            Some(patch),
            Some(Self::representation_headers()),
        ).await?;

        Ok(Self::first_row(rows))
    }

    async fn save(&self, collection: &str, document: Value) -> Result<Value> {
        let id = document_id(&document)?;
        self.update_by_id(collection, &id, document)
            .await?
            .ok_or_else(|| anyhow!("No {} document with id {}", collection, id))
    }
}
