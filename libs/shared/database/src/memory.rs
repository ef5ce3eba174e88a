use std::collections::HashMap;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::store::{DocumentStore, StoreQuery};

/// Process-local document store. Collections keep insertion order.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn id_of(document: &Value) -> Option<&str> {
    document.get("id").and_then(|id| id.as_str())
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn insert(&self, collection: &str, mut document: Value) -> Result<Value> {
        let object = document
            .as_object_mut()
            .ok_or_else(|| anyhow!("Only JSON objects can be stored"))?;

        if !object.get("id").map(Value::is_string).unwrap_or(false) {
            object.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }

        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();

        if documents.iter().any(|d| id_of(d) == id_of(&document)) {
            return Err(anyhow!("Duplicate id in {}", collection));
        }

        documents.push(document.clone());
        Ok(document)
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| id_of(d) == Some(id)))
            .cloned())
    }

    async fn find(&self, collection: &str, query: &StoreQuery) -> Result<Vec<Value>> {
        let collections = self.collections.read().await;
        let mut found: Vec<Value> = collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| query.matches(d)).cloned().collect())
            .unwrap_or_default();

        // Stable sort keeps insertion order for equal keys.
        found.sort_by(|a, b| query.compare(a, b));

        if let Some(limit) = query.limit {
            found.truncate(limit);
        }

        Ok(found)
    }

    async fn count(&self, collection: &str, query: &StoreQuery) -> Result<u64> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| query.matches(d)).count() as u64)
            .unwrap_or(0))
    }

    async fn update_by_id(&self, collection: &str, id: &str, patch: Value) -> Result<Option<Value>> {
        let patch = match patch {
            Value::Object(map) => map,
            _ => return Err(anyhow!("Patch must be a JSON object")),
        };

        let mut collections = self.collections.write().await;
        let Some(document) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| id_of(d) == Some(id)))
        else {
            return Ok(None);
        };

        if let Some(object) = document.as_object_mut() {
            for (key, value) in patch {
                if key != "id" {
                    object.insert(key, value);
                }
            }
        }

        Ok(Some(document.clone()))
    }

    async fn save(&self, collection: &str, document: Value) -> Result<Value> {
        let id = id_of(&document)
            .ok_or_else(|| anyhow!("Document has no string id"))?
            .to_string();

        let mut collections = self.collections.write().await;
        let slot = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| id_of(d) == Some(id.as_str())))
            .ok_or_else(|| anyhow!("No {} document with id {}", collection, id))?;

        *slot = document.clone();
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_assigns_id_and_find_by_id_returns_it() {
        let store = InMemoryStore::new();
        let created = store.insert("things", json!({ "name": "a" })).await.unwrap();
        let id = created["id"].as_str().unwrap().to_string();

        let fetched = store.find_by_id("things", &id).await.unwrap().unwrap();
        assert_eq!(fetched["name"], "a");
        assert!(store.find_by_id("things", "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_filters_sorts_and_limits() {
        let store = InMemoryStore::new();
        for (name, rank) in [("c", 3), ("a", 1), ("b", 2), ("z", 9)] {
            let kind = if name == "z" { "other" } else { "letter" };
            store.insert("things", json!({ "name": name, "rank": rank, "kind": kind })).await.unwrap();
        }

        let query = StoreQuery::new().eq("kind", "letter").sort_asc("rank").limit(2);
        let names: Vec<String> = store.find("things", &query).await.unwrap()
            .iter()
            .map(|d| d["name"].as_str().unwrap().to_string())
            .collect();

        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(store.count("things", &StoreQuery::new().eq("kind", "letter")).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn equal_sort_keys_keep_insertion_order() {
        let store = InMemoryStore::new();
        for name in ["first", "second", "third"] {
            store.insert("things", json!({ "name": name, "created_at": "same" })).await.unwrap();
        }

        let found = store.find("things", &StoreQuery::new().sort_asc("created_at")).await.unwrap();
        let names: Vec<&str> = found.iter().map(|d| d["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn update_merges_and_save_replaces() {
        let store = InMemoryStore::new();
        let created = store.insert("things", json!({ "id": "t1", "a": 1, "b": 2 })).await.unwrap();
        assert_eq!(created["id"], "t1");

        let updated = store.update_by_id("things", "t1", json!({ "b": 3, "id": "other" })).await.unwrap().unwrap();
        assert_eq!(updated, json!({ "id": "t1", "a": 1, "b": 3 }));

        store.save("things", json!({ "id": "t1", "c": 4 })).await.unwrap();
        let saved = store.find_by_id("things", "t1").await.unwrap().unwrap();
        assert_eq!(saved, json!({ "id": "t1", "c": 4 }));

        assert!(store.update_by_id("things", "missing", json!({})).await.unwrap().is_none());
        assert!(store.save("things", json!({ "id": "missing" })).await.is_err());
    }
}
