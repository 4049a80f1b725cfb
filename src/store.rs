//! Vector store backends.
//!
//! [`VectorStore`] abstracts the store holding `{text, source_url, vector}`
//! records. [`WeaviateStore`] talks to a hosted Weaviate cluster over its
//! REST API; [`MemoryStore`] keeps records in process for development and
//! tests. Writes are upserts keyed by record id, so re-indexing a page
//! replaces its chunks instead of accumulating copies.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::config::{Config, Secrets, StoreConfig};
use crate::models::StoredRecord;

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Inserts records, replacing any stored record with the same id.
    async fn upsert(&self, records: &[StoredRecord]) -> Result<()>;
    /// Returns every stored record that carries a vector.
    async fn fetch_all(&self) -> Result<Vec<StoredRecord>>;
}

/// Connects the configured store backend.
///
/// The "weaviate" backend reads its cluster URL and credentials from the
/// environment and refuses to start without them. The "memory" backend
/// needs no environment at all.
pub fn connect(config: &Config) -> Result<Box<dyn VectorStore>> {
    match config.store.provider.as_str() {
        "weaviate" => {
            let secrets = Secrets::from_env()?;
            Ok(Box::new(WeaviateStore::new(&config.store, &secrets)?))
        }
        "memory" => Ok(Box::new(MemoryStore::new())),
        other => bail!("Unknown store provider: {}", other),
    }
}

// ============ Weaviate ============

/// Client for a Weaviate cluster's REST API.
///
/// Inserts go through `POST /v1/batch/objects` in batches of
/// `store.batch_size`. Scans page through `GET /v1/objects` with cursor
/// pagination, `store.page_limit` objects per page. The embedding is stored
/// as a plain `vector` property on each object.
pub struct WeaviateStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    collection: String,
    batch_size: usize,
    page_limit: usize,
}

impl WeaviateStore {
    pub fn new(config: &StoreConfig, secrets: &Secrets) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            base_url: secrets.cluster_url.trim_end_matches('/').to_string(),
            api_key: secrets.api_key.clone(),
            collection: config.collection.clone(),
            batch_size: config.batch_size.max(1),
            page_limit: config.page_limit.max(1),
        })
    }
}

#[async_trait]
impl VectorStore for WeaviateStore {
    async fn upsert(&self, records: &[StoredRecord]) -> Result<()> {
        for batch in records.chunks(self.batch_size) {
            let objects: Vec<serde_json::Value> = batch
                .iter()
                .map(|record| {
                    serde_json::json!({
                        "class": self.collection,
                        "id": record.id,
                        "properties": {
                            "text": record.text,
                            "source_url": record.source_url,
                            "vector": record.vector,
                        }
                    })
                })
                .collect();

            let response = self
                .client
                .post(format!("{}/v1/batch/objects", self.base_url))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&serde_json::json!({ "objects": objects }))
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                bail!("Weaviate batch insert failed {}: {}", status, body);
            }
        }

        Ok(())
    }

    async fn fetch_all(&self) -> Result<Vec<StoredRecord>> {
        let mut records = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let limit = self.page_limit.to_string();
            let mut params: Vec<(&str, &str)> =
                vec![("class", self.collection.as_str()), ("limit", limit.as_str())];
            if let Some(cursor) = after.as_deref() {
                params.push(("after", cursor));
            }

            let response = self
                .client
                .get(format!("{}/v1/objects", self.base_url))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .query(&params)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                bail!("Weaviate scan failed {}: {}", status, body);
            }

            let json: serde_json::Value = response.json().await?;
            let objects = json
                .get("objects")
                .and_then(|o| o.as_array())
                .ok_or_else(|| {
                    anyhow::anyhow!("Invalid Weaviate response: missing objects array")
                })?;

            if objects.is_empty() {
                break;
            }

            for object in objects {
                let properties = match object.get("properties") {
                    Some(properties) => properties,
                    None => continue,
                };
                // Objects written by other clients may have no vector
                // property; they cannot be ranked, so skip them.
                let vector_values = match properties.get("vector").and_then(|v| v.as_array()) {
                    Some(values) => values,
                    None => continue,
                };

                let vector: Vec<f32> = vector_values
                    .iter()
                    .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                    .collect();
                let text = properties
                    .get("text")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let source_url = properties
                    .get("source_url")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let id = object
                    .get("id")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();

                records.push(StoredRecord {
                    id,
                    text,
                    source_url,
                    vector,
                });
            }

            if objects.len() < self.page_limit {
                break;
            }
            after = objects
                .last()
                .and_then(|o| o.get("id"))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());
            if after.is_none() {
                break;
            }
        }

        Ok(records)
    }
}

// ============ In-memory ============

/// In-process store backed by a `HashMap` keyed by record id.
pub struct MemoryStore {
    records: RwLock<HashMap<String, StoredRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn upsert(&self, records: &[StoredRecord]) -> Result<()> {
        let mut stored = self.records.write().unwrap();
        for record in records {
            stored.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn fetch_all(&self) -> Result<Vec<StoredRecord>> {
        let stored = self.records.read().unwrap();
        Ok(stored.values().cloned().collect())
    }
}
