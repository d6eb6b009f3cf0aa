use crate::error::{RagError, Result};
use crate::models::{ChunkPayload, RetrievedChunk};
use crate::traits::VectorIndex;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// Vector index backed by the Qdrant HTTP API.
pub struct QdrantStore {
    endpoint: String,
    collection: String,
    client: Client,
    vector_size: usize,
}

impl QdrantStore {
    pub fn new(
        endpoint: impl Into<String>,
        collection: impl Into<String>,
        vector_size: usize,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            collection: collection.into(),
            client: Client::new(),
            vector_size,
        }
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!(
            "{}/collections/{}{}",
            self.endpoint.trim_end_matches('/'),
            self.collection,
            suffix
        )
    }
}

fn transport(error: reqwest::Error) -> RagError {
    RagError::IndexUnavailable(error.to_string())
}

#[async_trait]
impl VectorIndex for QdrantStore {
    async fn ensure_collection(&self, dimensions: usize) -> Result<()> {
        if self.vector_size != dimensions {
            return Err(RagError::InvalidArgument(format!(
                "store configured for width {}, requested {dimensions}",
                self.vector_size
            )));
        }

        let existing = self
            .client
            .get(self.collection_url(""))
            .send()
            .await
            .map_err(transport)?;

        if existing.status().is_success() {
            let parsed: Value = existing.json().await.map_err(transport)?;
            let size = parsed
                .pointer("/result/config/params/vectors/size")
                .and_then(Value::as_u64);
            // Never migrate a collection in place: a width mismatch is a
            // configuration error the operator has to resolve.
            if let Some(size) = size {
                if size as usize != dimensions {
                    return Err(RagError::InvalidArgument(format!(
                        "collection '{}' exists with width {size}, requested {dimensions}",
                        self.collection
                    )));
                }
            }
            return Ok(());
        }

        if existing.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(RagError::IndexUnavailable(format!(
                "collection probe returned {}",
                existing.status()
            )));
        }

        let created = self
            .client
            .put(self.collection_url(""))
            .json(&json!({
                "vectors": { "size": dimensions, "distance": "Cosine" },
            }))
            .send()
            .await
            .map_err(transport)?;

        if !created.status().is_success() {
            return Err(RagError::IndexUnavailable(format!(
                "collection create returned {}",
                created.status()
            )));
        }

        Ok(())
    }

    async fn upsert(&self, id: &str, vector: &[f32], payload: &ChunkPayload) -> Result<()> {
        if vector.len() != self.vector_size {
            return Err(RagError::InvalidArgument(format!(
                "vector width {} does not match configured {}",
                vector.len(),
                self.vector_size
            )));
        }

        let response = self
            .client
            .put(self.collection_url("/points?wait=true"))
            .json(&json!({
                "points": [{
                    "id": id,
                    "vector": vector,
                    "payload": payload,
                }],
            }))
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(RagError::IndexUnavailable(format!(
                "point upsert returned {}",
                response.status()
            )));
        }

        Ok(())
    }

    async fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>> {
        if query_vector.len() != self.vector_size {
            return Err(RagError::InvalidArgument(format!(
                "query vector width {} does not match configured {}",
                query_vector.len(),
                self.vector_size
            )));
        }

        let response = self
            .client
            .post(self.collection_url("/points/search"))
            .json(&json!({
                "vector": query_vector,
                "limit": top_k,
                "with_payload": true,
            }))
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(RagError::IndexUnavailable(format!(
                "point search returned {}",
                response.status()
            )));
        }

        let parsed: Value = response.json().await.map_err(transport)?;
        let hits = parsed
            .pointer("/result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut result = Vec::with_capacity(hits.len());
        for hit in hits {
            let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0) as f32;
            let payload = hit
                .pointer("/payload")
                .cloned()
                .ok_or_else(|| {
                    RagError::IndexUnavailable("search hit carried no payload".to_string())
                })?;
            let payload: ChunkPayload = serde_json::from_value(payload).map_err(|error| {
                RagError::IndexUnavailable(format!("malformed point payload: {error}"))
            })?;

            result.push(RetrievedChunk { payload, score });
        }

        Ok(result)
    }

    async fn delete_points(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .post(self.collection_url("/points/delete?wait=true"))
            .json(&json!({ "points": ids }))
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(RagError::IndexUnavailable(format!(
                "point delete returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}
