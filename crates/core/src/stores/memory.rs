use crate::error::{RagError, Result};
use crate::models::{AuditEntry, ChunkPayload, Document, HistoryEntry, RetrievedChunk};
use crate::traits::{AuditLog, DocumentStore, HistoryStore, VectorIndex};
use async_trait::async_trait;
use std::sync::RwLock;

struct StoredPoint {
    id: String,
    vector: Vec<f32>,
    payload: ChunkPayload,
    /// Monotonic insertion counter; refreshed on every upsert so the
    /// score tie-break favors the most recent write.
    sequence: u64,
}

/// Brute-force cosine index held in process memory. Used by tests and
/// offline runs; the hot path is identical to the remote index contract,
/// including deterministic tie-breaking by insertion recency.
#[derive(Default)]
pub struct MemoryIndex {
    dimensions: RwLock<Option<usize>>,
    points: RwLock<Vec<StoredPoint>>,
    counter: RwLock<u64>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_sequence(&self) -> u64 {
        let mut counter = self.counter.write().unwrap();
        *counter += 1;
        *counter
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn ensure_collection(&self, dimensions: usize) -> Result<()> {
        let mut current = self.dimensions.write().unwrap();
        match *current {
            None => {
                *current = Some(dimensions);
                Ok(())
            }
            Some(existing) if existing == dimensions => Ok(()),
            Some(existing) => Err(RagError::InvalidArgument(format!(
                "collection exists with width {existing}, requested {dimensions}"
            ))),
        }
    }

    async fn upsert(&self, id: &str, vector: &[f32], payload: &ChunkPayload) -> Result<()> {
        if let Some(expected) = *self.dimensions.read().unwrap() {
            if vector.len() != expected {
                return Err(RagError::InvalidArgument(format!(
                    "vector width {} does not match collection width {expected}",
                    vector.len()
                )));
            }
        }

        let sequence = self.next_sequence();
        let mut points = self.points.write().unwrap();
        points.retain(|point| point.id != id);
        points.push(StoredPoint {
            id: id.to_string(),
            vector: vector.to_vec(),
            payload: payload.clone(),
            sequence,
        });
        Ok(())
    }

    async fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>> {
        let points = self.points.read().unwrap();
        let mut scored: Vec<(f32, u64, RetrievedChunk)> = points
            .iter()
            .map(|point| {
                let score = cosine_similarity(query_vector, &point.vector);
                (
                    score,
                    point.sequence,
                    RetrievedChunk {
                        payload: point.payload.clone(),
                        score,
                    },
                )
            })
            .collect();

        scored.sort_by(|left, right| {
            right
                .0
                .total_cmp(&left.0)
                .then(right.1.cmp(&left.1))
        });

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(_, _, hit)| hit)
            .collect())
    }

    async fn delete_points(&self, ids: &[String]) -> Result<()> {
        let mut points = self.points.write().unwrap();
        points.retain(|point| !ids.contains(&point.id));
        Ok(())
    }
}

/// In-memory relational collaborator covering documents, history, and
/// the audit log. Row semantics mirror the SQLite store: soft-delete
/// filtering, owner scoping, newest-first ordering.
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<Vec<Document>>,
    history: RwLock<Vec<HistoryEntry>>,
    audit: RwLock<Vec<AuditEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.read().unwrap().clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_document(&self, document: &Document) -> Result<()> {
        let mut documents = self.documents.write().unwrap();
        // Same uniqueness rule the SQLite primary key enforces.
        if documents.iter().any(|existing| existing.id == document.id) {
            return Err(RagError::Persistence(format!(
                "document id {} already exists",
                document.id
            )));
        }
        documents.push(document.clone());
        Ok(())
    }

    async fn list_documents(&self, owner_id: &str) -> Result<Vec<Document>> {
        let mut rows: Vec<Document> = self
            .documents
            .read()
            .unwrap()
            .iter()
            .filter(|document| document.owner_id == owner_id && !document.deleted)
            .cloned()
            .collect();
        rows.reverse();
        Ok(rows)
    }

    async fn find_document(&self, document_id: &str) -> Result<Option<Document>> {
        Ok(self
            .documents
            .read()
            .unwrap()
            .iter()
            .find(|document| document.id == document_id)
            .cloned())
    }

    async fn mark_deleted(&self, document_id: &str) -> Result<()> {
        let mut documents = self.documents.write().unwrap();
        for document in documents.iter_mut() {
            if document.id == document_id {
                document.deleted = true;
                document.updated_at = chrono::Utc::now();
            }
        }
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn append(&self, entry: &HistoryEntry) -> Result<()> {
        self.history.write().unwrap().push(entry.clone());
        Ok(())
    }

    async fn recent(&self, owner_id: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        Ok(self
            .history
            .read()
            .unwrap()
            .iter()
            .rev()
            .filter(|entry| entry.owner_id == owner_id && !entry.deleted)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn all_for_owner(&self, owner_id: &str) -> Result<Vec<HistoryEntry>> {
        Ok(self
            .history
            .read()
            .unwrap()
            .iter()
            .rev()
            .filter(|entry| entry.owner_id == owner_id && !entry.deleted)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AuditLog for MemoryStore {
    async fn record(&self, entry: &AuditEntry) -> Result<()> {
        self.audit.write().unwrap().push(entry.clone());
        Ok(())
    }
}
