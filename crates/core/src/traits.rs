use crate::error::{RagError, Result};
use crate::models::{AuditEntry, ChunkPayload, Document, HistoryEntry, RetrievedChunk};
use async_trait::async_trait;

/// Similarity index keyed by a process-wide collection. Entries reference
/// relational rows but do not own them.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Idempotent bootstrap: create the collection if absent, leave it
    /// untouched if present. A pre-existing collection with a different
    /// width is a fatal configuration mismatch, never a migration.
    async fn ensure_collection(&self, dimensions: usize) -> Result<()>;

    /// Insert or replace the point with this identifier.
    async fn upsert(&self, id: &str, vector: &[f32], payload: &ChunkPayload) -> Result<()>;

    /// Up to `top_k` hits by descending cosine similarity. Ordering must
    /// be deterministic for a fixed index state; ties break toward the
    /// most recently inserted point.
    async fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>>;

    /// Remove points by identifier. Missing identifiers are not an error.
    async fn delete_points(&self, ids: &[String]) -> Result<()>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_document(&self, document: &Document) -> Result<()>;

    /// Rows owned by `owner_id` with the soft-delete flag unset,
    /// newest first.
    async fn list_documents(&self, owner_id: &str) -> Result<Vec<Document>>;

    async fn find_document(&self, document_id: &str) -> Result<Option<Document>>;

    /// Logical deletion; the row is never physically removed.
    async fn mark_deleted(&self, document_id: &str) -> Result<()>;
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persists one exchange; never partially writes.
    async fn append(&self, entry: &HistoryEntry) -> Result<()>;

    /// At most `limit` undeleted entries for the owner, newest first.
    async fn recent(&self, owner_id: &str, limit: usize) -> Result<Vec<HistoryEntry>>;

    /// Every undeleted entry for the owner, newest first.
    async fn all_for_owner(&self, owner_id: &str) -> Result<Vec<HistoryEntry>>;
}

/// Write-only from the pipelines' perspective.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, entry: &AuditEntry) -> Result<()>;
}

/// Chat-style completion over a single system-role message.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system_prompt: &str, max_tokens: u32, temperature: f32)
        -> Result<String>;
}

/// Receives structured reports when a best-effort step (memory append,
/// audit record) fails after the pipeline already produced its result.
pub trait FailureObserver: Send + Sync {
    fn best_effort_failure(&self, pipeline: &'static str, step: &'static str, error: &RagError);
}

/// Default observer: logs through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl FailureObserver for TracingObserver {
    fn best_effort_failure(&self, pipeline: &'static str, step: &'static str, error: &RagError) {
        tracing::warn!(pipeline, step, error = %error, "best-effort step failed");
    }
}
