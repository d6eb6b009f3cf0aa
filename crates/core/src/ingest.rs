use crate::chunking::split_text;
use crate::embeddings::Embedder;
use crate::error::{RagError, Result};
use crate::extractor::TextExtractor;
use crate::models::{valid_or_new_uuid, AuditEntry, ChunkPayload, ChunkingOptions, Document};
use crate::traits::{AuditLog, DocumentStore, FailureObserver, VectorIndex};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Deterministic point identifier for one chunk of one document, in
/// UUID text form so any index backend accepts it. Re-ingesting the same
/// document id overwrites the same points.
pub fn chunk_point_id(document_id: &str, chunk_index: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_id.as_bytes());
    hasher.update(chunk_index.to_le_bytes());
    let digest = hasher.finalize();

    let hex: String = digest.iter().take(16).map(|byte| format!("{byte:02x}")).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

pub struct SkippedPdf {
    pub path: PathBuf,
    pub reason: String,
}

pub struct IngestionReport {
    pub documents: Vec<Document>,
    pub skipped_files: Vec<SkippedPdf>,
}

pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

/// Upload-to-index pipeline: extract text, chunk it, embed and upsert
/// each chunk strictly in sequence, then persist the document row and
/// write one audit entry.
///
/// Consistency model: at-least-once index writes with idempotent
/// upserts, no two-phase commit. The document row is committed only
/// after every chunk landed in the index, so a mid-chunk failure leaves
/// no document visible; points written before the failure are removed
/// best-effort.
pub struct IngestionPipeline {
    extractor: Arc<dyn TextExtractor>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    documents: Arc<dyn DocumentStore>,
    audit: Arc<dyn AuditLog>,
    observer: Arc<dyn FailureObserver>,
    chunking: ChunkingOptions,
}

impl IngestionPipeline {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        documents: Arc<dyn DocumentStore>,
        audit: Arc<dyn AuditLog>,
        observer: Arc<dyn FailureObserver>,
        chunking: ChunkingOptions,
    ) -> Self {
        Self {
            extractor,
            embedder,
            index,
            documents,
            audit,
            observer,
            chunking,
        }
    }

    /// Idempotent collection bootstrap with the embedder's vector width.
    pub async fn bootstrap(&self) -> Result<()> {
        self.index.ensure_collection(self.embedder.dimensions()).await
    }

    pub async fn ingest(&self, bytes: &[u8], filename: &str, owner_id: &str) -> Result<Document> {
        self.ingest_with_id(bytes, filename, owner_id, None).await
    }

    /// Like [`ingest`](Self::ingest), with a caller-supplied document
    /// identifier. The identifier is kept only if it parses as a UUID;
    /// a malformed one is silently replaced with a fresh id, and an id
    /// that already names a document is rejected.
    pub async fn ingest_with_id(
        &self,
        bytes: &[u8],
        filename: &str,
        owner_id: &str,
        document_id: Option<&str>,
    ) -> Result<Document> {
        let text = self.extractor.extract(bytes)?;
        let chunks = split_text(&text, &self.chunking);

        let mut document = Document::new(filename, digest_bytes(bytes), owner_id);
        if let Some(candidate) = document_id {
            document.id = valid_or_new_uuid(candidate);
            // A supplied id may collide with a live document whose points
            // share the same deterministic identifiers; refusing here keeps
            // that document's index entries intact.
            if self.documents.find_document(&document.id).await?.is_some() {
                return Err(RagError::InvalidArgument(format!(
                    "document {} already exists",
                    document.id
                )));
            }
        }
        document.chunk_count = chunks.len() as u32;

        let (written, outcome) = self.embed_and_upsert(&document, &chunks).await;
        if let Err(error) = outcome {
            self.rollback_points(&written).await;
            return Err(error);
        }

        if let Err(error) = self.documents.insert_document(&document).await {
            self.rollback_points(&written).await;
            return Err(error);
        }

        tracing::info!(
            document_id = %document.id,
            filename,
            chunks = chunks.len(),
            "document ingested"
        );

        let entry = AuditEntry::new(
            format!("document '{}' ingested ({} chunks)", filename, chunks.len()),
            owner_id,
        );
        if let Err(error) = self.audit.record(&entry).await {
            self.observer.best_effort_failure("ingest", "audit", &error);
        }

        Ok(document)
    }

    /// Recursively ingest every PDF under `folder`, skipping unreadable
    /// files instead of aborting the batch.
    pub async fn ingest_folder(&self, folder: &Path, owner_id: &str) -> Result<IngestionReport> {
        let files = discover_pdf_files(folder);
        if files.is_empty() {
            return Err(RagError::InvalidArgument(format!(
                "no pdf files found in {}",
                folder.display()
            )));
        }

        let mut documents = Vec::new();
        let mut skipped_files = Vec::new();

        for path in files {
            let filename = match path.file_name().and_then(|name| name.to_str()) {
                Some(name) => name.to_string(),
                None => {
                    skipped_files.push(SkippedPdf {
                        path,
                        reason: "path has no file name".to_string(),
                    });
                    continue;
                }
            };

            let outcome = async {
                let bytes = tokio::fs::read(&path).await?;
                self.ingest(&bytes, &filename, owner_id).await
            }
            .await;

            match outcome {
                Ok(document) => documents.push(document),
                Err(error) => skipped_files.push(SkippedPdf {
                    path,
                    reason: error.to_string(),
                }),
            }
        }

        Ok(IngestionReport {
            documents,
            skipped_files,
        })
    }

    pub async fn list_documents(&self, owner_id: &str) -> Result<Vec<Document>> {
        self.documents.list_documents(owner_id).await
    }

    /// Removes the document's index points and marks the row deleted.
    /// This is the only code path that touches index entries after
    /// ingestion; plain soft-deletion leaves the index alone.
    pub async fn purge_document(&self, document_id: &str) -> Result<Document> {
        let document = self
            .documents
            .find_document(document_id)
            .await?
            .ok_or_else(|| {
                RagError::InvalidArgument(format!("unknown document: {document_id}"))
            })?;

        let ids: Vec<String> = (0..u64::from(document.chunk_count))
            .map(|index| chunk_point_id(&document.id, index))
            .collect();
        self.index.delete_points(&ids).await?;
        self.documents.mark_deleted(&document.id).await?;

        let entry = AuditEntry::new(
            format!("document '{}' purged", document.filename),
            &document.owner_id,
        );
        if let Err(error) = self.audit.record(&entry).await {
            self.observer.best_effort_failure("ingest", "audit", &error);
        }

        Ok(document)
    }

    /// Strictly sequential per-chunk loop: embed, then upsert, one chunk
    /// at a time. Bounds memory; a failure returns the identifiers
    /// already written so the caller can clean them up.
    async fn embed_and_upsert(
        &self,
        document: &Document,
        chunks: &[String],
    ) -> (Vec<String>, Result<()>) {
        let mut written = Vec::with_capacity(chunks.len());

        for (index, chunk) in chunks.iter().enumerate() {
            let chunk_index = index as u64;

            let vector = match self.embedder.embed(chunk).await {
                Ok(vector) => vector,
                Err(error) => return (written, Err(error)),
            };

            let payload = ChunkPayload {
                text: chunk.clone(),
                filename: document.filename.clone(),
                owner_id: document.owner_id.clone(),
                uploaded_at: document.uploaded_at,
                chunk_index,
            };

            let point_id = chunk_point_id(&document.id, chunk_index);
            if let Err(error) = self.index.upsert(&point_id, &vector, &payload).await {
                return (written, Err(error));
            }
            written.push(point_id);
        }

        (written, Ok(()))
    }

    async fn rollback_points(&self, written: &[String]) {
        if written.is_empty() {
            return;
        }
        if let Err(error) = self.index.delete_points(written).await {
            self.observer.best_effort_failure("ingest", "rollback", &error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashEmbedder;
    use crate::models::RetrievedChunk;
    use crate::stores::{MemoryIndex, MemoryStore};
    use crate::traits::TracingObserver;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Test extractor: the upload bytes are already plain text.
    struct PlainTextExtractor;

    impl TextExtractor for PlainTextExtractor {
        fn extract(&self, bytes: &[u8]) -> Result<String> {
            String::from_utf8(bytes.to_vec())
                .map_err(|error| RagError::Extraction(error.to_string()))
        }
    }

    /// Index wrapper that fails the n-th upsert with `IndexUnavailable`.
    struct FlakyIndex {
        inner: MemoryIndex,
        fail_on_upsert: usize,
        upserts: AtomicUsize,
    }

    #[async_trait]
    impl VectorIndex for FlakyIndex {
        async fn ensure_collection(&self, dimensions: usize) -> Result<()> {
            self.inner.ensure_collection(dimensions).await
        }

        async fn upsert(&self, id: &str, vector: &[f32], payload: &ChunkPayload) -> Result<()> {
            let call = self.upserts.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fail_on_upsert {
                return Err(RagError::IndexUnavailable("injected outage".to_string()));
            }
            self.inner.upsert(id, vector, payload).await
        }

        async fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>> {
            self.inner.search(query_vector, top_k).await
        }

        async fn delete_points(&self, ids: &[String]) -> Result<()> {
            self.inner.delete_points(ids).await
        }
    }

    fn pipeline_with_index(
        index: Arc<dyn VectorIndex>,
        store: Arc<MemoryStore>,
        chunking: ChunkingOptions,
    ) -> IngestionPipeline {
        IngestionPipeline::new(
            Arc::new(PlainTextExtractor),
            Arc::new(HashEmbedder { dimensions: 64 }),
            index,
            store.clone(),
            store,
            Arc::new(TracingObserver),
            chunking,
        )
    }

    fn small_chunking() -> ChunkingOptions {
        ChunkingOptions {
            max_chars: 40,
            overlap_chars: 8,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn ingested_document_is_listed_undeleted() {
        let store = Arc::new(MemoryStore::new());
        let index = Arc::new(MemoryIndex::new());
        let pipeline = pipeline_with_index(index.clone(), store.clone(), small_chunking());
        pipeline.bootstrap().await.unwrap();

        let text = "a report about hydraulic pumps, their pressure limits, and maintenance";
        let document = pipeline
            .ingest(text.as_bytes(), "report.pdf", "user-1")
            .await
            .unwrap();

        let listed = pipeline.list_documents("user-1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, document.id);
        assert!(!listed[0].deleted);
        assert!(listed[0].chunk_count >= 1);

        // The indexed chunks resolve back to this document's payload.
        let probe = HashEmbedder { dimensions: 64 }.embed(text).await.unwrap();
        let hits = index.search(&probe, 3).await.unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].payload.filename, "report.pdf");
        assert_eq!(hits[0].payload.owner_id, "user-1");
    }

    #[tokio::test]
    async fn audit_entry_names_filename_and_chunk_count() {
        let store = Arc::new(MemoryStore::new());
        let pipeline =
            pipeline_with_index(Arc::new(MemoryIndex::new()), store.clone(), small_chunking());
        pipeline.bootstrap().await.unwrap();

        let document = pipeline
            .ingest(b"short text", "notes.pdf", "user-1")
            .await
            .unwrap();

        let entries = store.audit_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].action,
            format!("document 'notes.pdf' ingested ({} chunks)", document.chunk_count)
        );
    }

    #[tokio::test]
    async fn mid_chunk_index_outage_leaves_no_document_and_no_points() {
        let store = Arc::new(MemoryStore::new());
        let flaky = Arc::new(FlakyIndex {
            inner: MemoryIndex::new(),
            fail_on_upsert: 2,
            upserts: AtomicUsize::new(0),
        });
        let pipeline = pipeline_with_index(flaky.clone(), store.clone(), small_chunking());
        pipeline.bootstrap().await.unwrap();

        // Long enough for at least three chunks at max_chars = 40.
        let text = "one two three four five six seven eight nine ten eleven twelve \
                    thirteen fourteen fifteen sixteen seventeen eighteen nineteen twenty";
        let result = pipeline.ingest(text.as_bytes(), "big.pdf", "user-1").await;
        assert!(matches!(result, Err(RagError::IndexUnavailable(_))));

        // Document row is committed only after the full chunk loop.
        assert!(pipeline.list_documents("user-1").await.unwrap().is_empty());

        // The first chunk's point was rolled back.
        let probe = HashEmbedder { dimensions: 64 }.embed("one two three").await.unwrap();
        assert!(flaky.search(&probe, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn embedding_outage_aborts_the_ingestion() {
        struct DownEmbedder;

        #[async_trait]
        impl Embedder for DownEmbedder {
            fn dimensions(&self) -> usize {
                64
            }
            async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
                Err(RagError::EmbeddingUnavailable("model offline".to_string()))
            }
        }

        let store = Arc::new(MemoryStore::new());
        let pipeline = IngestionPipeline::new(
            Arc::new(PlainTextExtractor),
            Arc::new(DownEmbedder),
            Arc::new(MemoryIndex::new()),
            store.clone(),
            store.clone(),
            Arc::new(TracingObserver),
            small_chunking(),
        );

        let result = pipeline.ingest(b"some text", "a.pdf", "user-1").await;
        assert!(matches!(result, Err(RagError::EmbeddingUnavailable(_))));
        assert!(store.list_documents("user-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn purge_removes_points_and_soft_deletes_the_row() {
        let store = Arc::new(MemoryStore::new());
        let index = Arc::new(MemoryIndex::new());
        let pipeline = pipeline_with_index(index.clone(), store.clone(), small_chunking());
        pipeline.bootstrap().await.unwrap();

        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu";
        let document = pipeline
            .ingest(text.as_bytes(), "greek.pdf", "user-1")
            .await
            .unwrap();

        pipeline.purge_document(&document.id).await.unwrap();

        assert!(pipeline.list_documents("user-1").await.unwrap().is_empty());
        let probe = HashEmbedder { dimensions: 64 }.embed("alpha beta gamma").await.unwrap();
        assert!(index.search(&probe, 10).await.unwrap().is_empty());
        // Logical deletion only: the row is still there.
        assert!(store.find_document(&document.id).await.unwrap().unwrap().deleted);
    }

    #[tokio::test]
    async fn supplied_document_id_is_kept_only_when_well_formed() {
        let store = Arc::new(MemoryStore::new());
        let pipeline =
            pipeline_with_index(Arc::new(MemoryIndex::new()), store.clone(), small_chunking());
        pipeline.bootstrap().await.unwrap();

        let kept = pipeline
            .ingest_with_id(
                b"some text",
                "a.pdf",
                "user-1",
                Some("ab68d2f3-31f8-4cc6-9d9c-1f7a40b1a2f3"),
            )
            .await
            .unwrap();
        assert_eq!(kept.id, "ab68d2f3-31f8-4cc6-9d9c-1f7a40b1a2f3");

        let replaced = pipeline
            .ingest_with_id(b"other text", "b.pdf", "user-1", Some("not-a-uuid"))
            .await
            .unwrap();
        assert_ne!(replaced.id, "not-a-uuid");
    }

    #[tokio::test]
    async fn reingesting_a_live_document_id_is_rejected_and_keeps_its_points() {
        let store = Arc::new(MemoryStore::new());
        let index = Arc::new(MemoryIndex::new());
        let pipeline = pipeline_with_index(index.clone(), store.clone(), small_chunking());
        pipeline.bootstrap().await.unwrap();

        let id = "ab68d2f3-31f8-4cc6-9d9c-1f7a40b1a2f3";
        let text = "hydraulic pump maintenance schedule and pressure limits";
        pipeline
            .ingest_with_id(text.as_bytes(), "pumps.pdf", "user-1", Some(id))
            .await
            .unwrap();

        let second = pipeline
            .ingest_with_id(b"an unrelated report", "other.pdf", "user-1", Some(id))
            .await;
        assert!(matches!(second, Err(RagError::InvalidArgument(_))));

        // The live document is untouched: still listed, points still
        // resolvable through the index.
        let listed = pipeline.list_documents("user-1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
        assert_eq!(listed[0].filename, "pumps.pdf");

        let probe = HashEmbedder { dimensions: 64 }.embed(text).await.unwrap();
        let hits = index.search(&probe, 5).await.unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].payload.filename, "pumps.pdf");
    }

    #[test]
    fn point_ids_are_deterministic_and_distinct_per_chunk() {
        let first = chunk_point_id("doc-1", 0);
        assert_eq!(first, chunk_point_id("doc-1", 0));
        assert_ne!(first, chunk_point_id("doc-1", 1));
        assert_ne!(first, chunk_point_id("doc-2", 0));
        assert_eq!(first.len(), 36);
    }
}
