pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod memory;
pub mod models;
pub mod prompt;
pub mod query;
pub mod router;
pub mod stores;
pub mod synthesizer;
pub mod traits;

pub use chunking::split_text;
pub use embeddings::{Embedder, HashEmbedder, HttpEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{RagError, Result};
pub use extractor::{LopdfExtractor, TextExtractor};
pub use ingest::{
    chunk_point_id, digest_bytes, discover_pdf_files, IngestionPipeline, IngestionReport,
    SkippedPdf,
};
pub use memory::ConversationMemory;
pub use models::{
    valid_or_new_uuid, AuditEntry, ChunkPayload, ChunkingOptions, Document, HistoryEntry,
    RetrievalOptions, RetrievedChunk, RouterOptions, SynthesizerOptions,
};
pub use prompt::{PromptBuilder, NO_CONTEXT_PLACEHOLDER};
pub use query::QueryPipeline;
pub use router::{QueryIntent, QueryRouter};
pub use stores::{MemoryIndex, MemoryStore, QdrantStore, SqliteStore};
pub use synthesizer::{AnswerSynthesizer, OpenAiChatClient};
pub use traits::{
    AuditLog, ChatModel, DocumentStore, FailureObserver, HistoryStore, TracingObserver,
    VectorIndex,
};
