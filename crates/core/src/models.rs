use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata row for one uploaded file. Deletion is logical: the row stays,
/// `deleted` flips. Index points for the document are removed only by an
/// explicit purge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub filename: String,
    pub content_hash: String,
    pub owner_id: String,
    pub uploaded_at: DateTime<Utc>,
    /// How many index points this document owns; lets a purge enumerate
    /// its point identifiers without a reverse lookup in the index.
    pub chunk_count: u32,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(filename: impl Into<String>, content_hash: impl Into<String>, owner_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            filename: filename.into(),
            content_hash: content_hash.into(),
            owner_id: owner_id.into(),
            uploaded_at: now,
            chunk_count: 0,
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One query/response exchange. Append-only; read back newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub query_text: String,
    pub response_text: String,
    pub owner_id: String,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(query_text: impl Into<String>, response_text: impl Into<String>, owner_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            query_text: query_text.into(),
            response_text: response_text.into(),
            owner_id: owner_id.into(),
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Immutable record of a side-effecting action. Write-only from the
/// pipelines' perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub action: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(action: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            action: action.into(),
            owner_id: owner_id.into(),
            created_at: Utc::now(),
        }
    }
}

/// Fixed-shape payload stored alongside each vector point. Chunks of one
/// document share `filename` and `owner_id` and differ in `chunk_index`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkPayload {
    pub text: String,
    pub filename: String,
    pub owner_id: String,
    pub uploaded_at: DateTime<Utc>,
    pub chunk_index: u64,
}

/// One similarity-search hit, ranked by descending cosine score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub payload: ChunkPayload,
    pub score: f32,
}

/// Parameters for the recursive separator splitter.
#[derive(Debug, Clone)]
pub struct ChunkingOptions {
    pub max_chars: usize,
    pub overlap_chars: usize,
    /// Coarsest first; the final empty string falls back to raw
    /// character windows.
    pub separators: Vec<String>,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            max_chars: 1_000,
            overlap_chars: 200,
            separators: vec![
                "\n\n".to_string(),
                "\n".to_string(),
                " ".to_string(),
                String::new(),
            ],
        }
    }
}

/// Retrieval-side tunables for the query pipeline. The collection name
/// is the vector index's own configuration, not a per-query knob.
#[derive(Debug, Clone)]
pub struct RetrievalOptions {
    pub top_k: usize,
    pub history_depth: usize,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            history_depth: 10,
        }
    }
}

/// Keyword set denoting temporal intent. A configuration value rather
/// than a constant so non-English deployments can supply their own set.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub date_keywords: Vec<String>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            date_keywords: [
                "date", "when", "day", "moment", "fecha", "cuándo", "día", "momento",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
        }
    }
}

/// Generation budget per intent: content answers carry retrieved context
/// and get the larger budget.
#[derive(Debug, Clone)]
pub struct SynthesizerOptions {
    pub temperature: f32,
    pub date_max_tokens: u32,
    pub content_max_tokens: u32,
}

impl Default for SynthesizerOptions {
    fn default() -> Self {
        Self {
            temperature: 0.6,
            date_max_tokens: 120,
            content_max_tokens: 200,
        }
    }
}

/// Accept a caller-supplied identifier only if it parses as a UUID;
/// otherwise generate a fresh one.
pub fn valid_or_new_uuid(candidate: &str) -> String {
    match Uuid::parse_str(candidate) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => Uuid::new_v4().to_string(),
    }
}
