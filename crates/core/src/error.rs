use thiserror::Error;

/// Failure taxonomy shared by the ingestion and query pipelines.
///
/// Transport errors are mapped at each call site rather than through
/// blanket `From` impls: the same `reqwest::Error` means a different
/// thing coming from the embedding backend than from the vector index.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("pdf extraction failed: {0}")]
    Extraction(String),

    #[error("embedding backend unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("vector index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("answer generation failed: {0}")]
    Generation(String),

    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl RagError {
    /// Pipeline stage name used in failure reports.
    pub fn stage(&self) -> &'static str {
        match self {
            RagError::Extraction(_) => "extraction",
            RagError::EmbeddingUnavailable(_) => "embedding",
            RagError::IndexUnavailable(_) => "index",
            RagError::Generation(_) => "generation",
            RagError::Persistence(_) => "persistence",
            RagError::Io(_) => "io",
            RagError::InvalidArgument(_) => "argument",
        }
    }
}

pub type Result<T, E = RagError> = std::result::Result<T, E>;
