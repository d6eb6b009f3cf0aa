use chrono::Utc;
use clap::{Parser, Subcommand};
use pdf_rag_core::{
    AnswerSynthesizer, ChunkingOptions, ConversationMemory, Embedder, HashEmbedder, HttpEmbedder,
    IngestionPipeline, LopdfExtractor, OpenAiChatClient, QdrantStore, QueryPipeline, QueryRouter,
    RetrievalOptions, RouterOptions, SqliteStore, SynthesizerOptions, TracingObserver,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-rag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Qdrant base URL
    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6333")]
    qdrant_url: String,

    /// Qdrant collection
    #[arg(long, default_value = "documents")]
    qdrant_collection: String,

    /// SQLite database file
    #[arg(long, default_value = "data/pdf_rag.db")]
    db_path: PathBuf,

    /// OpenAI-compatible embeddings endpoint
    #[arg(long, env = "EMBEDDING_URL", default_value = "http://localhost:8080")]
    embedding_url: String,

    /// Embedding model name
    #[arg(long, default_value = "all-MiniLM-L6-v2")]
    embedding_model: String,

    /// API key for the embeddings endpoint
    #[arg(long, env = "EMBEDDING_API_KEY")]
    embedding_api_key: Option<String>,

    /// Embedding vector width
    #[arg(long, default_value = "384")]
    embedding_dimensions: usize,

    /// Use the deterministic in-process embedder instead of the HTTP one
    #[arg(long)]
    hash_embeddings: bool,

    /// OpenAI-compatible chat endpoint
    #[arg(long, env = "LLM_URL", default_value = "https://api.openai.com")]
    llm_url: String,

    /// Chat model name
    #[arg(long, default_value = "gpt-4o-mini")]
    llm_model: String,

    /// API key for the chat endpoint
    #[arg(long, env = "OPENAI_API_KEY")]
    llm_api_key: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest one PDF file.
    Ingest {
        /// Path to the PDF.
        #[arg(long)]
        file: PathBuf,
        /// Owning user identifier.
        #[arg(long)]
        owner: String,
        /// Document identifier to use; regenerated when not a UUID.
        #[arg(long)]
        document_id: Option<String>,
    },
    /// Ingest every PDF found recursively under a folder.
    IngestFolder {
        /// Folder that contains PDFs recursively.
        #[arg(long)]
        folder: PathBuf,
        /// Owning user identifier.
        #[arg(long)]
        owner: String,
    },
    /// Ask a question over the owner's indexed documents.
    Query {
        /// Natural-language question.
        #[arg(long)]
        text: String,
        /// Owning user identifier.
        #[arg(long)]
        owner: String,
    },
    /// List the owner's documents.
    Documents {
        #[arg(long)]
        owner: String,
    },
    /// List the owner's query history, newest first.
    History {
        #[arg(long)]
        owner: String,
    },
    /// Remove a document's index points and mark its row deleted.
    Purge {
        #[arg(long)]
        document_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    // Collaborators are constructed once here and shared across the
    // pipelines for the life of the process.
    let embedder: Arc<dyn Embedder> = if cli.hash_embeddings {
        Arc::new(HashEmbedder {
            dimensions: cli.embedding_dimensions,
        })
    } else {
        Arc::new(HttpEmbedder::new(
            &cli.embedding_url,
            &cli.embedding_model,
            cli.embedding_api_key.clone(),
            cli.embedding_dimensions,
        ))
    };

    let index = Arc::new(QdrantStore::new(
        &cli.qdrant_url,
        &cli.qdrant_collection,
        cli.embedding_dimensions,
    ));

    let store = Arc::new(SqliteStore::connect(&cli.db_path).await?);
    store.migrate().await?;

    let chat = Arc::new(OpenAiChatClient::new(
        &cli.llm_url,
        &cli.llm_model,
        cli.llm_api_key.clone(),
    ));

    let observer = Arc::new(TracingObserver);

    let ingestion = IngestionPipeline::new(
        Arc::new(LopdfExtractor),
        embedder.clone(),
        index.clone(),
        store.clone(),
        store.clone(),
        observer.clone(),
        ChunkingOptions::default(),
    );

    let queries = QueryPipeline::new(
        embedder.clone(),
        index.clone(),
        ConversationMemory::new(store.clone()),
        store.clone(),
        observer,
        QueryRouter::new(RouterOptions::default()),
        AnswerSynthesizer::new(chat, SynthesizerOptions::default()),
        RetrievalOptions::default(),
    );

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "pdf-rag boot"
    );

    ingestion.bootstrap().await?;

    match cli.command {
        Command::Ingest {
            file,
            owner,
            document_id,
        } => {
            let bytes = tokio::fs::read(&file).await?;
            let filename = file
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| anyhow::anyhow!("path has no file name: {}", file.display()))?;

            let document = ingestion
                .ingest_with_id(&bytes, filename, &owner, document_id.as_deref())
                .await?;
            println!(
                "ingested document_id={} filename={} chunks={}",
                document.id, document.filename, document.chunk_count
            );
        }
        Command::IngestFolder { folder, owner } => {
            let report = ingestion.ingest_folder(&folder, &owner).await?;

            if !report.skipped_files.is_empty() {
                warn!(
                    "skipped_files={} for folder={}",
                    report.skipped_files.len(),
                    folder.display()
                );
                for skipped in &report.skipped_files {
                    warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped pdf");
                }
            }

            println!(
                "{} documents ingested at {}",
                report.documents.len(),
                Utc::now().to_rfc3339()
            );
            for document in report.documents {
                println!(
                    "  document_id={} filename={} chunks={}",
                    document.id, document.filename, document.chunk_count
                );
            }
        }
        Command::Query { text, owner } => {
            let answer = queries.query(&text, &owner).await?;
            println!("{answer}");
        }
        Command::Documents { owner } => {
            for document in ingestion.list_documents(&owner).await? {
                println!(
                    "document_id={} filename={} uploaded_at={} chunks={}",
                    document.id,
                    document.filename,
                    document.uploaded_at.to_rfc3339(),
                    document.chunk_count
                );
            }
        }
        Command::History { owner } => {
            for entry in queries.list_history(&owner).await? {
                println!(
                    "[{}] q: {}\n  a: {}",
                    entry.created_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.query_text,
                    entry.response_text
                );
            }
        }
        Command::Purge { document_id } => {
            let document = ingestion.purge_document(&document_id).await?;
            println!(
                "purged document_id={} filename={}",
                document.id, document.filename
            );
        }
    }

    Ok(())
}
