use crate::error::{RagError, Result};
use crate::models::{AuditEntry, Document, HistoryEntry};
use crate::traits::{AuditLog, DocumentStore, HistoryStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;

/// Relational collaborator backed by SQLite through sqlx. Holds the
/// documents, history, and audit_log tables; rows are soft-deleted,
/// never physically removed.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(persistence)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(persistence)?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id           TEXT PRIMARY KEY,
                filename     TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                owner_id     TEXT NOT NULL,
                uploaded_at  TEXT NOT NULL,
                chunk_count  INTEGER NOT NULL DEFAULT 0,
                deleted      INTEGER NOT NULL DEFAULT 0,
                created_at   TEXT NOT NULL,
                updated_at   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS history (
                id            TEXT PRIMARY KEY,
                query_text    TEXT NOT NULL,
                response_text TEXT NOT NULL,
                owner_id      TEXT NOT NULL,
                deleted       INTEGER NOT NULL DEFAULT 0,
                created_at    TEXT NOT NULL,
                updated_at    TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS audit_log (
                id         TEXT PRIMARY KEY,
                action     TEXT NOT NULL,
                owner_id   TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn persistence(error: impl std::fmt::Display) -> RagError {
    RagError::Persistence(error.to_string())
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(persistence)
}

fn document_from_row(row: &SqliteRow) -> Result<Document> {
    Ok(Document {
        id: row.get("id"),
        filename: row.get("filename"),
        content_hash: row.get("content_hash"),
        owner_id: row.get("owner_id"),
        uploaded_at: parse_timestamp(&row.get::<String, _>("uploaded_at"))?,
        chunk_count: row.get::<i64, _>("chunk_count") as u32,
        deleted: row.get::<i64, _>("deleted") != 0,
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at"))?,
    })
}

fn history_from_row(row: &SqliteRow) -> Result<HistoryEntry> {
    Ok(HistoryEntry {
        id: row.get("id"),
        query_text: row.get("query_text"),
        response_text: row.get("response_text"),
        owner_id: row.get("owner_id"),
        deleted: row.get::<i64, _>("deleted") != 0,
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at"))?,
    })
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn insert_document(&self, document: &Document) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, filename, content_hash, owner_id, uploaded_at,
                                   chunk_count, deleted, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&document.id)
        .bind(&document.filename)
        .bind(&document.content_hash)
        .bind(&document.owner_id)
        .bind(document.uploaded_at.to_rfc3339())
        .bind(document.chunk_count as i64)
        .bind(document.deleted as i64)
        .bind(document.created_at.to_rfc3339())
        .bind(document.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(())
    }

    async fn list_documents(&self, owner_id: &str) -> Result<Vec<Document>> {
        let rows = sqlx::query(
            "SELECT * FROM documents WHERE owner_id = ? AND deleted = 0 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        rows.iter().map(document_from_row).collect()
    }

    async fn find_document(&self, document_id: &str) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?;

        row.as_ref().map(document_from_row).transpose()
    }

    async fn mark_deleted(&self, document_id: &str) -> Result<()> {
        sqlx::query("UPDATE documents SET deleted = 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;

        Ok(())
    }
}

#[async_trait]
impl HistoryStore for SqliteStore {
    async fn append(&self, entry: &HistoryEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO history (id, query_text, response_text, owner_id, deleted,
                                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.query_text)
        .bind(&entry.response_text)
        .bind(&entry.owner_id)
        .bind(entry.deleted as i64)
        .bind(entry.created_at.to_rfc3339())
        .bind(entry.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(())
    }

    async fn recent(&self, owner_id: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM history WHERE owner_id = ? AND deleted = 0 \
             ORDER BY created_at DESC LIMIT ?",
        )
        .bind(owner_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        rows.iter().map(history_from_row).collect()
    }

    async fn all_for_owner(&self, owner_id: &str) -> Result<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM history WHERE owner_id = ? AND deleted = 0 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        rows.iter().map(history_from_row).collect()
    }
}

#[async_trait]
impl AuditLog for SqliteStore {
    async fn record(&self, entry: &AuditEntry) -> Result<()> {
        sqlx::query("INSERT INTO audit_log (id, action, owner_id, created_at) VALUES (?, ?, ?, ?)")
            .bind(&entry.id)
            .bind(&entry.action)
            .bind(&entry.owner_id)
            .bind(entry.created_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(persistence)?;

        Ok(())
    }
}
