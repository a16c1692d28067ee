//! Embedded SQLite backend
//!
//! Keeps the node table in a local database file. Handy for offline use
//! and for exercising the sync commands without a server.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use super::{check_slug, Listed, RemoteStore, StoreError, DOCUMENT_TYPE};
use crate::domain::{AccessLevel, Document, DocumentStatus, Metadata};

const COLUMNS: &str = "slug, title, content, status, access_level, metadata, published_at";

/// Row as stored, before enum and JSON parsing
struct RawRow {
    slug: String,
    title: String,
    content: String,
    status: String,
    access_level: String,
    metadata: String,
    published_at: Option<String>,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            slug: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            status: row.get(3)?,
            access_level: row.get(4)?,
            metadata: row.get(5)?,
            published_at: row.get(6)?,
        })
    }

    fn into_document(self) -> Result<Document, StoreError> {
        let corrupt = |reason: String| StoreError::CorruptRow {
            slug: self.slug.clone(),
            reason,
        };

        let status = self.status.parse::<DocumentStatus>().map_err(corrupt)?;
        let access_level = self.access_level.parse::<AccessLevel>().map_err(corrupt)?;
        let metadata: serde_json::Value =
            serde_json::from_str(&self.metadata).map_err(|e| corrupt(e.to_string()))?;
        let published_at = self
            .published_at
            .as_deref()
            .map(|s| DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc)))
            .transpose()
            .map_err(|e| corrupt(e.to_string()))?;

        Ok(Document {
            slug: self.slug,
            title: self.title,
            body: self.content,
            status,
            access_level,
            published_at,
            metadata: Metadata::from_json(&metadata),
        })
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Maps unique-constraint failures to `Conflict`
fn write_error(err: rusqlite::Error, slug: &str) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            StoreError::Conflict(slug.to_string())
        }
        _ => StoreError::Sqlite(err),
    }
}

/// SQLite-backed remote store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Schema version - bump when the table layout changes
    const SCHEMA_VERSION: i32 = 1;

    /// Opens (or creates) the database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::with_connection(conn)
    }

    /// Opens a private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        Self::ensure_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn ensure_schema(conn: &Connection) -> Result<(), StoreError> {
        let version: i32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .optional()?
            .unwrap_or(0);

        if version >= Self::SCHEMA_VERSION {
            return Ok(());
        }

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS node (
                id TEXT PRIMARY KEY,
                type TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                status TEXT NOT NULL,
                access_level TEXT NOT NULL,
                metadata TEXT NOT NULL,
                published_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_node_type_created ON node(type, created_at);
            ",
        )?;

        conn.pragma_update(None, "user_version", Self::SCHEMA_VERSION)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Connection("SQLite connection lock poisoned".to_string()))
    }

    fn find_one(conn: &Connection, slug: &str) -> Result<Option<Document>, StoreError> {
        let raw = conn
            .query_row(
                &format!("SELECT {} FROM node WHERE type = ?1 AND slug = ?2", COLUMNS),
                params![DOCUMENT_TYPE, slug],
                RawRow::from_row,
            )
            .optional()?;

        raw.map(RawRow::into_document).transpose()
    }

    /// Overwrites one stored column as text, bypassing all checks
    #[cfg(test)]
    pub(crate) fn set_raw(&self, slug: &str, column: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            &format!("UPDATE node SET {} = ?1 WHERE slug = ?2", column),
            params![value, slug],
        )?;
        Ok(())
    }

    fn fetch(conn: &Connection, slug: &str) -> Result<Document, StoreError> {
        Self::find_one(conn, slug)?.ok_or_else(|| StoreError::NotFound(slug.to_string()))
    }
}

#[async_trait]
impl RemoteStore for SqliteStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Document>, StoreError> {
        let conn = self.lock()?;
        Self::find_one(&conn, slug)
    }

    async fn find_all(&self, slug: Option<&str>) -> Result<Vec<Listed>, StoreError> {
        let conn = self.lock()?;

        let sql = format!(
            "SELECT {} FROM node WHERE type = ?1 AND (?2 IS NULL OR slug = ?2)
             ORDER BY created_at DESC, rowid DESC",
            COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![DOCUMENT_TYPE, slug], RawRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows.into_iter().map(RawRow::into_document).collect())
    }

    async fn create(&self, document: &Document) -> Result<Document, StoreError> {
        check_slug(&document.slug)?;
        let conn = self.lock()?;
        let now = timestamp(Utc::now());

        conn.execute(
            "INSERT INTO node (id, type, slug, title, content, status, access_level,
                               metadata, published_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            params![
                uuid::Uuid::new_v4().to_string(),
                DOCUMENT_TYPE,
                document.slug,
                document.title,
                document.body,
                document.status.as_str(),
                document.access_level.as_str(),
                document.metadata.to_json().to_string(),
                document.published_at.map(timestamp),
                now,
            ],
        )
        .map_err(|e| write_error(e, &document.slug))?;

        Self::fetch(&conn, &document.slug)
    }

    async fn update(&self, slug: &str, document: &Document) -> Result<Document, StoreError> {
        check_slug(&document.slug)?;
        let conn = self.lock()?;

        let changed = conn
            .execute(
                "UPDATE node SET slug = ?1, title = ?2, content = ?3, status = ?4,
                                 access_level = ?5, metadata = ?6, published_at = ?7,
                                 updated_at = ?8
                 WHERE type = ?9 AND slug = ?10",
                params![
                    document.slug,
                    document.title,
                    document.body,
                    document.status.as_str(),
                    document.access_level.as_str(),
                    document.metadata.to_json().to_string(),
                    document.published_at.map(timestamp),
                    timestamp(Utc::now()),
                    DOCUMENT_TYPE,
                    slug,
                ],
            )
            .map_err(|e| write_error(e, &document.slug))?;

        if changed == 0 {
            return Err(StoreError::NotFound(slug.to_string()));
        }

        Self::fetch(&conn, &document.slug)
    }

    async fn delete(&self, slug: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;

        let changed = conn.execute(
            "DELETE FROM node WHERE type = ?1 AND slug = ?2",
            params![DOCUMENT_TYPE, slug],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(slug.to_string()));
        }

        Ok(())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM node WHERE type = ?1",
            params![DOCUMENT_TYPE],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    async fn close(&self) {
        // The connection closes when the store is dropped; flush the WAL now
        if let Ok(conn) = self.lock() {
            let _ = conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);");
        }
    }
}
