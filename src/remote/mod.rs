//! # Remote Document Store
//!
//! CRUD access to the node table holding published documents. Every
//! operation is scoped to rows whose type is [`DOCUMENT_TYPE`].
//!
//! Two backends implement [`RemoteStore`], picked from the scheme of the
//! configured connection string:
//!
//! | Scheme | Backend |
//! |--------|---------|
//! | `postgres://`, `postgresql://` | [`PgStore`] (sqlx) |
//! | `sqlite://<path>`, `sqlite::memory:` | [`SqliteStore`] (rusqlite) |
//!
//! A store is opened once per command and closed with
//! [`RemoteStore::close`] when the command's batch is done.

mod postgres;
mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Document;
use crate::storage::Config;

pub use postgres::PgStore;
pub use sqlite::SqliteStore;

/// Type tag of the rows this tool manages
pub const DOCUMENT_TYPE: &str = "blog";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document already exists: {0}")]
    Conflict(String),

    #[error("Invalid slug: {0}")]
    InvalidSlug(String),

    #[error("Unsupported database URL scheme: {0}")]
    UnsupportedUrl(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Corrupt row for '{slug}': {reason}")]
    CorruptRow { slug: String, reason: String },

    #[error("Database error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// Errors that concern a single document rather than the connection
    pub fn is_document_error(&self) -> bool {
        matches!(
            self,
            StoreError::NotFound(_)
                | StoreError::Conflict(_)
                | StoreError::InvalidSlug(_)
                | StoreError::CorruptRow { .. }
        )
    }
}

/// One row of a listing: the document, or why it could not be decoded
pub type Listed = Result<Document, StoreError>;

/// Repository of remote documents
///
/// Implementations hold one connection (or a small pool) for their whole
/// lifetime.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Finds a document by slug
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Document>, StoreError>;

    /// Lists documents, newest first, optionally restricted to one slug
    ///
    /// A row that cannot be decoded is returned as a `CorruptRow` entry in
    /// place; only query failures fail the whole listing.
    async fn find_all(&self, slug: Option<&str>) -> Result<Vec<Listed>, StoreError>;

    /// Inserts a document; fails with `Conflict` if the slug is taken
    async fn create(&self, document: &Document) -> Result<Document, StoreError>;

    /// Replaces the document stored under `slug`; fails with `NotFound` if absent
    async fn update(&self, slug: &str, document: &Document) -> Result<Document, StoreError>;

    /// Deletes the document stored under `slug`; fails with `NotFound` if absent
    async fn delete(&self, slug: &str) -> Result<(), StoreError>;

    /// Counts tracked documents
    async fn count(&self) -> Result<u64, StoreError>;

    /// Releases the connection
    async fn close(&self);
}

/// Rejects slugs that must never reach the remote table
pub(crate) fn check_slug(slug: &str) -> Result<(), StoreError> {
    if crate::domain::is_valid_slug(slug) {
        Ok(())
    } else {
        Err(StoreError::InvalidSlug(slug.to_string()))
    }
}

/// Opens the store configured by `config`
pub async fn connect(config: &Config) -> Result<Box<dyn RemoteStore>, StoreError> {
    let url = config
        .database_url()
        .map_err(|e| StoreError::Connection(e.to_string()))?;

    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        let store = PgStore::connect(url, config.ca_cert(), config.node_table()).await?;
        return Ok(Box::new(store));
    }

    if let Some(target) = url.strip_prefix("sqlite:") {
        let store = if target == ":memory:" {
            SqliteStore::open_in_memory()?
        } else {
            let path = target.strip_prefix("//").unwrap_or(target);
            SqliteStore::open(path)?
        };
        return Ok(Box::new(store));
    }

    let scheme = url.split(':').next().unwrap_or(url);
    Err(StoreError::UnsupportedUrl(scheme.to_string()))
}
