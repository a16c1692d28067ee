//! PostgreSQL backend
//!
//! Talks to the node table of the blog's database. The table is shared with
//! the web application, so its column types are not under our control:
//! enum, uuid, json and timestamp columns are discovered once at connect
//! time and every statement casts to and from them explicitly.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow, PgSslMode};
use sqlx::types::Json;
use sqlx::Row;
use url::Url;

use super::{check_slug, Listed, RemoteStore, StoreError, DOCUMENT_TYPE};
use crate::domain::{AccessLevel, Document, DocumentStatus, Metadata};

/// Columns the tool reads and writes; all must exist
const REQUIRED_COLUMNS: [&str; 8] = [
    "type",
    "slug",
    "title",
    "content",
    "status",
    "accessLevel",
    "metadata",
    "publishedAt",
];

/// Columns read back into a document, in order
const DOCUMENT_COLUMNS: [&str; 7] = [
    "slug",
    "title",
    "content",
    "status",
    "accessLevel",
    "metadata",
    "publishedAt",
];

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Removes `sslmode` from the connection string query
fn strip_sslmode(database_url: &str) -> Result<String, StoreError> {
    let mut url = Url::parse(database_url)
        .map_err(|e| StoreError::Connection(format!("Invalid database URL: {}", e)))?;

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "sslmode")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.set_query(None);
    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs);
    }

    Ok(url.to_string())
}

/// Column name to Postgres type name (`udt_name`)
#[derive(Debug, Clone, Default)]
struct ColumnTypes(HashMap<String, String>);

impl ColumnTypes {
    fn has(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    fn udt(&self, column: &str) -> &str {
        self.0.get(column).map(String::as_str).unwrap_or("text")
    }

    /// Expression binding placeholder `$n` into `column`
    ///
    /// Text values are bound as `text`, metadata as `jsonb` and
    /// timestamps as `timestamptz`.
    fn param(&self, column: &str, n: usize) -> String {
        let placeholder = format!("${}", n);
        match self.udt(column) {
            "text" | "varchar" | "bpchar" | "jsonb" | "timestamptz" => placeholder,
            "timestamp" => format!("({} AT TIME ZONE 'UTC')", placeholder),
            other => format!("{}::{}", placeholder, quote_ident(other)),
        }
    }

    /// Expression reading `column` as text, jsonb or timestamptz
    fn select(&self, column: &str) -> String {
        let ident = quote_ident(column);
        let expr = match self.udt(column) {
            "text" | "varchar" | "bpchar" | "jsonb" | "timestamptz" => ident.clone(),
            "json" => format!("{}::jsonb", ident),
            "timestamp" => format!("({} AT TIME ZONE 'UTC')", ident),
            "date" => format!("({}::timestamp AT TIME ZONE 'UTC')", ident),
            _ => format!("{}::text", ident),
        };
        format!("{} AS {}", expr, ident)
    }
}

/// SQL text prepared once per connection
#[derive(Debug, Clone)]
struct Statements {
    find_one: String,
    find_all: String,
    find_all_by_slug: String,
    insert: String,
    update: String,
    delete: String,
    count: String,
    has_id: bool,
    has_created_at: bool,
    has_updated_at: bool,
}

impl Statements {
    fn build(table: &str, columns: &ColumnTypes) -> Self {
        let table = quote_ident(table);
        let q = quote_ident;

        let select_list = DOCUMENT_COLUMNS
            .iter()
            .map(|c| columns.select(c))
            .collect::<Vec<_>>()
            .join(", ");

        let by_type = format!("{} = {}", q("type"), columns.param("type", 1));
        let by_slug = format!("{} = {}", q("slug"), columns.param("slug", 2));

        let order = if columns.has("createdAt") {
            format!(" ORDER BY {} DESC", q("createdAt"))
        } else {
            String::new()
        };

        let has_id = columns.has("id");
        let has_created_at = columns.has("createdAt");
        let has_updated_at = columns.has("updatedAt");

        // Insert binds: type, slug, title, content, status, accessLevel,
        // metadata, publishedAt, then id / createdAt / updatedAt if present
        let mut insert_columns: Vec<&str> = vec![
            "type",
            "slug",
            "title",
            "content",
            "status",
            "accessLevel",
            "metadata",
            "publishedAt",
        ];
        if has_id {
            insert_columns.push("id");
        }
        if has_created_at {
            insert_columns.push("createdAt");
        }
        if has_updated_at {
            insert_columns.push("updatedAt");
        }

        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            insert_columns
                .iter()
                .map(|c| q(c))
                .collect::<Vec<_>>()
                .join(", "),
            insert_columns
                .iter()
                .enumerate()
                .map(|(i, c)| columns.param(c, i + 1))
                .collect::<Vec<_>>()
                .join(", "),
            select_list
        );

        // Update binds: $1 type, $2 current slug, then the new values
        let mut assignments: Vec<String> = [
            "slug",
            "title",
            "content",
            "status",
            "accessLevel",
            "metadata",
            "publishedAt",
        ]
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} = {}", q(c), columns.param(c, i + 3)))
        .collect();
        if has_updated_at {
            assignments.push(format!(
                "{} = {}",
                q("updatedAt"),
                columns.param("updatedAt", 10)
            ));
        }

        let update = format!(
            "UPDATE {} SET {} WHERE {} AND {} RETURNING {}",
            table,
            assignments.join(", "),
            by_type,
            by_slug,
            select_list
        );

        Self {
            find_one: format!(
                "SELECT {} FROM {} WHERE {} AND {}",
                select_list, table, by_type, by_slug
            ),
            find_all: format!("SELECT {} FROM {} WHERE {}{}", select_list, table, by_type, order),
            find_all_by_slug: format!(
                "SELECT {} FROM {} WHERE {} AND {}{}",
                select_list, table, by_type, by_slug, order
            ),
            insert,
            update,
            delete: format!("DELETE FROM {} WHERE {} AND {}", table, by_type, by_slug),
            count: format!("SELECT COUNT(*) FROM {} WHERE {}", table, by_type),
            has_id,
            has_created_at,
            has_updated_at,
        }
    }
}

fn row_to_document(row: &PgRow) -> Result<Document, StoreError> {
    let slug: String = row.try_get("slug")?;

    let corrupt = |reason: String| StoreError::CorruptRow {
        slug: slug.clone(),
        reason,
    };

    let status: String = row.try_get("status")?;
    let access_level: String = row.try_get("accessLevel")?;
    let metadata: Option<Json<serde_json::Value>> = row.try_get("metadata")?;

    let status = status.parse::<DocumentStatus>().map_err(corrupt)?;
    let access_level = access_level.parse::<AccessLevel>().map_err(corrupt)?;

    Ok(Document {
        title: row.try_get::<Option<String>, _>("title")?.unwrap_or_default(),
        body: row.try_get::<Option<String>, _>("content")?.unwrap_or_default(),
        status,
        access_level,
        published_at: row.try_get("publishedAt")?,
        metadata: metadata
            .map(|Json(value)| Metadata::from_json(&value))
            .unwrap_or_default(),
        slug,
    })
}

/// Maps unique-constraint failures to `Conflict`
fn write_error(err: sqlx::Error, slug: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some("23505") {
            return StoreError::Conflict(slug.to_string());
        }
    }
    StoreError::Postgres(err)
}

/// PostgreSQL-backed remote store
pub struct PgStore {
    pool: PgPool,
    sql: Statements,
}

impl PgStore {
    /// Connects and inspects the node table
    ///
    /// With a CA certificate (base64 PEM) the server certificate is fully
    /// verified; any `sslmode` in the URL is dropped in that case.
    pub async fn connect(
        database_url: &str,
        ca_cert: Option<&str>,
        table: &str,
    ) -> Result<Self, StoreError> {
        let mut options = match ca_cert {
            Some(cert) => {
                let pem = STANDARD
                    .decode(cert.trim())
                    .map_err(|e| StoreError::Connection(format!("Invalid caCert: {}", e)))?;
                PgConnectOptions::from_str(&strip_sslmode(database_url)?)?
                    .ssl_mode(PgSslMode::VerifyFull)
                    .ssl_root_cert_from_pem(pem)
            }
            None => PgConnectOptions::from_str(database_url)?,
        };
        options = options.application_name("blog-cli");

        let pool = PgPoolOptions::new()
            .max_connections(2)
            .idle_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        let columns = Self::inspect(&pool, table).await?;
        let sql = Statements::build(table, &columns);

        Ok(Self { pool, sql })
    }

    async fn inspect(pool: &PgPool, table: &str) -> Result<ColumnTypes, StoreError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT column_name::text, udt_name::text
             FROM information_schema.columns
             WHERE table_schema = current_schema() AND table_name = $1",
        )
        .bind(table)
        .fetch_all(pool)
        .await?;

        if rows.is_empty() {
            return Err(StoreError::Connection(format!(
                "Table \"{}\" not found",
                table
            )));
        }

        let columns = ColumnTypes(rows.into_iter().collect());
        if let Some(missing) = REQUIRED_COLUMNS.iter().find(|c| !columns.has(c)) {
            return Err(StoreError::Connection(format!(
                "Table \"{}\" has no column \"{}\"",
                table, missing
            )));
        }

        Ok(columns)
    }
}

#[async_trait]
impl RemoteStore for PgStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query(&self.sql.find_one)
            .bind(DOCUMENT_TYPE)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_document).transpose()
    }

    async fn find_all(&self, slug: Option<&str>) -> Result<Vec<Listed>, StoreError> {
        let rows = match slug {
            Some(slug) => {
                sqlx::query(&self.sql.find_all_by_slug)
                    .bind(DOCUMENT_TYPE)
                    .bind(slug)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query(&self.sql.find_all)
                    .bind(DOCUMENT_TYPE)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows.iter().map(row_to_document).collect())
    }

    async fn create(&self, document: &Document) -> Result<Document, StoreError> {
        check_slug(&document.slug)?;
        let now = Utc::now();

        let mut query = sqlx::query(&self.sql.insert)
            .bind(DOCUMENT_TYPE)
            .bind(&document.slug)
            .bind(&document.title)
            .bind(&document.body)
            .bind(document.status.as_str())
            .bind(document.access_level.as_str())
            .bind(Json(document.metadata.to_json()))
            .bind(document.published_at);
        if self.sql.has_id {
            query = query.bind(uuid::Uuid::new_v4().to_string());
        }
        if self.sql.has_created_at {
            query = query.bind(now);
        }
        if self.sql.has_updated_at {
            query = query.bind(now);
        }

        let row = query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| write_error(e, &document.slug))?;

        row_to_document(&row)
    }

    async fn update(&self, slug: &str, document: &Document) -> Result<Document, StoreError> {
        check_slug(&document.slug)?;

        let mut query = sqlx::query(&self.sql.update)
            .bind(DOCUMENT_TYPE)
            .bind(slug)
            .bind(&document.slug)
            .bind(&document.title)
            .bind(&document.body)
            .bind(document.status.as_str())
            .bind(document.access_level.as_str())
            .bind(Json(document.metadata.to_json()))
            .bind(document.published_at);
        if self.sql.has_updated_at {
            query = query.bind(Utc::now());
        }

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| write_error(e, &document.slug))?
            .ok_or_else(|| StoreError::NotFound(slug.to_string()))?;

        row_to_document(&row)
    }

    async fn delete(&self, slug: &str) -> Result<(), StoreError> {
        let result = sqlx::query(&self.sql.delete)
            .bind(DOCUMENT_TYPE)
            .bind(slug)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(slug.to_string()));
        }

        Ok(())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(&self.sql.count)
            .bind(DOCUMENT_TYPE)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prisma_columns() -> ColumnTypes {
        ColumnTypes(
            [
                ("id", "text"),
                ("type", "NodeType"),
                ("slug", "text"),
                ("title", "text"),
                ("content", "text"),
                ("status", "NodeStatus"),
                ("accessLevel", "AccessLevel"),
                ("metadata", "jsonb"),
                ("publishedAt", "timestamp"),
                ("createdAt", "timestamp"),
                ("updatedAt", "timestamp"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        )
    }

    #[test]
    fn strip_sslmode_keeps_other_params() {
        let url = strip_sslmode("postgres://u:p@host:5432/db?sslmode=require&connect_timeout=10")
            .unwrap();
        assert_eq!(url, "postgres://u:p@host:5432/db?connect_timeout=10");

        let url = strip_sslmode("postgres://u:p@host/db?sslmode=no-verify").unwrap();
        assert_eq!(url, "postgres://u:p@host/db");
    }

    #[test]
    fn enum_columns_are_cast() {
        let columns = prisma_columns();
        assert_eq!(columns.param("status", 6), "$6::\"NodeStatus\"");
        assert_eq!(columns.select("status"), "\"status\"::text AS \"status\"");
        assert_eq!(columns.param("slug", 2), "$2");
    }

    #[test]
    fn naive_timestamps_are_read_and_written_as_utc() {
        let columns = prisma_columns();
        assert_eq!(columns.param("publishedAt", 8), "($8 AT TIME ZONE 'UTC')");
        assert_eq!(
            columns.select("publishedAt"),
            "(\"publishedAt\" AT TIME ZONE 'UTC') AS \"publishedAt\""
        );
    }

    #[test]
    fn statements_follow_available_columns() {
        let sql = Statements::build("Node", &prisma_columns());

        assert!(sql.has_id && sql.has_created_at && sql.has_updated_at);
        assert!(sql.find_all.ends_with("ORDER BY \"createdAt\" DESC"));
        assert!(sql.insert.starts_with("INSERT INTO \"Node\" (\"type\", \"slug\""));
        assert!(sql.insert.contains("$11"));
        assert!(sql.update.contains("\"updatedAt\" = ($10 AT TIME ZONE 'UTC')"));
        assert!(sql
            .delete
            .ends_with("WHERE \"type\" = $1::\"NodeType\" AND \"slug\" = $2"));
    }

    #[test]
    fn statements_without_optional_columns() {
        let mut columns = prisma_columns();
        for c in ["id", "createdAt", "updatedAt"] {
            columns.0.remove(c);
        }

        let sql = Statements::build("posts", &columns);
        assert!(!sql.has_id && !sql.has_created_at && !sql.has_updated_at);
        assert!(!sql.find_all.contains("ORDER BY"));
        assert!(!sql.insert.contains("$9"));
        assert!(!sql.update.contains("updatedAt"));
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident("Node"), "\"Node\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
