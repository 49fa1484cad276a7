//! Postgres-backed document store.
//!
//! One table per collection:
//!
//! ```sql
//! CREATE TABLE <collection> (
//!     id         UUID PRIMARY KEY,
//!     version    BIGINT NOT NULL,
//!     doc        JSONB NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! ```
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Concurrency` |
//! | Database (other) | Any other | `Backend` |
//! | Other | N/A | `Backend` |

use std::marker::PhantomData;

use serde_json::Value as JsonValue;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use storefront_core::ExpectedVersion;

use super::{Document, DocumentQuery, DocumentStore, Predicate, StoreError};

/// Postgres JSONB collection for documents of type `D`.
pub struct PgDocumentStore<D> {
    pool: PgPool,
    _doc: PhantomData<fn() -> D>,
}

impl<D> Clone for PgDocumentStore<D> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _doc: PhantomData,
        }
    }
}

impl<D: Document> PgDocumentStore<D> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _doc: PhantomData,
        }
    }

    /// Create the collection table if it does not exist.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id UUID PRIMARY KEY,
                version BIGINT NOT NULL CHECK (version >= 0),
                doc JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
            table = D::COLLECTION
        );
        sqlx::query(&ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        tracing::info!(collection = D::COLLECTION, "document collection ready");
        Ok(())
    }
}

/// Translate a query into a WHERE/LIMIT clause. Field names are compile-time
/// constants; values are always bound.
fn build_select(table: &str, query: &DocumentQuery) -> String {
    let mut sql = format!("SELECT doc FROM {table}");
    for (idx, predicate) in query.predicates.iter().enumerate() {
        sql.push_str(if idx == 0 { " WHERE " } else { " AND " });
        let param = idx + 1;
        match predicate {
            Predicate::Eq { field, .. } => {
                sql.push_str(&format!("doc -> '{field}' = ${param}"));
            }
            Predicate::ContainsIgnoreCase { field, .. } => {
                sql.push_str(&format!("doc ->> '{field}' ILIKE ${param} ESCAPE '\\'"));
            }
        }
    }
    sql.push_str(" ORDER BY id ASC");
    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    sql
}

fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn decode<D: Document>(row: &sqlx::postgres::PgRow) -> Result<D, StoreError> {
    let Json(value): Json<JsonValue> = row
        .try_get("doc")
        .map_err(|e| StoreError::Backend(format!("failed to read doc column: {e}")))?;
    serde_json::from_value(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

#[async_trait::async_trait]
impl<D: Document> DocumentStore<D> for PgDocumentStore<D> {
    #[instrument(skip(self), fields(collection = D::COLLECTION), err)]
    async fn get(&self, key: Uuid) -> Result<Option<D>, StoreError> {
        let sql = format!("SELECT doc FROM {} WHERE id = $1", D::COLLECTION);
        let row = sqlx::query(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get", e))?;

        row.as_ref().map(decode::<D>).transpose()
    }

    #[instrument(
        skip(self, doc),
        fields(collection = D::COLLECTION, key = %doc.key(), revision = doc.revision()),
        err
    )]
    async fn save(&self, doc: &D, expected: ExpectedVersion) -> Result<(), StoreError> {
        let json = serde_json::to_value(doc).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let revision = i64::try_from(doc.revision())
            .map_err(|_| StoreError::Backend("revision overflows BIGINT".to_string()))?;
        let table = D::COLLECTION;

        let result = match expected {
            ExpectedVersion::Any => {
                let sql = format!(
                    "INSERT INTO {table} (id, version, doc) VALUES ($1, $2, $3) \
                     ON CONFLICT (id) DO UPDATE SET version = EXCLUDED.version, doc = EXCLUDED.doc, updated_at = now()"
                );
                sqlx::query(&sql)
                    .bind(doc.key())
                    .bind(revision)
                    .bind(Json(&json))
                    .execute(&self.pool)
                    .await
            }
            ExpectedVersion::Exact(0) => {
                let sql = format!(
                    "INSERT INTO {table} (id, version, doc) VALUES ($1, $2, $3) ON CONFLICT (id) DO NOTHING"
                );
                sqlx::query(&sql)
                    .bind(doc.key())
                    .bind(revision)
                    .bind(Json(&json))
                    .execute(&self.pool)
                    .await
            }
            ExpectedVersion::Exact(prev) => {
                let prev = i64::try_from(prev)
                    .map_err(|_| StoreError::Backend("revision overflows BIGINT".to_string()))?;
                let sql = format!(
                    "UPDATE {table} SET version = $2, doc = $3, updated_at = now() WHERE id = $1 AND version = $4"
                );
                sqlx::query(&sql)
                    .bind(doc.key())
                    .bind(revision)
                    .bind(Json(&json))
                    .bind(prev)
                    .execute(&self.pool)
                    .await
            }
        }
        .map_err(|e| map_sqlx_error("save", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Concurrency(format!(
                "{table}/{}: expected {expected:?}",
                doc.key()
            )));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(collection = D::COLLECTION), err)]
    async fn find(&self, query: &DocumentQuery) -> Result<Vec<D>, StoreError> {
        let sql = build_select(D::COLLECTION, query);
        let mut q = sqlx::query(&sql);
        for predicate in &query.predicates {
            q = match predicate {
                Predicate::Eq { value, .. } => q.bind(Json(value.clone())),
                Predicate::ContainsIgnoreCase { needle, .. } => q.bind(like_pattern(needle)),
            };
        }

        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find", e))?;
        rows.iter().map(decode::<D>).collect()
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Concurrency(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
