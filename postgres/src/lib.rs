//! `PostgreSQL` document store for Evently.
//!
//! Implements the `DocumentStore` trait from `evently-core` on a single JSONB
//! table:
//!
//! ```sql
//! CREATE TABLE documents (
//!     collection TEXT NOT NULL,
//!     id TEXT NOT NULL,
//!     data JSONB NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
//!     PRIMARY KEY (collection, id)
//! );
//! ```
//!
//! Filters are translated to JSONB operators; batches run in one transaction
//! that locks every touched row with `SELECT ... FOR UPDATE` before applying
//! the shared write semantics from `evently_core::document_store::Write`.
//!
//! # Example
//!
//! ```ignore
//! use evently_postgres::PostgresDocumentStore;
//! use std::time::Duration;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresDocumentStore::connect("postgres://localhost/evently", 10, Duration::from_secs(5)).await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

use evently_core::document::{CollectionPath, Document, DocumentId, Fields, Filter, Query};
use evently_core::document_store::{DocumentStore, DocumentStoreError, StoreFuture, WriteBatch};
use serde_json::{Value, json};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Transaction};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, DocumentStoreError>;

/// PostgreSQL-backed document store.
#[derive(Clone, Debug)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

/// Staged state of one document during a batch.
struct Staged {
    /// Whether the row existed when the batch locked it
    existed: bool,
    /// Fields after the writes so far, `None` once deleted
    fields: Option<Fields>,
}

impl PostgresDocumentStore {
    /// Create a store over an existing connection pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url` with a pool of at most `max_connections`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DatabaseError`] if the connection fails.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await
            .map_err(|e| DocumentStoreError::DatabaseError(format!("Failed to connect: {e}")))?;

        tracing::info!(max_connections, "Connected to PostgreSQL document store");
        Ok(Self::from_pool(pool))
    }

    /// Run database migrations (creates the `documents` table).
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DatabaseError`] if migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DocumentStoreError::DatabaseError(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn get_document(&self, collection: CollectionPath, id: DocumentId) -> Result<Option<Document>> {
        let row: Option<(Json<Value>,)> =
            sqlx::query_as("SELECT data FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection.as_str())
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DocumentStoreError::DatabaseError(format!("Failed to get: {e}")))?;

        row.map(|(Json(data),)| into_fields(data).map(|fields| Document::new(id, fields)))
            .transpose()
    }

    async fn query_documents(&self, collection: CollectionPath, query: Query) -> Result<Vec<Document>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT id, data FROM documents WHERE collection = ");
        builder.push_bind(collection.as_str().to_string());
        for filter in query.filters() {
            builder.push(" AND ");
            push_filter(&mut builder, filter);
        }
        builder.push(" ORDER BY id");

        let rows: Vec<(String, Json<Value>)> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DocumentStoreError::DatabaseError(format!("Failed to query: {e}")))?;

        rows.into_iter()
            .map(|(id, Json(data))| into_fields(data).map(|fields| Document::new(DocumentId::new(id), fields)))
            .collect()
    }

    async fn commit_batch(&self, batch: WriteBatch) -> Result<()> {
        let started = Instant::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DocumentStoreError::DatabaseError(format!("Failed to begin transaction: {e}")))?;

        let mut staged: HashMap<(CollectionPath, DocumentId), Staged> = HashMap::new();
        let mut order: Vec<(CollectionPath, DocumentId)> = Vec::new();

        // Returning early drops `tx`, which rolls the transaction back.
        for write in batch.writes() {
            let key = (write.collection().clone(), write.id().clone());
            let current = if let Some(entry) = staged.get(&key) {
                entry.fields.clone()
            } else {
                let locked = lock_row(&mut tx, write.collection(), write.id()).await?;
                staged.insert(
                    key.clone(),
                    Staged {
                        existed: locked.is_some(),
                        fields: locked.clone(),
                    },
                );
                order.push(key.clone());
                locked
            };

            let next = write.apply(current)?;
            if let Some(entry) = staged.get_mut(&key) {
                entry.fields = next;
            }
        }

        for key in order {
            let Some(entry) = staged.remove(&key) else {
                continue;
            };
            let (collection, id) = key;
            match (entry.existed, entry.fields) {
                (true, Some(fields)) => {
                    sqlx::query(
                        "UPDATE documents SET data = $3, updated_at = now() WHERE collection = $1 AND id = $2",
                    )
                    .bind(collection.as_str())
                    .bind(id.as_str())
                    .bind(Json(fields))
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| DocumentStoreError::DatabaseError(format!("Failed to update: {e}")))?;
                }
                (false, Some(fields)) => {
                    sqlx::query("INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3)")
                        .bind(collection.as_str())
                        .bind(id.as_str())
                        .bind(Json(fields))
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| match e {
                            sqlx::Error::Database(db) if db.is_unique_violation() => {
                                DocumentStoreError::AlreadyExists {
                                    collection: collection.clone(),
                                    id: id.clone(),
                                }
                            }
                            other => DocumentStoreError::DatabaseError(format!("Failed to insert: {other}")),
                        })?;
                }
                (true, None) => {
                    sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
                        .bind(collection.as_str())
                        .bind(id.as_str())
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| DocumentStoreError::DatabaseError(format!("Failed to delete: {e}")))?;
                }
                (false, None) => {}
            }
        }

        tx.commit()
            .await
            .map_err(|e| DocumentStoreError::DatabaseError(format!("Failed to commit: {e}")))?;

        metrics::histogram!("evently_store_commit_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::debug!(writes = batch.len(), "Committed batch");
        Ok(())
    }
}

impl DocumentStore for PostgresDocumentStore {
    fn get(&self, collection: CollectionPath, id: DocumentId) -> StoreFuture<'_, Option<Document>> {
        Box::pin(self.get_document(collection, id))
    }

    fn query(&self, collection: CollectionPath, query: Query) -> StoreFuture<'_, Vec<Document>> {
        Box::pin(self.query_documents(collection, query))
    }

    fn commit(&self, batch: WriteBatch) -> StoreFuture<'_, ()> {
        Box::pin(self.commit_batch(batch))
    }
}

/// Lock one document for the rest of the transaction and read it.
///
/// `FOR UPDATE` locks nothing when the row is absent, so the key is first
/// serialized with a transaction-scoped advisory lock. Two batches creating
/// the same missing document then run one after the other, and the second
/// reads the row the first inserted.
async fn lock_row(
    tx: &mut Transaction<'static, Postgres>,
    collection: &CollectionPath,
    id: &DocumentId,
) -> Result<Option<Fields>> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1 || '/' || $2, 0))")
        .bind(collection.as_str())
        .bind(id.as_str())
        .execute(&mut **tx)
        .await
        .map_err(|e| DocumentStoreError::DatabaseError(format!("Failed to lock key: {e}")))?;

    let row: Option<(Json<Value>,)> =
        sqlx::query_as("SELECT data FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE")
            .bind(collection.as_str())
            .bind(id.as_str())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| DocumentStoreError::DatabaseError(format!("Failed to lock row: {e}")))?;

    row.map(|(Json(data),)| into_fields(data)).transpose()
}

/// Append the SQL condition for one filter.
///
/// Field names are always bound as parameters, never interpolated.
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    match filter {
        Filter::Eq { field, value } => {
            builder.push("(data -> ");
            builder.push_bind(field.clone());
            builder.push(") = ");
            builder.push_bind(Json(value.clone()));
        }
        Filter::ArrayContains { field, value } => {
            builder.push("(data -> ");
            builder.push_bind(field.clone());
            builder.push(") @> ");
            builder.push_bind(Json(json!([value])));
        }
        Filter::ArrayContainsAny { field, values } => {
            if values.is_empty() {
                builder.push("FALSE");
                return;
            }
            builder.push("(");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    builder.push(" OR ");
                }
                builder.push("(data -> ");
                builder.push_bind(field.clone());
                builder.push(") @> ");
                builder.push_bind(Json(json!([value])));
            }
            builder.push(")");
        }
        Filter::StartsWith { field, prefix } => {
            builder.push("starts_with(data ->> ");
            builder.push_bind(field.clone());
            builder.push(", ");
            builder.push_bind(prefix.clone());
            builder.push(")");
        }
    }
}

fn into_fields(data: Value) -> Result<Fields> {
    match data {
        Value::Object(fields) => Ok(fields),
        other => Err(DocumentStoreError::SerializationError(format!(
            "stored document is not an object: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_bind_field_names() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT id FROM documents WHERE collection = ");
        builder.push_bind("events");
        builder.push(" AND ");
        push_filter(&mut builder, &Filter::array_contains_any("tags", vec![json!("a"), json!("b")]));
        builder.push(" AND ");
        push_filter(&mut builder, &Filter::starts_with("title", "Rust"));

        assert_eq!(
            builder.sql(),
            "SELECT id FROM documents WHERE collection = $1 AND ((data -> $2) @> $3 OR (data -> $4) @> $5) \
             AND starts_with(data ->> $6, $7)"
        );
    }

    #[test]
    fn empty_any_of_matches_nothing() {
        let mut builder = QueryBuilder::<Postgres>::new("");
        push_filter(&mut builder, &Filter::array_contains_any("tags", Vec::new()));
        assert_eq!(builder.sql(), "FALSE");
    }

    #[test]
    fn non_object_rows_are_rejected() {
        assert!(matches!(
            into_fields(json!([1, 2])),
            Err(DocumentStoreError::SerializationError(_))
        ));
    }
}
