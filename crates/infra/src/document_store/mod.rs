//! Versioned document store boundary.
//!
//! Each aggregate is persisted as one JSON document in a named collection,
//! alongside its revision (the aggregate version). Writes are guarded by
//! `ExpectedVersion` so concurrent writers cannot silently overwrite each other.

pub mod in_memory;
pub mod postgres;
pub mod query;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use storefront_core::ExpectedVersion;

pub use in_memory::InMemoryDocumentStore;
pub use postgres::PgDocumentStore;
pub use query::{DocumentQuery, Predicate};

/// A persistable aggregate snapshot.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection (table) name.
    const COLLECTION: &'static str;

    /// Primary key.
    fn key(&self) -> Uuid;

    /// Current revision; 0 means never saved.
    fn revision(&self) -> u64;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("document (de)serialization failed: {0}")]
    Serialization(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Keyed, versioned document collection.
///
/// `save` compares `expected` against the revision currently stored
/// (0 when the key is absent) and fails with [`StoreError::Concurrency`] on mismatch.
#[async_trait::async_trait]
pub trait DocumentStore<D: Document>: Send + Sync {
    async fn get(&self, key: Uuid) -> Result<Option<D>, StoreError>;

    async fn save(&self, doc: &D, expected: ExpectedVersion) -> Result<(), StoreError>;

    /// Documents matching every predicate, ordered by key.
    async fn find(&self, query: &DocumentQuery) -> Result<Vec<D>, StoreError>;
}

#[async_trait::async_trait]
impl<D, S> DocumentStore<D> for Arc<S>
where
    D: Document,
    S: DocumentStore<D> + ?Sized,
{
    async fn get(&self, key: Uuid) -> Result<Option<D>, StoreError> {
        (**self).get(key).await
    }

    async fn save(&self, doc: &D, expected: ExpectedVersion) -> Result<(), StoreError> {
        (**self).save(doc, expected).await
    }

    async fn find(&self, query: &DocumentQuery) -> Result<Vec<D>, StoreError> {
        (**self).find(query).await
    }
}
