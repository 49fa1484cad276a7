use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::RwLock;

use serde_json::Value as JsonValue;
use uuid::Uuid;

use storefront_core::ExpectedVersion;

use super::{Document, DocumentQuery, DocumentStore, StoreError};

/// In-memory document collection for tests/dev.
///
/// Documents are kept as JSON so reads and writes go through the same serde
/// path as the Postgres store.
#[derive(Debug)]
pub struct InMemoryDocumentStore<D> {
    inner: RwLock<BTreeMap<Uuid, (u64, JsonValue)>>,
    _doc: PhantomData<fn() -> D>,
}

impl<D> InMemoryDocumentStore<D> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
            _doc: PhantomData,
        }
    }
}

impl<D> Default for InMemoryDocumentStore<D> {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("in-memory store lock poisoned".to_string())
}

fn decode<D: Document>(value: &JsonValue) -> Result<D, StoreError> {
    serde_json::from_value(value.clone()).map_err(|e| StoreError::Serialization(e.to_string()))
}

#[async_trait::async_trait]
impl<D: Document> DocumentStore<D> for InMemoryDocumentStore<D> {
    async fn get(&self, key: Uuid) -> Result<Option<D>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        map.get(&key).map(|(_, doc)| decode::<D>(doc)).transpose()
    }

    async fn save(&self, doc: &D, expected: ExpectedVersion) -> Result<(), StoreError> {
        let json = serde_json::to_value(doc).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let key = doc.key();

        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let current = map.get(&key).map(|(rev, _)| *rev).unwrap_or(0);
        if !expected.matches(current) {
            return Err(StoreError::Concurrency(format!(
                "{}/{key}: expected {expected:?}, stored revision {current}",
                D::COLLECTION
            )));
        }

        map.insert(key, (doc.revision(), json));
        Ok(())
    }

    async fn find(&self, query: &DocumentQuery) -> Result<Vec<D>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        let limit = query.limit.unwrap_or(usize::MAX);

        map.values()
            .filter(|(_, doc)| query.matches(doc))
            .take(limit)
            .map(|(_, doc)| decode::<D>(doc))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_store::Predicate;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: Uuid,
        title: String,
        pinned: bool,
        rev: u64,
    }

    impl Document for Note {
        const COLLECTION: &'static str = "notes";

        fn key(&self) -> Uuid {
            self.id
        }

        fn revision(&self) -> u64 {
            self.rev
        }
    }

    fn note(seq: u128, title: &str, pinned: bool) -> Note {
        Note {
            id: Uuid::from_u128(seq),
            title: title.to_string(),
            pinned,
            rev: 1,
        }
    }

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let store = InMemoryDocumentStore::<Note>::new();
        let n = note(1, "first", false);

        store.save(&n, ExpectedVersion::Exact(0)).await.unwrap();

        assert_eq!(store.get(n.id).await.unwrap(), Some(n));
        assert_eq!(store.get(Uuid::from_u128(99)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn stale_expected_version_is_rejected() {
        let store = InMemoryDocumentStore::<Note>::new();
        let mut n = note(1, "first", false);
        store.save(&n, ExpectedVersion::Exact(0)).await.unwrap();

        // A second "create" of the same key loses the race.
        let err = store.save(&n, ExpectedVersion::Exact(0)).await.unwrap_err();
        assert!(matches!(err, StoreError::Concurrency(_)));

        n.rev = 2;
        n.title = "edited".to_string();
        store.save(&n, ExpectedVersion::Exact(1)).await.unwrap();
        assert_eq!(store.get(n.id).await.unwrap().unwrap().title, "edited");

        store.save(&n, ExpectedVersion::Any).await.unwrap();
    }

    #[tokio::test]
    async fn find_filters_and_limits_in_key_order() {
        let store = InMemoryDocumentStore::<Note>::new();
        let a = note(1, "Alpha", true);
        let b = note(2, "beta", false);
        let c = note(3, "Alphabet", true);
        for n in [&a, &b, &c] {
            store.save(n, ExpectedVersion::Exact(0)).await.unwrap();
        }

        let pinned = store
            .find(&DocumentQuery::all().filter(Predicate::eq("pinned", true)))
            .await
            .unwrap();
        assert_eq!(pinned, vec![a.clone(), c.clone()]);

        let alpha = store
            .find(
                &DocumentQuery::all()
                    .filter(Predicate::contains_ignore_case("title", "ALPHA"))
                    .limit(1),
            )
            .await
            .unwrap();
        assert_eq!(alpha, vec![a]);

        assert_eq!(store.find(&DocumentQuery::all()).await.unwrap().len(), 3);
    }
}
