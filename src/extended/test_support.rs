use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::firestore::api::query::QueryDefinition;
use crate::firestore::api::{DocumentSnapshot, FirestoreClient};
use crate::firestore::error::{unavailable, FirestoreResult};
use crate::firestore::model::{DocumentKey, FieldPath};
use crate::firestore::remote::datastore::{Datastore, DocumentStream, InMemoryDatastore, QueryStream, WriteOperation};
use crate::firestore::value::MapValue;

use super::FirestoreExtended;

/// Wraps an in-memory store and accepts only the first `allowed` write
/// calls; every later one fails with `Unavailable`. Reads always succeed.
pub(crate) struct FlakyDatastore {
    inner: Arc<InMemoryDatastore>,
    allowed: AtomicUsize,
}

impl FlakyDatastore {
    pub(crate) fn handle(inner: Arc<InMemoryDatastore>, allowed: usize) -> FirestoreExtended {
        let flaky = Arc::new(Self {
            inner,
            allowed: AtomicUsize::new(allowed),
        });
        FirestoreExtended::new(FirestoreClient::new(flaky))
    }

    fn admit(&self) -> FirestoreResult<()> {
        self.allowed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .map(|_| ())
            .map_err(|_| unavailable("write budget exhausted"))
    }
}

#[async_trait]
impl Datastore for FlakyDatastore {
    async fn get_document(&self, key: &DocumentKey) -> FirestoreResult<DocumentSnapshot> {
        self.inner.get_document(key).await
    }

    fn listen_document(&self, key: &DocumentKey) -> DocumentStream {
        self.inner.listen_document(key)
    }

    async fn set_document(&self, key: &DocumentKey, data: MapValue) -> FirestoreResult<()> {
        self.admit()?;
        self.inner.set_document(key, data).await
    }

    async fn update_document(
        &self,
        key: &DocumentKey,
        data: MapValue,
        field_paths: Vec<FieldPath>,
    ) -> FirestoreResult<()> {
        self.admit()?;
        self.inner.update_document(key, data, field_paths).await
    }

    async fn delete_document(&self, key: &DocumentKey) -> FirestoreResult<()> {
        self.admit()?;
        self.inner.delete_document(key).await
    }

    async fn run_query(&self, query: &QueryDefinition) -> FirestoreResult<Vec<DocumentSnapshot>> {
        self.inner.run_query(query).await
    }

    fn listen_query(&self, query: &QueryDefinition) -> QueryStream {
        self.inner.listen_query(query)
    }

    async fn commit(&self, writes: Vec<WriteOperation>) -> FirestoreResult<()> {
        self.admit()?;
        self.inner.commit(writes).await
    }
}
