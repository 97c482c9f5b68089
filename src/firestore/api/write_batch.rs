use std::fmt;
use std::sync::Arc;

use crate::firestore::api::operations;
use crate::firestore::error::{resource_exhausted, FirestoreResult};
use crate::firestore::remote::datastore::{Datastore, WriteOperation};
use crate::firestore::value::{DocumentData, MapValue};

use super::reference::DocumentReference;

pub const MAX_BATCH_WRITES: usize = 500;

/// Aggregates write operations and commits them atomically.
#[derive(Clone)]
pub struct WriteBatch {
    datastore: Arc<dyn Datastore>,
    writes: Vec<WriteOperation>,
}

impl fmt::Debug for WriteBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteBatch")
            .field("writes", &self.writes)
            .finish_non_exhaustive()
    }
}

impl WriteBatch {
    pub(crate) fn new(datastore: Arc<dyn Datastore>) -> Self {
        Self {
            datastore,
            writes: Vec::new(),
        }
    }

    /// Queues a full overwrite of the document.
    pub fn set(&mut self, reference: &DocumentReference, data: DocumentData) -> FirestoreResult<&mut Self> {
        self.ensure_capacity()?;
        self.writes.push(WriteOperation::Set {
            key: reference.key().clone(),
            data: MapValue::new(data),
        });
        Ok(self)
    }

    /// Queues a partial update; keys are dotted field paths and the document
    /// must exist when the batch commits.
    pub fn update(&mut self, reference: &DocumentReference, data: DocumentData) -> FirestoreResult<&mut Self> {
        self.ensure_capacity()?;
        let encoded = operations::encode_update_data(data)?;
        self.writes.push(WriteOperation::Update {
            key: reference.key().clone(),
            data: encoded.map,
            field_paths: encoded.field_paths,
        });
        Ok(self)
    }

    /// Queues a delete. Deleting a missing document is not an error.
    pub fn delete(&mut self, reference: &DocumentReference) -> FirestoreResult<&mut Self> {
        self.ensure_capacity()?;
        self.writes.push(WriteOperation::Delete {
            key: reference.key().clone(),
        });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Commits all queued writes atomically. An empty batch resolves without
    /// touching the store.
    pub async fn commit(self) -> FirestoreResult<()> {
        if self.writes.is_empty() {
            return Ok(());
        }
        log::debug!("committing batch of {} writes", self.writes.len());
        self.datastore.commit(self.writes).await
    }

    fn ensure_capacity(&self) -> FirestoreResult<()> {
        if self.writes.len() >= MAX_BATCH_WRITES {
            return Err(resource_exhausted(format!(
                "WriteBatch cannot contain more than {MAX_BATCH_WRITES} operations"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::remote::datastore::InMemoryDatastore;
    use crate::firestore::value::FirestoreValue;
    use std::collections::BTreeMap;

    fn doc(path: &str) -> DocumentReference {
        DocumentReference::from_string(path).unwrap()
    }

    #[tokio::test]
    async fn applies_all_operations() {
        let store = Arc::new(InMemoryDatastore::new());
        let mut batch = WriteBatch::new(store.clone());
        let data = BTreeMap::from([("name".to_string(), FirestoreValue::from_string("Roma"))]);
        batch.set(&doc("restaurants/r1"), data.clone()).unwrap();
        batch.set(&doc("restaurants/r2"), data).unwrap();
        batch
            .update(
                &doc("restaurants/r1"),
                BTreeMap::from([("stars".to_string(), FirestoreValue::from_integer(4))]),
            )
            .unwrap();
        batch.delete(&doc("restaurants/r2")).unwrap();
        assert_eq!(batch.len(), 4);
        batch.commit().await.unwrap();

        let r1 = store.get_document(doc("restaurants/r1").key()).await.unwrap();
        assert_eq!(r1.data().unwrap().get("stars"), Some(&FirestoreValue::from_integer(4)));
        let r2 = store.get_document(doc("restaurants/r2").key()).await.unwrap();
        assert!(!r2.exists());
    }

    #[tokio::test]
    async fn failed_update_discards_whole_batch() {
        let store = Arc::new(InMemoryDatastore::new());
        let mut batch = WriteBatch::new(store.clone());
        batch.set(&doc("restaurants/r1"), BTreeMap::new()).unwrap();
        batch
            .update(
                &doc("restaurants/missing"),
                BTreeMap::from([("stars".to_string(), FirestoreValue::from_integer(1))]),
            )
            .unwrap();
        let err = batch.commit().await.unwrap_err();
        assert_eq!(err.code_str(), "firestore/not-found");
        assert!(!store.get_document(doc("restaurants/r1").key()).await.unwrap().exists());
    }

    #[test]
    fn enforces_capacity() {
        let mut batch = WriteBatch::new(Arc::new(InMemoryDatastore::new()));
        for index in 0..MAX_BATCH_WRITES {
            batch.delete(&doc(&format!("restaurants/r{index}"))).unwrap();
        }
        let err = batch.delete(&doc("restaurants/one-more")).unwrap_err();
        assert_eq!(err.code_str(), "firestore/resource-exhausted");
    }
}
