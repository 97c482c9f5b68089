use std::sync::Arc;

use crate::firestore::api::operations;
use crate::firestore::api::query::Query;
use crate::firestore::api::snapshot::DocumentSnapshot;
use crate::firestore::error::FirestoreResult;
use crate::firestore::remote::datastore::{Datastore, DocumentStream, InMemoryDatastore, QueryStream};
use crate::firestore::value::{DocumentData, MapValue};

use super::converter::FirestoreDataConverter;
use super::reference::{CollectionReference, DocumentReference};
use super::write_batch::WriteBatch;

/// Reference based facade over a [`Datastore`].
#[derive(Clone)]
pub struct FirestoreClient {
    datastore: Arc<dyn Datastore>,
}

impl FirestoreClient {
    /// Creates a client backed by the supplied datastore implementation.
    pub fn new(datastore: Arc<dyn Datastore>) -> Self {
        Self { datastore }
    }

    /// Returns a client that stores documents in memory only.
    ///
    /// Useful for tests or demos where persistence is not required.
    pub fn with_in_memory() -> Self {
        Self::new(Arc::new(InMemoryDatastore::new()))
    }

    pub fn datastore(&self) -> &Arc<dyn Datastore> {
        &self.datastore
    }

    /// Creates a `CollectionReference` pointing at `path` (odd segment count).
    pub fn collection(&self, path: &str) -> FirestoreResult<CollectionReference> {
        CollectionReference::from_string(path)
    }

    /// Creates a `DocumentReference` pointing at `path` (even segment count).
    pub fn doc(&self, path: &str) -> FirestoreResult<DocumentReference> {
        let key = operations::validate_document_path(path)?;
        Ok(DocumentReference::from_key(key))
    }

    /// Creates a new write batch against this client's datastore.
    pub fn batch(&self) -> WriteBatch {
        WriteBatch::new(Arc::clone(&self.datastore))
    }

    /// Fetches the document. The snapshot reports whether it exists.
    pub async fn get_doc(&self, reference: &DocumentReference) -> FirestoreResult<DocumentSnapshot> {
        self.datastore.get_document(reference.key()).await
    }

    /// Subscribes to a document; the first item is its current state.
    pub fn listen_doc(&self, reference: &DocumentReference) -> DocumentStream {
        self.datastore.listen_document(reference.key())
    }

    /// Overwrites the document with `data`.
    pub async fn set_doc(&self, reference: &DocumentReference, data: DocumentData) -> FirestoreResult<()> {
        self.datastore
            .set_document(reference.key(), MapValue::new(data))
            .await
    }

    /// Applies a partial update to an existing document.
    ///
    /// Top-level keys are dotted field paths.
    ///
    /// # Errors
    /// Returns `firestore/invalid-argument` if `data` is empty and
    /// `firestore/not-found` if the document does not exist.
    pub async fn update_doc(&self, reference: &DocumentReference, data: DocumentData) -> FirestoreResult<()> {
        let encoded = operations::encode_update_data(data)?;
        self.datastore
            .update_document(reference.key(), encoded.map, encoded.field_paths)
            .await
    }

    /// Deletes the document. Succeeds even if the document does not exist.
    pub async fn delete_doc(&self, reference: &DocumentReference) -> FirestoreResult<()> {
        self.datastore.delete_document(reference.key()).await
    }

    /// Adds a new document with a random id to `collection`.
    pub async fn add_doc(
        &self,
        collection: &CollectionReference,
        data: DocumentData,
    ) -> FirestoreResult<DocumentReference> {
        let key = self
            .datastore
            .add_document(collection.path(), MapValue::new(data))
            .await?;
        Ok(DocumentReference::from_key(key))
    }

    /// Executes the query once.
    pub async fn get_docs(&self, query: &Query) -> FirestoreResult<Vec<DocumentSnapshot>> {
        self.datastore.run_query(&query.definition()).await
    }

    /// Subscribes to a query; the first item is its current result.
    pub fn listen_docs(&self, query: &Query) -> QueryStream {
        self.datastore.listen_query(&query.definition())
    }

    /// Reads a document and decodes it with `converter`; `None` when missing.
    pub async fn get_doc_with_converter<C>(
        &self,
        reference: &DocumentReference,
        converter: &C,
    ) -> FirestoreResult<Option<C::Model>>
    where
        C: FirestoreDataConverter,
    {
        let snapshot = self.get_doc(reference).await?;
        snapshot.data().map(|data| converter.from_map(data)).transpose()
    }

    /// Encodes `model` with `converter` and overwrites the document.
    pub async fn set_doc_with_converter<C>(
        &self,
        reference: &DocumentReference,
        model: &C::Model,
        converter: &C,
    ) -> FirestoreResult<()>
    where
        C: FirestoreDataConverter,
    {
        let data = converter.to_map(model)?;
        self.set_doc(reference, data).await
    }
}
