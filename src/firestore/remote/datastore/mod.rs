use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::firestore::api::query::QueryDefinition;
use crate::firestore::api::reference::generate_auto_id;
use crate::firestore::api::DocumentSnapshot;
use crate::firestore::error::FirestoreResult;
use crate::firestore::model::{DocumentKey, FieldPath, ResourcePath};
use crate::firestore::value::MapValue;

pub mod in_memory;

/// Live view of one document. Emits the current state first, then after every change.
pub type DocumentStream = BoxStream<'static, FirestoreResult<DocumentSnapshot>>;

/// Live view of a query result. Emits the current result first, then after every change.
pub type QueryStream = BoxStream<'static, FirestoreResult<Vec<DocumentSnapshot>>>;

#[derive(Clone, Debug, PartialEq)]
pub enum WriteOperation {
    Set {
        key: DocumentKey,
        data: MapValue,
    },
    Update {
        key: DocumentKey,
        data: MapValue,
        field_paths: Vec<FieldPath>,
    },
    Delete {
        key: DocumentKey,
    },
}

impl WriteOperation {
    pub fn key(&self) -> &DocumentKey {
        match self {
            WriteOperation::Set { key, .. }
            | WriteOperation::Update { key, .. }
            | WriteOperation::Delete { key } => key,
        }
    }
}

/// Primitive document store operations everything else is built on.
#[async_trait]
pub trait Datastore: Send + Sync + 'static {
    async fn get_document(&self, key: &DocumentKey) -> FirestoreResult<DocumentSnapshot>;

    fn listen_document(&self, key: &DocumentKey) -> DocumentStream;

    async fn set_document(&self, key: &DocumentKey, data: MapValue) -> FirestoreResult<()>;

    /// Replaces the listed field paths. Fails with `NotFound` when the document is missing.
    async fn update_document(
        &self,
        key: &DocumentKey,
        data: MapValue,
        field_paths: Vec<FieldPath>,
    ) -> FirestoreResult<()>;

    /// Succeeds when the document is already gone.
    async fn delete_document(&self, key: &DocumentKey) -> FirestoreResult<()>;

    async fn add_document(&self, collection: &ResourcePath, data: MapValue) -> FirestoreResult<DocumentKey> {
        let key = DocumentKey::from_path(collection.child([generate_auto_id()]))?;
        self.set_document(&key, data).await?;
        Ok(key)
    }

    async fn run_query(&self, query: &QueryDefinition) -> FirestoreResult<Vec<DocumentSnapshot>>;

    fn listen_query(&self, query: &QueryDefinition) -> QueryStream;

    /// Applies every write or none of them.
    async fn commit(&self, writes: Vec<WriteOperation>) -> FirestoreResult<()>;
}

pub use in_memory::InMemoryDatastore;
