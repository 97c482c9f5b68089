//! Document store layer: paths, values, references, queries, batches and the
//! [`Datastore`](remote::Datastore) contract with its in-memory implementation.

pub mod api;
pub mod error;
pub mod model;
pub mod remote;
pub mod value;

pub use api::{
    reference_from_path, CollectionReference, DocumentReference, DocumentSnapshot, FilterOperator,
    FirestoreClient, FirestoreDataConverter, OrderDirection, PassthroughConverter, Query, QueryConstraint,
    Reference, SerdeConverter, SnapshotMetadata, WriteBatch,
};
pub use error::{FirestoreError, FirestoreErrorCode, FirestoreResult};
pub use model::{DocumentKey, FieldPath, ResourcePath, Timestamp};
pub use remote::{Datastore, InMemoryDatastore};
pub use value::{document_from_json, document_to_json, DocumentData, FirestoreValue, MapValue, ValueKind};
