mod converter;
pub mod document;
pub(crate) mod operations;
pub mod query;
pub(crate) mod reference;
mod snapshot;
mod write_batch;

pub use converter::{FirestoreDataConverter, PassthroughConverter, SerdeConverter};
pub use document::FirestoreClient;
pub use query::{FilterOperator, OrderDirection, Query, QueryConstraint};
pub use reference::{reference_from_path, CollectionReference, DocumentReference, Reference};
pub use snapshot::{DocumentSnapshot, SnapshotMetadata};
pub use write_batch::{WriteBatch, MAX_BATCH_WRITES};
