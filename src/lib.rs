//! Persist nested objects as trees of documents and sub-collections.
//!
//! [`firestore`] is the document store layer: paths, values, references,
//! queries, atomic batches and live listeners over a pluggable
//! [`Datastore`](firestore::Datastore). [`extended`] builds tree writes,
//! recomposing listeners, recursive deletes, id changes and ordered sibling
//! lists on top of it.

pub mod extended;
pub mod firestore;
