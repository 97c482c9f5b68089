pub mod datastore;

pub use datastore::{Datastore, DocumentStream, InMemoryDatastore, QueryStream, WriteOperation};
