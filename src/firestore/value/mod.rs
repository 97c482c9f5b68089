use std::collections::BTreeMap;

mod array_value;
mod json;
mod map_value;
mod value;

pub use array_value::ArrayValue;
pub use json::{document_from_json, document_to_json};
pub use map_value::MapValue;
pub use value::{FirestoreValue, ValueKind};

/// Top-level fields of one document.
pub type DocumentData = BTreeMap<String, FirestoreValue>;
