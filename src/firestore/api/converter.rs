use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::value::{document_from_json, document_to_json, DocumentData};

/// Trait describing how to convert between user models and document fields.
///
/// Writes use `to_map`, reads use `from_map`, and callers choose the `Model`
/// type they want to surface.
pub trait FirestoreDataConverter: Send + Sync + Clone + 'static {
    /// The strongly typed model associated with this converter.
    type Model: Clone;

    /// Encodes the user model into document fields for writes.
    fn to_map(&self, value: &Self::Model) -> FirestoreResult<DocumentData>;

    /// Decodes document fields into the user model for reads.
    fn from_map(&self, value: &DocumentData) -> FirestoreResult<Self::Model>;
}

/// Default converter that leaves document fields unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassthroughConverter;

impl FirestoreDataConverter for PassthroughConverter {
    type Model = DocumentData;

    fn to_map(&self, value: &Self::Model) -> FirestoreResult<DocumentData> {
        Ok(value.clone())
    }

    fn from_map(&self, value: &DocumentData) -> FirestoreResult<Self::Model> {
        Ok(value.clone())
    }
}

/// Converter for any serde model, going through `serde_json::Value`.
///
/// Stored timestamps reach the model as RFC 3339 strings, so `chrono`
/// fields deserialize directly.
pub struct SerdeConverter<T> {
    _model: PhantomData<fn() -> T>,
}

impl<T> SerdeConverter<T> {
    pub fn new() -> Self {
        Self {
            _model: PhantomData,
        }
    }
}

impl<T> Default for SerdeConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SerdeConverter<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SerdeConverter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SerdeConverter")
    }
}

impl<T> FirestoreDataConverter for SerdeConverter<T>
where
    T: Serialize + DeserializeOwned + Clone + 'static,
{
    type Model = T;

    fn to_map(&self, value: &Self::Model) -> FirestoreResult<DocumentData> {
        let json = serde_json::to_value(value)
            .map_err(|err| invalid_argument(format!("Failed to serialize model: {err}")))?;
        document_from_json(json)
    }

    fn from_map(&self, value: &DocumentData) -> FirestoreResult<Self::Model> {
        serde_json::from_value(document_to_json(value))
            .map_err(|err| invalid_argument(format!("Failed to deserialize model: {err}")))
    }
}
