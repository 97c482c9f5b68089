use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::fmt::{Display, Formatter};

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::{DocumentKey, ResourcePath};

use super::query::Query;

const AUTO_ID_LENGTH: usize = 20;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CollectionReference {
    path: ResourcePath,
}

impl CollectionReference {
    pub fn new(path: ResourcePath) -> FirestoreResult<Self> {
        if !path.is_collection() {
            return Err(invalid_argument(format!(
                "Collection references must point to a collection (odd number of segments), got '{path}'"
            )));
        }
        Ok(Self { path })
    }

    pub fn from_string(path: &str) -> FirestoreResult<Self> {
        Self::new(ResourcePath::from_string(path)?)
    }

    /// The full resource path of the collection (e.g. `restaurants/r1/dishes`).
    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    /// The last segment of the collection path.
    pub fn id(&self) -> &str {
        self.path.last_segment().unwrap_or_default()
    }

    /// Returns the document that logically contains this collection, if any.
    pub fn parent(&self) -> Option<DocumentReference> {
        self.path
            .pop_last()
            .filter(ResourcePath::is_document)
            .and_then(|parent| DocumentReference::new(parent).ok())
    }

    /// Returns a reference to the document identified by `document_id`.
    ///
    /// When `document_id` is `None`, an auto-ID is generated.
    pub fn doc(&self, document_id: Option<&str>) -> FirestoreResult<DocumentReference> {
        let id = document_id
            .map(str::to_string)
            .unwrap_or_else(generate_auto_id);
        if id.is_empty() || id.contains('/') {
            return Err(invalid_argument(format!(
                "Document ID '{id}' must be non-empty and cannot contain '/'"
            )));
        }
        DocumentReference::new(self.path.child([id]))
    }

    /// Creates an unconstrained query over this collection.
    pub fn query(&self) -> Query {
        Query::new(self.clone())
    }
}

impl Display for CollectionReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "CollectionReference({})", self.path)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocumentReference {
    key: DocumentKey,
}

impl DocumentReference {
    pub fn new(path: ResourcePath) -> FirestoreResult<Self> {
        Ok(Self {
            key: DocumentKey::from_path(path)?,
        })
    }

    pub fn from_string(path: &str) -> FirestoreResult<Self> {
        Self::new(ResourcePath::from_string(path)?)
    }

    pub fn from_key(key: DocumentKey) -> Self {
        Self { key }
    }

    /// The document identifier (the last segment of its path).
    pub fn id(&self) -> &str {
        self.key.id()
    }

    /// The full resource path to the document.
    pub fn path(&self) -> &ResourcePath {
        self.key.path()
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    /// The parent collection containing this document.
    pub fn parent(&self) -> CollectionReference {
        CollectionReference {
            path: self.key.collection_path(),
        }
    }

    /// Returns a reference to a sub-collection rooted at this document.
    ///
    /// `path` may name nested collections (`"dishes/d1/toppings"`).
    pub fn collection(&self, path: &str) -> FirestoreResult<CollectionReference> {
        let relative = ResourcePath::from_string(path)?;
        if relative.is_empty() {
            return Err(invalid_argument("Sub-collection path cannot be empty"));
        }
        CollectionReference::new(self.key.path().child(relative.iter().cloned()))
    }
}

impl Display for DocumentReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocumentReference({})", self.key)
    }
}

/// Either kind of reference, resolved from a raw path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reference {
    Collection(CollectionReference),
    Document(DocumentReference),
}

/// Resolves a slash separated path: odd segment counts name a collection,
/// even ones a document.
pub fn reference_from_path(path: &str) -> FirestoreResult<Reference> {
    let resource = ResourcePath::from_string(path)?;
    if resource.is_empty() {
        return Err(invalid_argument("Path must contain at least one segment"));
    }
    if resource.is_document() {
        Ok(Reference::Document(DocumentReference::new(resource)?))
    } else {
        Ok(Reference::Collection(CollectionReference::new(resource)?))
    }
}

pub(crate) fn generate_auto_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .map(char::from)
        .take(AUTO_ID_LENGTH)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_and_document_roundtrip() {
        let collection = CollectionReference::from_string("restaurants").unwrap();
        assert_eq!(collection.id(), "restaurants");
        assert!(collection.parent().is_none());
        let document = collection.doc(Some("r1")).unwrap();
        assert_eq!(document.id(), "r1");
        assert_eq!(document.parent(), collection);
    }

    #[test]
    fn sub_collections_compose_under_documents() {
        let document = DocumentReference::from_string("restaurants/r1").unwrap();
        let dishes = document.collection("dishes").unwrap();
        assert_eq!(dishes.path().canonical_string(), "restaurants/r1/dishes");
        assert_eq!(dishes.parent(), Some(document.clone()));

        let nested = document.collection("dishes/d1/toppings").unwrap();
        assert_eq!(nested.id(), "toppings");
        assert!(document.collection("dishes/d1").is_err());
    }

    #[test]
    fn auto_id_generation() {
        let collection = CollectionReference::from_string("restaurants").unwrap();
        let document = collection.doc(None).unwrap();
        assert_eq!(document.parent().id(), "restaurants");
        assert_eq!(document.id().len(), 20);
        assert!(collection.doc(Some("a/b")).is_err());
    }

    #[test]
    fn resolves_by_segment_parity() {
        assert!(matches!(
            reference_from_path("restaurants/r1/dishes").unwrap(),
            Reference::Collection(_)
        ));
        match reference_from_path("/restaurants/r1/").unwrap() {
            Reference::Document(doc) => assert_eq!(doc.id(), "r1"),
            other => panic!("expected document, got {other:?}"),
        }
        assert!(reference_from_path("").is_err());
    }
}
