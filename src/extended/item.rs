use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::firestore::api::{DocumentReference, FirestoreDataConverter, SnapshotMetadata};
use crate::firestore::error::FirestoreResult;
use crate::firestore::value::{DocumentData, FirestoreValue};

/// Read-only persistence details attached to every item the engine returns.
#[derive(Clone, Debug, PartialEq)]
pub struct Metadata {
    pub id: String,
    pub path: String,
    pub reference: DocumentReference,
    pub exists: bool,
    /// Present on items produced by a read, absent on items produced by a write.
    pub snapshot_metadata: Option<SnapshotMetadata>,
}

impl Metadata {
    pub(crate) fn new(
        reference: DocumentReference,
        exists: bool,
        snapshot_metadata: Option<SnapshotMetadata>,
    ) -> Self {
        Self {
            id: reference.id().to_string(),
            path: reference.path().canonical_string(),
            reference,
            exists,
            snapshot_metadata,
        }
    }
}

/// A document's fields wrapped with its metadata, dates and recomposed
/// child collections.
#[derive(Clone, Debug, PartialEq)]
pub struct Item<T = DocumentData> {
    pub data: T,
    pub metadata: Metadata,
    pub created_date: Option<DateTime<Utc>>,
    pub modified_date: Option<DateTime<Utc>>,
    pub children: BTreeMap<String, Child>,
}

/// A child collection folded back into its parent item.
#[derive(Clone, Debug, PartialEq)]
pub enum Child {
    /// The collection holds one document under the fixed or default id.
    Single(Box<Item>),
    /// A list written under a fixed id; the document's fields are its
    /// positions. Only writes produce this, reads cannot tell it from
    /// [`Child::Single`].
    List(Box<Item>),
    Many(Vec<Item>),
}

impl Child {
    /// The one document holding this child, for both `Single` and `List`.
    pub fn as_single(&self) -> Option<&Item> {
        match self {
            Child::Single(item) | Child::List(item) => Some(item),
            Child::Many(_) => None,
        }
    }

    pub fn as_many(&self) -> Option<&[Item]> {
        match self {
            Child::Single(_) | Child::List(_) => None,
            Child::Many(items) => Some(items),
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Child::List(_))
    }

    /// Every item held by this child, in order.
    pub fn items(&self) -> Vec<&Item> {
        match self {
            Child::Single(item) | Child::List(item) => vec![item.as_ref()],
            Child::Many(items) => items.iter().collect(),
        }
    }
}

impl<T> Item<T> {
    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn path(&self) -> &str {
        &self.metadata.path
    }

    pub fn reference(&self) -> &DocumentReference {
        &self.metadata.reference
    }

    pub fn exists(&self) -> bool {
        self.metadata.exists
    }

    pub fn child(&self, name: &str) -> Option<&Child> {
        self.children.get(name)
    }

    /// Replaces the domain value, keeping the envelope.
    pub fn map_data<U>(self, f: impl FnOnce(T) -> U) -> Item<U> {
        Item {
            data: f(self.data),
            metadata: self.metadata,
            created_date: self.created_date,
            modified_date: self.modified_date,
            children: self.children,
        }
    }
}

impl Item<DocumentData> {
    pub fn get(&self, field: &str) -> Option<&FirestoreValue> {
        self.data.get(field)
    }

    /// Decodes the local fields with `converter`. Children stay untyped.
    pub fn into_typed<C>(self, converter: &C) -> FirestoreResult<Item<C::Model>>
    where
        C: FirestoreDataConverter,
    {
        let data = converter.from_map(&self.data)?;
        Ok(self.map_data(|_| data))
    }
}
