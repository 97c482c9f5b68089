use crate::firestore::model::DocumentKey;
use crate::firestore::value::{DocumentData, MapValue};

use super::reference::DocumentReference;

/// Metadata about the state of a document snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SnapshotMetadata {
    from_cache: bool,
    has_pending_writes: bool,
}

impl SnapshotMetadata {
    /// Creates metadata with the provided cache/pending-write flags.
    pub fn new(from_cache: bool, has_pending_writes: bool) -> Self {
        Self {
            from_cache,
            has_pending_writes,
        }
    }

    /// Indicates whether the snapshot was served from a local cache.
    pub fn from_cache(&self) -> bool {
        self.from_cache
    }

    /// Indicates whether the snapshot contains uncommitted local mutations.
    pub fn has_pending_writes(&self) -> bool {
        self.has_pending_writes
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DocumentSnapshot {
    key: DocumentKey,
    data: Option<MapValue>,
    metadata: SnapshotMetadata,
}

impl DocumentSnapshot {
    pub fn new(key: DocumentKey, data: Option<MapValue>, metadata: SnapshotMetadata) -> Self {
        Self {
            key,
            data,
            metadata,
        }
    }

    /// Returns whether the document exists in the store.
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    /// Returns the document fields if the snapshot contains data.
    pub fn data(&self) -> Option<&DocumentData> {
        self.data.as_ref().map(MapValue::fields)
    }

    pub fn into_data(self) -> Option<DocumentData> {
        self.data.map(MapValue::into_fields)
    }

    pub(crate) fn map_value(&self) -> Option<&MapValue> {
        self.data.as_ref()
    }

    pub fn metadata(&self) -> &SnapshotMetadata {
        &self.metadata
    }

    pub fn id(&self) -> &str {
        self.key.id()
    }

    pub fn document_key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn reference(&self) -> DocumentReference {
        DocumentReference::from_key(self.key.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::value::FirestoreValue;
    use std::collections::BTreeMap;

    #[test]
    fn metadata_flags() {
        let meta = SnapshotMetadata::new(true, false);
        assert!(meta.from_cache());
        assert!(!meta.has_pending_writes());
    }

    #[test]
    fn snapshot_reports_existence() {
        let key = DocumentKey::from_string("restaurants/r1").unwrap();
        let missing = DocumentSnapshot::new(key.clone(), None, SnapshotMetadata::default());
        assert!(!missing.exists());
        assert_eq!(missing.data(), None);

        let fields = BTreeMap::from([("name".to_string(), FirestoreValue::from_string("Roma"))]);
        let present = DocumentSnapshot::new(key, Some(MapValue::new(fields.clone())), SnapshotMetadata::default());
        assert_eq!(present.reference().id(), "r1");
        assert_eq!(present.into_data(), Some(fields));
    }
}
