use serde::{Deserialize, Serialize};

/// Id used for a child document written from a plain object when the writer
/// node names no fixed id.
pub const DEFAULT_DOC_ID: &str = "data";

/// Settings shared by every tree operation issued through a
/// [`FirestoreExtended`](super::FirestoreExtended) handle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtendedConfig {
    pub default_doc_id: String,
}

impl ExtendedConfig {
    pub fn new(default_doc_id: impl Into<String>) -> Self {
        Self {
            default_doc_id: default_doc_id.into(),
        }
    }

    /// Id a child document gets when its node has no fixed id of its own.
    pub(crate) fn child_doc_id<'a>(&'a self, fixed_child_id: Option<&'a str>) -> &'a str {
        fixed_child_id.unwrap_or(&self.default_doc_id)
    }
}

impl Default for ExtendedConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DOC_ID)
    }
}

/// What a document listener emits while the document does not exist.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotFoundPolicy {
    /// Emit `None`.
    ReturnNull,
    /// Emit an item with empty data and `exists == false`.
    #[default]
    ReturnEnvelopeOnly,
    /// Emit nothing until the document appears.
    SuppressUntilExists,
    /// End the stream with `firestore-ext/doc-not-found`.
    Throw,
}
