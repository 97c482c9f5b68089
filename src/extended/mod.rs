//! Tree synchronisation on top of the document store.
//!
//! A nested object is persisted as a tree of documents and child
//! collections, driven by [`WriterNode`] trees on write and [`QueryNode`]
//! trees on read. Reads recompose the tree into one [`Item`] and keep it live
//! as any member document changes.
//!
//! ```
//! use firestore_extended::extended::{FirestoreExtended, WriterNode};
//! use firestore_extended::firestore::{document_from_json, FirestoreClient};
//!
//! # futures::executor::block_on(async {
//! let extended = FirestoreExtended::new(FirestoreClient::with_in_memory());
//! let restaurants = extended.client().collection("restaurants")?;
//! let data = document_from_json(serde_json::json!({
//!     "name": "Margherita",
//!     "dishes": [{"name": "A"}, {"name": "B"}],
//! }))?;
//! let item = extended
//!     .add(data, &restaurants, &[WriterNode::new("dishes")], true, None)
//!     .await?;
//! assert_eq!(item.child("dishes").and_then(|c| c.as_many()).map(|d| d.len()), Some(2));
//! # Ok::<(), firestore_extended::firestore::FirestoreError>(())
//! # }).unwrap();
//! ```

mod change_id;
mod clean;
mod config;
mod delete;
pub mod fan_in;
mod item;
mod listen;
mod nodes;
mod ordered;
mod split;
mod stamper;
#[cfg(test)]
mod test_support;
mod write;

pub use clean::{clean, clean_many, clean_with, CleanOptions};
pub use config::{ExtendedConfig, NotFoundPolicy, DEFAULT_DOC_ID};
pub use delete::resolve_leaf_paths;
pub use item::{Child, Item, Metadata};
pub use listen::{ItemStream, ItemsStream};
pub use nodes::{writer_nodes_from_queries, ConfigNode, QueryNode, WriterNode};
pub use ordered::{move_item_in_array, transfer_array_item, Sibling, TransferOptions, GROUP_NAME_FIELD, INDEX_FIELD};
pub use split::{split, split_fields, validate_tree, validate_update_tree, Payload, Split};
pub use stamper::{stamp_created, stamp_dates, stamp_modified, CREATED_DATE_FIELD, MODIFIED_DATE_FIELD};

use crate::firestore::api::FirestoreClient;

/// Entry point for tree operations. Cheap to clone.
#[derive(Clone)]
pub struct FirestoreExtended {
    client: FirestoreClient,
    config: ExtendedConfig,
}

impl FirestoreExtended {
    pub fn new(client: FirestoreClient) -> Self {
        Self::with_config(client, ExtendedConfig::default())
    }

    pub fn with_config(client: FirestoreClient, config: ExtendedConfig) -> Self {
        Self { client, config }
    }

    /// Handle sharing the same client but using `default_doc_id` for child
    /// documents written from plain objects.
    pub fn with_default_doc_id(&self, default_doc_id: impl Into<String>) -> Self {
        Self::with_config(self.client.clone(), ExtendedConfig::new(default_doc_id))
    }

    pub fn client(&self) -> &FirestoreClient {
        &self.client
    }

    pub fn config(&self) -> &ExtendedConfig {
        &self.config
    }
}
