//! Recursive deletes. Every document of a tree is resolved first, then all of
//! them are removed in one batch.

use futures::future::try_join_all;

use crate::firestore::api::{CollectionReference, DocumentReference, Reference, WriteBatch};
use crate::firestore::error::FirestoreResult;

use super::config::NotFoundPolicy;
use super::item::{Child, Item};
use super::nodes::{ConfigNode, QueryNode};
use super::FirestoreExtended;

/// Paths of every document that makes up `item`, following `nodes`.
/// The item's own path comes first.
pub fn resolve_leaf_paths<N: ConfigNode>(item: &Item, nodes: &[N]) -> Vec<String> {
    leaf_references(item, nodes)
        .into_iter()
        .map(|reference| reference.path().canonical_string())
        .collect()
}

fn leaf_references<N: ConfigNode>(item: &Item, nodes: &[N]) -> Vec<DocumentReference> {
    let mut references = vec![item.reference().clone()];
    for node in nodes {
        let members = match item.children.get(node.name()) {
            Some(Child::Single(child) | Child::List(child)) => vec![child.as_ref()],
            Some(Child::Many(children)) => children.iter().collect(),
            None => continue,
        };
        for member in members {
            references.extend(leaf_references(member, node.children()));
        }
    }
    references
}

impl FirestoreExtended {
    /// Reads the tree under `reference` once and returns every member document.
    ///
    /// For a collection this covers the trees of all its documents.
    pub async fn document_references_deep(
        &self,
        reference: &Reference,
        queries: &[QueryNode],
    ) -> FirestoreResult<Vec<DocumentReference>> {
        match reference {
            Reference::Document(document) => {
                let item = self
                    .get_doc_deep(document, queries, NotFoundPolicy::ReturnEnvelopeOnly)
                    .await?;
                Ok(item
                    .map(|item| leaf_references(&item, queries))
                    .unwrap_or_default())
            }
            Reference::Collection(collection) => {
                let items = self.get_collection_deep(&collection.query(), queries).await?;
                Ok(items
                    .iter()
                    .flat_map(|item| leaf_references(item, queries))
                    .collect())
            }
        }
    }

    /// Deletes the document and every descendant reachable through `queries`
    /// in one batch. Deleting a tree that is already gone succeeds.
    pub async fn delete(&self, reference: &DocumentReference, queries: &[QueryNode]) -> FirestoreResult<()> {
        if queries.is_empty() {
            return self.client().delete_doc(reference).await;
        }
        let references = self
            .document_references_deep(&Reference::Document(reference.clone()), queries)
            .await?;
        log::debug!("deleting {} documents under {}", references.len(), reference.path());
        self.delete_references(&references).await
    }

    /// Queues the deletes of the tree on `batch` without committing it.
    pub async fn delete_batch(
        &self,
        batch: &mut WriteBatch,
        reference: &DocumentReference,
        queries: &[QueryNode],
    ) -> FirestoreResult<()> {
        let references = if queries.is_empty() {
            vec![reference.clone()]
        } else {
            self.document_references_deep(&Reference::Document(reference.clone()), queries)
                .await?
        };
        for reference in &references {
            batch.delete(reference)?;
        }
        Ok(())
    }

    /// Reads the collection once, then deletes each member's tree concurrently.
    ///
    /// Cost grows with everything stored below the collection.
    pub async fn delete_collection(
        &self,
        collection: &CollectionReference,
        queries: &[QueryNode],
    ) -> FirestoreResult<()> {
        let members = self.client().get_docs(&collection.query()).await?;
        log::debug!("deleting {} trees in {}", members.len(), collection.path());
        let deletes = members
            .iter()
            .map(|snapshot| snapshot.reference())
            .collect::<Vec<_>>();
        try_join_all(deletes.iter().map(|reference| self.delete(reference, queries))).await?;
        Ok(())
    }

    /// Deletes a tree that was already read, without reading it again.
    pub async fn delete_item<N: ConfigNode>(&self, item: &Item, nodes: &[N]) -> FirestoreResult<()> {
        self.delete_references(&leaf_references(item, nodes)).await
    }

    /// Deletes several trees in one batch.
    pub async fn delete_multiple(
        &self,
        references: &[DocumentReference],
        queries: &[QueryNode],
    ) -> FirestoreResult<()> {
        if queries.is_empty() {
            return self.delete_references(references).await;
        }
        let resolved = try_join_all(references.iter().map(|reference| async move {
            self.document_references_deep(&Reference::Document(reference.clone()), queries)
                .await
        }))
        .await?;
        let all: Vec<_> = resolved.into_iter().flatten().collect();
        self.delete_references(&all).await
    }

    pub async fn delete_doc_by_path(&self, path: &str, queries: &[QueryNode]) -> FirestoreResult<()> {
        let reference = self.client().doc(path)?;
        self.delete(&reference, queries).await
    }

    /// Deletes the listed documents only, in one batch.
    pub async fn delete_multiple_by_paths(&self, paths: &[&str]) -> FirestoreResult<()> {
        let references = paths
            .iter()
            .map(|path| self.client().doc(path))
            .collect::<FirestoreResult<Vec<_>>>()?;
        self.delete_references(&references).await
    }

    async fn delete_references(&self, references: &[DocumentReference]) -> FirestoreResult<()> {
        let mut batch = self.client().batch();
        for reference in references {
            batch.delete(reference)?;
        }
        batch.commit().await
    }
}
