use crate::firestore::api::DocumentReference;
use crate::firestore::error::{doc_not_found, FirestoreResult};

use super::clean::{clean_with, CleanOptions};
use super::config::NotFoundPolicy;
use super::item::Item;
use super::nodes::{writer_nodes_from_queries, QueryNode, WriterNode};
use super::FirestoreExtended;

impl FirestoreExtended {
    /// Copies the tree at `reference` to `new_id` in the same collection and
    /// deletes the original, returning the copy.
    ///
    /// Without `writers` the writer tree is derived from `queries`. Dates are
    /// carried over unchanged. The copy and the delete are separate steps: if
    /// the delete fails both trees remain and the error is returned.
    ///
    /// # Errors
    /// `firestore-ext/doc-not-found` when the document does not exist.
    pub async fn change_doc_id(
        &self,
        reference: &DocumentReference,
        new_id: &str,
        queries: &[QueryNode],
        writers: Option<&[WriterNode]>,
    ) -> FirestoreResult<Item> {
        let item = self
            .get_doc_deep(reference, queries, NotFoundPolicy::Throw)
            .await?
            .ok_or_else(|| doc_not_found(&reference.path().canonical_string()))?;
        if item.id() == new_id {
            return Ok(item);
        }

        let derived;
        let writers = match writers {
            Some(writers) => writers,
            None => {
                derived = writer_nodes_from_queries(queries);
                derived.as_slice()
            }
        };

        let data = clean_with(&item, writers, &CleanOptions::keep_dates());
        let copy = self
            .add(data, &reference.parent(), writers, false, Some(new_id))
            .await
            .map_err(|err| {
                log::warn!("changing id of {} to {new_id} failed while copying: {err}", item.path());
                err
            })?;

        if let Err(err) = self.delete(reference, queries).await {
            log::warn!(
                "{} was copied to {} but the original could not be deleted: {err}",
                item.path(),
                copy.path()
            );
            return Err(err);
        }
        Ok(copy)
    }
}
