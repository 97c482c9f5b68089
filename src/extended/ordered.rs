//! Keeps a contiguous zero based `index` field across sibling documents.
//!
//! Every operation rewrites only the positions whose index changed and
//! commits all writes in one batch. With `use_local_copy == false` the
//! caller's vectors are updated before the commit; if the commit then fails
//! they no longer match the store.

use chrono::{DateTime, Utc};
use futures::future::try_join_all;

use crate::firestore::api::{DocumentReference, Reference, WriteBatch};
use crate::firestore::error::{invalid_argument, not_persisted, FirestoreResult};
use crate::firestore::model::Timestamp;
use crate::firestore::value::{DocumentData, FirestoreValue};

use super::item::Item;
use super::nodes::QueryNode;
use super::stamper::{self, MODIFIED_DATE_FIELD};
use super::FirestoreExtended;

pub const INDEX_FIELD: &str = "index";
pub const GROUP_NAME_FIELD: &str = "groupName";

/// An element of an ordered sibling list.
pub trait Sibling: Clone {
    /// The stored document, `None` when the element was never persisted.
    fn sibling_reference(&self) -> Option<&DocumentReference>;

    fn set_field(&mut self, name: &str, value: FirestoreValue);

    fn set_modified_date(&mut self, at: DateTime<Utc>);
}

impl Sibling for Item {
    fn sibling_reference(&self) -> Option<&DocumentReference> {
        Some(self.reference())
    }

    fn set_field(&mut self, name: &str, value: FirestoreValue) {
        self.data.insert(name.to_string(), value);
    }

    fn set_modified_date(&mut self, at: DateTime<Utc>) {
        self.modified_date = Some(at);
    }
}

/// Plain fields carry no metadata, so every engine call on them fails with
/// `NotPersisted`. The pure helpers still work.
impl Sibling for DocumentData {
    fn sibling_reference(&self) -> Option<&DocumentReference> {
        None
    }

    fn set_field(&mut self, name: &str, value: FirestoreValue) {
        self.insert(name.to_string(), value);
    }

    fn set_modified_date(&mut self, at: DateTime<Utc>) {
        self.insert(
            MODIFIED_DATE_FIELD.to_string(),
            FirestoreValue::from_timestamp(Timestamp::from_datetime(at)),
        );
    }
}

/// Moves the element at `from` to `to`, shifting the ones in between.
/// Both positions are clamped to the slice.
pub fn move_item_in_array<T>(items: &mut [T], from: usize, to: usize) {
    if items.is_empty() {
        return;
    }
    let last = items.len() - 1;
    let (from, to) = (from.min(last), to.min(last));
    if from < to {
        items[from..=to].rotate_left(1);
    } else if to < from {
        items[to..=from].rotate_right(1);
    }
}

/// Moves the element at `from` in `previous` to position `to` in `current`.
/// `from` is clamped to `previous`, `to` to one past the end of `current`.
pub fn transfer_array_item<T>(previous: &mut Vec<T>, current: &mut Vec<T>, from: usize, to: usize) {
    if previous.is_empty() {
        return;
    }
    let from = from.min(previous.len() - 1);
    let to = to.min(current.len());
    current.insert(to, previous.remove(from));
}

/// Extra settings for [`FirestoreExtended::transfer`].
#[derive(Clone, Debug, PartialEq)]
pub struct TransferOptions {
    /// Written to `groupName` on the moved element.
    pub group_name: String,
    /// Further fields written on the moved element.
    pub extra_fields: DocumentData,
    pub stamp_modified: bool,
    pub use_local_copy: bool,
}

impl TransferOptions {
    pub fn new(group_name: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            extra_fields: DocumentData::new(),
            stamp_modified: true,
            use_local_copy: false,
        }
    }
}

impl FirestoreExtended {
    /// Moves one element within its list and rewrites `index` from
    /// `min(from, to)` to the end.
    ///
    /// # Errors
    /// `firestore-ext/unable-to-change-index-of-non-document` when a touched
    /// element has no metadata, `firestore/invalid-argument` for positions
    /// outside the list. Both are raised before any write, also when
    /// `from == to`.
    pub async fn move_within_list<S: Sibling>(
        &self,
        items: &mut Vec<S>,
        from: usize,
        to: usize,
        use_local_copy: bool,
    ) -> FirestoreResult<()> {
        if items.is_empty() {
            return Ok(());
        }
        check_position(from, items.len(), "from")?;
        check_position(to, items.len(), "to")?;
        let start = from.min(to);
        for (position, item) in items.iter().enumerate().skip(start) {
            persisted_reference(item, position)?;
        }
        if from == to {
            return Ok(());
        }

        let mut working = items.clone();
        move_item_in_array(&mut working, from, to);
        let mut batch = self.client().batch();
        reindex(&mut batch, &mut working, start)?;
        self.commit_ordered(batch, items, working, use_local_copy).await
    }

    /// Deletes the element at `index` with its whole subtree and closes the
    /// gap, in one batch.
    pub async fn delete_at_index<S: Sibling>(
        &self,
        items: &mut Vec<S>,
        index: usize,
        queries: &[QueryNode],
        use_local_copy: bool,
    ) -> FirestoreResult<()> {
        self.delete_at_indices(items, &[index], queries, use_local_copy).await
    }

    /// Deletes several elements with their subtrees and re-indexes what
    /// remains from the lowest deleted position, in one batch. Duplicate
    /// positions are ignored.
    pub async fn delete_at_indices<S: Sibling>(
        &self,
        items: &mut Vec<S>,
        indices: &[usize],
        queries: &[QueryNode],
        use_local_copy: bool,
    ) -> FirestoreResult<()> {
        let mut indices = indices.to_vec();
        indices.sort_unstable();
        indices.dedup();
        let Some(&lowest) = indices.first() else {
            return Ok(());
        };
        for &index in &indices {
            check_position(index, items.len(), "index")?;
        }
        let mut targets = Vec::with_capacity(indices.len());
        for (position, item) in items.iter().enumerate().skip(lowest) {
            let reference = persisted_reference(item, position)?;
            if indices.binary_search(&position).is_ok() {
                targets.push(reference.clone());
            }
        }

        let trees = try_join_all(
            targets
                .into_iter()
                .map(|reference| async move {
                    self.document_references_deep(&Reference::Document(reference), queries)
                        .await
                }),
        )
        .await?;

        let mut batch = self.client().batch();
        for reference in trees.iter().flatten() {
            batch.delete(reference)?;
        }
        let mut working = items.clone();
        for &index in indices.iter().rev() {
            working.remove(index);
        }
        reindex(&mut batch, &mut working, lowest)?;
        self.commit_ordered(batch, items, working, use_local_copy).await
    }

    /// Moves the element at `from` in `previous` to position `to` in
    /// `current`, writes the group name and extra fields on it and re-indexes
    /// the touched suffix of both lists, in one batch.
    pub async fn transfer<S: Sibling>(
        &self,
        previous: &mut Vec<S>,
        current: &mut Vec<S>,
        from: usize,
        to: usize,
        options: TransferOptions,
    ) -> FirestoreResult<()> {
        check_position(from, previous.len(), "from")?;
        if to > current.len() {
            return Err(invalid_argument(format!(
                "Position to={to} is outside a list of {} elements",
                current.len()
            )));
        }
        for (position, item) in previous.iter().enumerate().skip(from) {
            persisted_reference(item, position)?;
        }
        for (position, item) in current.iter().enumerate().skip(to) {
            persisted_reference(item, position)?;
        }

        let mut working_previous = previous.clone();
        let mut working_current = current.clone();
        transfer_array_item(&mut working_previous, &mut working_current, from, to);

        let mut moved_fields = options.extra_fields.clone();
        moved_fields.insert(
            GROUP_NAME_FIELD.to_string(),
            FirestoreValue::from_string(options.group_name.clone()),
        );
        let now = Utc::now();
        if options.stamp_modified {
            stamper::stamp_modified(&mut moved_fields, now);
        }
        let moved = &mut working_current[to];
        let moved_reference = persisted_reference(moved, to)?.clone();
        for (name, value) in &options.extra_fields {
            moved.set_field(name, value.clone());
        }
        moved.set_field(GROUP_NAME_FIELD, FirestoreValue::from_string(options.group_name.clone()));
        if options.stamp_modified {
            moved.set_modified_date(now);
        }

        let mut batch = self.client().batch();
        batch.update(&moved_reference, moved_fields)?;
        reindex(&mut batch, &mut working_current, to)?;
        reindex(&mut batch, &mut working_previous, from)?;

        if !options.use_local_copy {
            *previous = working_previous;
        }
        self.commit_ordered(batch, current, working_current, options.use_local_copy)
            .await
    }

    async fn commit_ordered<S: Sibling>(
        &self,
        batch: WriteBatch,
        items: &mut Vec<S>,
        working: Vec<S>,
        use_local_copy: bool,
    ) -> FirestoreResult<()> {
        log::debug!("reordering siblings with {} writes", batch.len());
        if !use_local_copy {
            *items = working;
        }
        let result = batch.commit().await;
        if let Err(err) = &result {
            if !use_local_copy {
                log::warn!("sibling reorder failed after updating local lists: {err}");
            }
        }
        result
    }
}

fn check_position(position: usize, len: usize, name: &str) -> FirestoreResult<()> {
    if position >= len {
        return Err(invalid_argument(format!(
            "Position {name}={position} is outside a list of {len} elements"
        )));
    }
    Ok(())
}

fn persisted_reference<S: Sibling>(item: &S, position: usize) -> FirestoreResult<&DocumentReference> {
    item.sibling_reference().ok_or_else(|| {
        not_persisted(format!(
            "Element at position {position} lacks document metadata and cannot be re-indexed"
        ))
    })
}

fn reindex<S: Sibling>(batch: &mut WriteBatch, items: &mut [S], start: usize) -> FirestoreResult<()> {
    for (position, item) in items.iter_mut().enumerate().skip(start) {
        let index = FirestoreValue::from_integer(position as i64);
        let reference = persisted_reference(item, position)?.clone();
        batch.update(&reference, DocumentData::from([(INDEX_FIELD.to_string(), index.clone())]))?;
        item.set_field(INDEX_FIELD, index);
    }
    Ok(())
}
