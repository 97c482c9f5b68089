//! Recursive tree writes: `add` persists a nested payload as a document tree,
//! `update` patches an existing tree inside one batch.

use chrono::{DateTime, Utc};
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;

use crate::firestore::api::{CollectionReference, DocumentReference, FirestoreDataConverter, WriteBatch};
use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::value::{DocumentData, FirestoreValue, ValueKind};

use super::item::{Child, Item};
use super::nodes::{find_node, WriterNode};
use super::split::{self, Payload, Split};
use super::stamper;
use super::FirestoreExtended;

impl FirestoreExtended {
    /// Writes `data` as a new document in `collection`, moving every key named
    /// by `writers` into child collections, and returns the recomposed item.
    ///
    /// The whole payload is validated before the first write. Child writes of
    /// one level run concurrently; a failure fails the call but documents
    /// already written stay in place.
    ///
    /// # Errors
    /// `firestore-ext/invalid-sub-collection-writers` when a list stored under
    /// a fixed id also has writers, `firestore/invalid-argument` for values that
    /// cannot become documents, and any store error.
    pub async fn add(
        &self,
        data: impl Into<Payload>,
        collection: &CollectionReference,
        writers: &[WriterNode],
        stamp_dates: bool,
        doc_id: Option<&str>,
    ) -> FirestoreResult<Item> {
        let payload = data.into();
        split::validate_tree(&payload, writers, doc_id)?;
        log::debug!("adding document tree under {}", collection.path());
        self.add_level(
            payload,
            collection.clone(),
            writers,
            stamp_dates,
            doc_id.map(str::to_string),
            Utc::now(),
        )
        .await
    }

    /// Encodes `model` with `converter`, then behaves like [`add`](Self::add).
    pub async fn add_with_converter<C>(
        &self,
        model: &C::Model,
        converter: &C,
        collection: &CollectionReference,
        writers: &[WriterNode],
        stamp_dates: bool,
        doc_id: Option<&str>,
    ) -> FirestoreResult<Item>
    where
        C: FirestoreDataConverter,
    {
        let data = converter.to_map(model)?;
        self.add(data, collection, writers, stamp_dates, doc_id).await
    }

    fn add_level<'a>(
        &'a self,
        payload: Payload,
        collection: CollectionReference,
        writers: &'a [WriterNode],
        stamp_dates: bool,
        doc_id: Option<String>,
        at: DateTime<Utc>,
    ) -> BoxFuture<'a, FirestoreResult<Item>> {
        async move {
            let Split {
                mut local_fields,
                child_payloads,
            } = split::split(payload, writers, doc_id.as_deref())?;
            if stamp_dates {
                stamper::stamp_dates(&mut local_fields, at);
            }

            let reference = match doc_id.as_deref() {
                Some(id) => {
                    let reference = collection.doc(Some(id))?;
                    self.client().set_doc(&reference, local_fields.clone()).await?;
                    reference
                }
                None => self.client().add_doc(&collection, local_fields.clone()).await?,
            };

            let mut item = stamper::envelope(reference.clone(), local_fields, true, None);
            let children = child_payloads
                .into_iter()
                .map(|(name, value)| self.add_child(&reference, name, value, writers, stamp_dates, at));
            item.children.extend(try_join_all(children).await?);
            Ok(item)
        }
        .boxed()
    }

    async fn add_child(
        &self,
        parent: &DocumentReference,
        name: String,
        value: FirestoreValue,
        writers: &[WriterNode],
        stamp_dates: bool,
        at: DateTime<Utc>,
    ) -> FirestoreResult<(String, Child)> {
        let collection = parent.collection(&name)?;
        let node = find_node(writers, &name);
        let child_writers = node.map(|node| node.children.as_slice()).unwrap_or(&[]);
        let fixed_child_id = node.and_then(|node| node.fixed_child_id.as_deref());

        let child = match Payload::from_value(&name, value)? {
            Payload::List(entries) if fixed_child_id.is_none() => {
                let mut adds = Vec::with_capacity(entries.len());
                for entry in entries {
                    let ValueKind::Map(map) = entry.into_kind() else {
                        return Err(invalid_argument(format!(
                            "Entries of '{name}' must be maps to be stored as documents"
                        )));
                    };
                    adds.push(self.add_level(
                        Payload::Fields(map.into_fields()),
                        collection.clone(),
                        child_writers,
                        stamp_dates,
                        None,
                        at,
                    ));
                }
                Child::Many(try_join_all(adds).await?)
            }
            payload => {
                let is_list = matches!(payload, Payload::List(_));
                let id = self.config().child_doc_id(fixed_child_id).to_string();
                let item = Box::new(
                    self.add_level(payload, collection, child_writers, stamp_dates, Some(id), at)
                        .await?,
                );
                if is_list {
                    Child::List(item)
                } else {
                    Child::Single(item)
                }
            }
        };
        Ok((name, child))
    }

    /// Patches the document tree rooted at `reference` in one atomic batch.
    ///
    /// Child documents are addressed from `reference`: objects go to the
    /// fixed or default child id, lists only to a fixed id. Without writers
    /// this is a single plain update. Keys at each level are dotted field
    /// paths.
    ///
    /// A list under a fixed id is patched position by position. Writing a
    /// shorter list leaves the old trailing positions in the stored
    /// document, and a later read returns them after the new entries; use
    /// [`add`](Self::add) with the same id to replace such a list.
    pub async fn update(
        &self,
        data: DocumentData,
        reference: &DocumentReference,
        writers: &[WriterNode],
        stamp_modified: bool,
    ) -> FirestoreResult<()> {
        let now = Utc::now();
        if writers.is_empty() {
            let mut data = data;
            if stamp_modified {
                stamper::stamp_modified(&mut data, now);
            }
            return self.client().update_doc(reference, data).await;
        }

        split::validate_update_tree(&data, writers)?;
        let mut batch = self.client().batch();
        self.queue_update(&mut batch, data, reference, writers, stamp_modified, now)?;
        log::debug!("updating document tree at {} with {} writes", reference.path(), batch.len());
        batch.commit().await
    }

    /// Applies the same patch to every document in one batch.
    pub async fn update_multiple(
        &self,
        references: &[DocumentReference],
        data: DocumentData,
        stamp_modified: bool,
    ) -> FirestoreResult<()> {
        let mut data = data;
        if stamp_modified {
            stamper::stamp_modified(&mut data, Utc::now());
        }
        let mut batch = self.client().batch();
        for reference in references {
            batch.update(reference, data.clone())?;
        }
        batch.commit().await
    }

    fn queue_update(
        &self,
        batch: &mut WriteBatch,
        data: DocumentData,
        reference: &DocumentReference,
        writers: &[WriterNode],
        stamp_modified: bool,
        at: DateTime<Utc>,
    ) -> FirestoreResult<()> {
        let Split {
            mut local_fields,
            child_payloads,
        } = split::split_fields(data, writers);
        if stamp_modified {
            stamper::stamp_modified(&mut local_fields, at);
        }
        if !local_fields.is_empty() {
            batch.update(reference, local_fields)?;
        }

        for (name, value) in child_payloads {
            let Some(node) = find_node(writers, &name) else {
                continue;
            };
            let fixed_child_id = node.fixed_child_id.as_deref();
            let child_reference = reference
                .collection(&name)?
                .doc(Some(self.config().child_doc_id(fixed_child_id)))?;
            let fields = match Payload::from_value(&name, value)? {
                Payload::Fields(fields) => fields,
                list => split::split(list, &node.children, fixed_child_id)?.local_fields,
            };
            self.queue_update(batch, fields, &child_reference, &node.children, stamp_modified, at)?;
        }
        Ok(())
    }
}
