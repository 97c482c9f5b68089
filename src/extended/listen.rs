//! Live recomposition of document trees.
//!
//! Every level opens one subscription per query node. Child results are
//! folded into their parent with [`combine_latest`], and a new parent
//! emission replaces the whole subtree of subscriptions through
//! [`switch_map`]. Dropping the returned stream drops every descendant
//! subscription with it.

use std::sync::Arc;

use futures::future;
use futures::stream::{self, BoxStream, StreamExt};

use crate::firestore::api::{CollectionReference, DocumentReference, DocumentSnapshot, OrderDirection, Query};
use crate::firestore::error::{doc_not_found, internal_error, FirestoreResult};

use super::config::NotFoundPolicy;
use super::fan_in::{combine_latest, end_on_error, switch_map, ResultStream};
use super::item::{Child, Item};
use super::nodes::QueryNode;
use super::stamper;
use super::FirestoreExtended;

/// Live document tree. `None` only under [`NotFoundPolicy::ReturnNull`].
pub type ItemStream = BoxStream<'static, FirestoreResult<Option<Item>>>;

/// Live collection of document trees.
pub type ItemsStream = BoxStream<'static, FirestoreResult<Vec<Item>>>;

impl FirestoreExtended {
    /// Listens to `reference` and, through `queries`, to every child
    /// collection below it.
    ///
    /// Emits after every change of any document in the tree. A child
    /// collection holding exactly one document whose id is the node's fixed
    /// id (or the default id) is folded in as [`Child::Single`], anything else
    /// as [`Child::Many`]. The stream ends after its first error.
    pub fn listen_doc(
        &self,
        reference: &DocumentReference,
        queries: &[QueryNode],
        policy: NotFoundPolicy,
    ) -> ItemStream {
        let path = reference.path().canonical_string();
        log::debug!("opening tree listener on document {path}");
        let documents = self
            .client()
            .listen_doc(reference)
            .filter_map(move |result| future::ready(apply_policy(result, policy, &path)))
            .boxed();
        let documents = end_on_error(documents);
        if queries.is_empty() {
            return documents;
        }

        let this = self.clone();
        let queries: Arc<[QueryNode]> = Arc::from(queries.to_vec());
        switch_map(documents, move |item: Option<Item>| match item {
            Some(item) => this
                .attach_children(item, Arc::clone(&queries))
                .map(|result| result.map(Some))
                .boxed(),
            None => stream::once(future::ready(Ok(None))).boxed(),
        })
        .boxed()
    }

    /// Listens to every document matched by `query`, each recomposed as in
    /// [`listen_doc`](Self::listen_doc). An empty result emits an empty vector
    /// without opening child subscriptions.
    pub fn listen_collection(&self, query: &Query, queries: &[QueryNode]) -> ItemsStream {
        log::debug!("opening tree listener on collection {}", query.collection_path());
        self.listen_items(query, Arc::from(queries.to_vec()))
    }

    /// Follows child collections named `child_key` to any depth, attaching
    /// each non-empty level to its parent under `child_key`.
    pub fn listen_collection_recursively(
        &self,
        collection: &CollectionReference,
        child_key: &str,
        order_by: Option<&str>,
    ) -> ItemsStream {
        let query = match order_by {
            Some(field) => collection.query().order_by(field, OrderDirection::Ascending),
            None => Ok(collection.query()),
        };
        let query = match query {
            Ok(query) => query,
            Err(err) => return stream::once(future::ready(Err(err))).boxed(),
        };

        let this = self.clone();
        let child_key = child_key.to_string();
        let order_by = order_by.map(str::to_string);
        let documents = self.listen_snapshots(&query);
        switch_map(documents, move |items: Vec<Item>| {
            let levels = items
                .into_iter()
                .map(|item| this.attach_next_level(item, &child_key, order_by.as_deref()))
                .collect();
            combine_latest(levels).boxed()
        })
        .boxed()
    }

    /// Reads the tree once.
    pub async fn get_doc_deep(
        &self,
        reference: &DocumentReference,
        queries: &[QueryNode],
        policy: NotFoundPolicy,
    ) -> FirestoreResult<Option<Item>> {
        first(self.listen_doc(reference, queries, policy)).await
    }

    /// Reads the collection trees once.
    pub async fn get_collection_deep(&self, query: &Query, queries: &[QueryNode]) -> FirestoreResult<Vec<Item>> {
        first(self.listen_collection(query, queries)).await
    }

    fn listen_snapshots(&self, query: &Query) -> ResultStream<Vec<Item>> {
        let documents = self
            .client()
            .listen_docs(query)
            .map(|result| result.map(|snapshots| snapshots.into_iter().map(stamper::from_snapshot).collect()))
            .boxed();
        end_on_error(documents)
    }

    fn listen_items(&self, query: &Query, queries: Arc<[QueryNode]>) -> ResultStream<Vec<Item>> {
        let documents = self.listen_snapshots(query);
        if queries.is_empty() {
            return documents;
        }
        let this = self.clone();
        switch_map(documents, move |items: Vec<Item>| {
            let trees = items
                .into_iter()
                .map(|item| this.attach_children(item, Arc::clone(&queries)))
                .collect();
            combine_latest(trees).boxed()
        })
        .boxed()
    }

    fn attach_children(&self, item: Item, queries: Arc<[QueryNode]>) -> ResultStream<Item> {
        let children = queries
            .iter()
            .map(|node| self.listen_child(item.reference(), node))
            .collect();
        combine_latest(children)
            .map(move |result| {
                result.map(|children| {
                    let mut item = item.clone();
                    item.children.extend(children);
                    item
                })
            })
            .boxed()
    }

    fn listen_child(&self, parent: &DocumentReference, node: &QueryNode) -> ResultStream<(String, Child)> {
        let query = parent
            .collection(&node.name)
            .and_then(|collection| collection.query().with_constraints(&node.constraints));
        let query = match query {
            Ok(query) => query,
            Err(err) => return stream::once(future::ready(Err(err))).boxed(),
        };
        let name = node.name.clone();
        let single_id = self.config().child_doc_id(node.fixed_child_id.as_deref()).to_string();
        self.listen_items(&query, Arc::from(node.children.clone()))
            .map(move |result| result.map(|items| (name.clone(), collapse(items, &single_id))))
            .boxed()
    }

    fn attach_next_level(&self, item: Item, child_key: &str, order_by: Option<&str>) -> ResultStream<Item> {
        let collection = match item.reference().collection(child_key) {
            Ok(collection) => collection,
            Err(err) => return stream::once(future::ready(Err(err))).boxed(),
        };
        let key = child_key.to_string();
        self.listen_collection_recursively(&collection, child_key, order_by)
            .map(move |result| {
                result.map(|next_level| {
                    let mut item = item.clone();
                    if !next_level.is_empty() {
                        item.children.insert(key.clone(), Child::Many(next_level));
                    }
                    item
                })
            })
            .boxed()
    }
}

fn apply_policy(
    result: FirestoreResult<DocumentSnapshot>,
    policy: NotFoundPolicy,
    path: &str,
) -> Option<FirestoreResult<Option<Item>>> {
    let snapshot = match result {
        Ok(snapshot) => snapshot,
        Err(err) => return Some(Err(err)),
    };
    if snapshot.exists() {
        return Some(Ok(Some(stamper::from_snapshot(snapshot))));
    }
    match policy {
        NotFoundPolicy::ReturnNull => Some(Ok(None)),
        NotFoundPolicy::ReturnEnvelopeOnly => Some(Ok(Some(stamper::from_snapshot(snapshot)))),
        NotFoundPolicy::SuppressUntilExists => None,
        NotFoundPolicy::Throw => Some(Err(doc_not_found(path))),
    }
}

fn collapse(mut items: Vec<Item>, single_id: &str) -> Child {
    if items.len() == 1 && items[0].id() == single_id {
        if let Some(item) = items.pop() {
            return Child::Single(Box::new(item));
        }
    }
    Child::Many(items)
}

async fn first<T>(mut stream: ResultStream<T>) -> FirestoreResult<T> {
    match stream.next().await {
        Some(result) => result,
        None => Err(internal_error("Listener ended without emitting")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extended::nodes::WriterNode;
    use crate::firestore::api::{FirestoreClient, QueryConstraint};
    use crate::firestore::remote::datastore::InMemoryDatastore;
    use crate::firestore::value::{DocumentData, FirestoreValue};
    use std::collections::BTreeMap;

    fn text(value: &str) -> FirestoreValue {
        FirestoreValue::from_string(value)
    }

    fn named(name: &str) -> DocumentData {
        DocumentData::from([("name".to_string(), text(name))])
    }

    fn setup() -> (Arc<InMemoryDatastore>, FirestoreExtended) {
        let store = Arc::new(InMemoryDatastore::new());
        (store.clone(), FirestoreExtended::new(FirestoreClient::new(store)))
    }

    async fn seed(extended: &FirestoreExtended) -> Item {
        let mut data = named("Margherita");
        data.insert(
            "dishes".into(),
            FirestoreValue::from_array(vec![
                FirestoreValue::from_map(named("A")),
                FirestoreValue::from_map(named("B")),
            ]),
        );
        data.insert(
            "address".into(),
            FirestoreValue::from_map(BTreeMap::from([("city".to_string(), text("Roma"))])),
        );
        let collection = extended.client().collection("restaurants").unwrap();
        let writers = [WriterNode::new("dishes"), WriterNode::new("address")];
        extended.add(data, &collection, &writers, true, Some("r1")).await.unwrap()
    }

    fn queries() -> Vec<QueryNode> {
        vec![QueryNode::new("dishes"), QueryNode::new("address")]
    }

    #[tokio::test]
    async fn listen_doc_recomposes_children() {
        let (_, extended) = setup();
        let added = seed(&extended).await;
        let mut stream = extended.listen_doc(added.reference(), &queries(), NotFoundPolicy::default());
        let item = stream.next().await.unwrap().unwrap().unwrap();
        assert_eq!(item.get("name"), Some(&text("Margherita")));
        assert_eq!(item.child("dishes").and_then(Child::as_many).map(<[_]>::len), Some(2));
        let address = item.child("address").and_then(Child::as_single).unwrap();
        assert_eq!(address.get("city"), Some(&text("Roma")));
        assert!(item.metadata.snapshot_metadata.is_some());
    }

    #[tokio::test]
    async fn child_change_re_emits_parent() {
        let (_, extended) = setup();
        let added = seed(&extended).await;
        let mut stream = extended.listen_doc(added.reference(), &queries(), NotFoundPolicy::default());
        stream.next().await.unwrap().unwrap();

        let address = extended.client().doc("restaurants/r1/address/data").unwrap();
        extended
            .client()
            .update_doc(&address, BTreeMap::from([("city".to_string(), text("Napoli"))]))
            .await
            .unwrap();
        let item = stream.next().await.unwrap().unwrap().unwrap();
        let address = item.child("address").and_then(Child::as_single).unwrap();
        assert_eq!(address.get("city"), Some(&text("Napoli")));
    }

    #[tokio::test]
    async fn not_found_policies() {
        let (_, extended) = setup();
        let missing = extended.client().doc("restaurants/none").unwrap();

        let envelope = extended
            .get_doc_deep(&missing, &[], NotFoundPolicy::ReturnEnvelopeOnly)
            .await
            .unwrap()
            .unwrap();
        assert!(!envelope.exists());
        assert!(envelope.data.is_empty());

        let null = extended.get_doc_deep(&missing, &[], NotFoundPolicy::ReturnNull).await.unwrap();
        assert!(null.is_none());

        let err = extended
            .get_doc_deep(&missing, &[], NotFoundPolicy::Throw)
            .await
            .unwrap_err();
        assert_eq!(err.code_str(), "firestore-ext/doc-not-found");

        let mut suppressed = extended.listen_doc(&missing, &[], NotFoundPolicy::SuppressUntilExists);
        extended.client().set_doc(&missing, named("Late")).await.unwrap();
        let item = suppressed.next().await.unwrap().unwrap().unwrap();
        assert_eq!(item.get("name"), Some(&text("Late")));
    }

    #[tokio::test]
    async fn throw_policy_ends_the_stream() {
        let (_, extended) = setup();
        let missing = extended.client().doc("restaurants/none").unwrap();
        let mut stream = extended.listen_doc(&missing, &queries(), NotFoundPolicy::Throw);
        assert!(stream.next().await.unwrap().is_err());
        extended.client().set_doc(&missing, named("Late")).await.unwrap();
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn empty_collection_emits_empty_list() {
        let (store, extended) = setup();
        let query = extended.client().collection("restaurants").unwrap().query();
        let items = extended.get_collection_deep(&query, &queries()).await.unwrap();
        assert!(items.is_empty());
        assert_eq!(store.active_listeners(), 0);
    }

    #[tokio::test]
    async fn dropping_a_tree_listener_closes_every_level() {
        let (store, extended) = setup();
        let image = || FirestoreValue::from_map(named("img"));
        let dish = |name: &str| {
            let mut data = named(name);
            data.insert("images".into(), FirestoreValue::from_array(vec![image()]));
            FirestoreValue::from_map(data)
        };
        let mut data = named("Margherita");
        data.insert("dishes".into(), FirestoreValue::from_array(vec![dish("A"), dish("B")]));
        let collection = extended.client().collection("restaurants").unwrap();
        let writers = [WriterNode::new("dishes").with_children(vec![WriterNode::new("images")])];
        let added = extended.add(data, &collection, &writers, false, Some("r1")).await.unwrap();

        let queries = [QueryNode::new("dishes").with_children(vec![QueryNode::new("images")])];
        let mut stream = extended.listen_doc(added.reference(), &queries, NotFoundPolicy::Throw);
        let item = stream.next().await.unwrap().unwrap().unwrap();
        assert_eq!(item.child("dishes").unwrap().items().len(), 2);
        // the document, the dishes query and one images query per dish
        assert_eq!(store.active_listeners(), 4);

        drop(stream);
        assert_eq!(store.active_listeners(), 0);
    }

    #[tokio::test]
    async fn collection_children_respect_constraints() {
        let (_, extended) = setup();
        seed(&extended).await;
        let ordered = vec![QueryNode::new("dishes")
            .with_constraint(QueryConstraint::order_by("name", OrderDirection::Descending).unwrap())];
        let query = extended.client().collection("restaurants").unwrap().query();
        let items = extended.get_collection_deep(&query, &ordered).await.unwrap();
        let names: Vec<_> = items[0]
            .child("dishes")
            .unwrap()
            .items()
            .into_iter()
            .map(|dish| dish.get("name").and_then(FirestoreValue::as_str).unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[tokio::test]
    async fn recursive_listener_follows_same_named_collections() {
        let (_, extended) = setup();
        let client = extended.client();
        client.set_doc(&client.doc("folders/a").unwrap(), named("a")).await.unwrap();
        client.set_doc(&client.doc("folders/a/folders/b").unwrap(), named("b")).await.unwrap();
        client
            .set_doc(&client.doc("folders/a/folders/b/folders/c").unwrap(), named("c"))
            .await
            .unwrap();

        let collection = client.collection("folders").unwrap();
        let mut stream = extended.listen_collection_recursively(&collection, "folders", Some("name"));
        let roots = stream.next().await.unwrap().unwrap();
        let b: &Item = roots[0].child("folders").unwrap().items()[0];
        assert_eq!(b.id(), "b");
        let c: &Item = b.child("folders").unwrap().items()[0];
        assert_eq!(c.id(), "c");
        assert!(c.child("folders").is_none());
    }
}
