use std::sync::Arc;

use firestore_extended::extended::{
    clean, Child, FirestoreExtended, NotFoundPolicy, QueryNode, WriterNode, CREATED_DATE_FIELD,
};
use firestore_extended::firestore::{
    document_from_json, document_to_json, FirestoreClient, FirestoreValue, InMemoryDatastore,
};
use futures::StreamExt;
use serde_json::json;

fn setup() -> (Arc<InMemoryDatastore>, FirestoreExtended) {
    let store = Arc::new(InMemoryDatastore::new());
    (store.clone(), FirestoreExtended::new(FirestoreClient::new(store)))
}

fn restaurant() -> serde_json::Value {
    json!({
        "name": "Margherita",
        "dishes": [{"name": "A"}, {"name": "B"}],
    })
}

#[tokio::test]
async fn list_children_become_one_document_each() {
    let (store, extended) = setup();
    let restaurants = extended.client().collection("restaurants").unwrap();
    let writers = vec![WriterNode::new("dishes")];
    let data = document_from_json(restaurant()).unwrap();

    let item = extended
        .add(data.clone(), &restaurants, &writers, false, Some("r1"))
        .await
        .unwrap();
    assert_eq!(store.document_count(), 3);
    assert_eq!(
        store
            .document_paths()
            .iter()
            .filter(|path| path.starts_with("restaurants/r1/dishes/"))
            .count(),
        2
    );

    let queries = vec![QueryNode::new("dishes")];
    let read = extended
        .get_doc_deep(item.reference(), &queries, NotFoundPolicy::Throw)
        .await
        .unwrap()
        .unwrap();
    let mut cleaned = clean(&read, &queries);
    let mut dishes = cleaned
        .remove("dishes")
        .and_then(|dishes| dishes.as_array().map(<[_]>::to_vec))
        .unwrap();
    dishes.sort_by_key(|dish| dish.as_map().and_then(|map| map.get("name")).and_then(|v| v.as_str().map(str::to_string)));
    cleaned.insert("dishes".into(), FirestoreValue::from_array(dishes));
    assert_eq!(document_to_json(&cleaned), restaurant());
}

#[tokio::test]
async fn fixed_child_id_stores_the_list_in_one_document() {
    let (store, extended) = setup();
    let restaurants = extended.client().collection("restaurants").unwrap();
    let writers = vec![WriterNode::new("dishes").with_fixed_child_id("data")];
    let item = extended
        .add(document_from_json(restaurant()).unwrap(), &restaurants, &writers, false, Some("r1"))
        .await
        .unwrap();

    assert_eq!(store.document_count(), 2);
    let dishes = item.child("dishes").and_then(Child::as_single).unwrap();
    assert!(dishes.path().ends_with("/dishes/data"));

    let queries = vec![QueryNode::new("dishes").with_fixed_child_id("data")];
    let read = extended
        .get_doc_deep(item.reference(), &queries, NotFoundPolicy::Throw)
        .await
        .unwrap()
        .unwrap();
    assert!(read.child("dishes").and_then(Child::as_single).is_some());
    assert_eq!(document_to_json(&clean(&read, &queries)), restaurant());
}

#[tokio::test]
async fn list_with_doc_id_and_writers_fails_before_any_write() {
    let (store, extended) = setup();
    let dishes = extended.client().collection("restaurants/r1/dishes").unwrap();
    let list = vec![FirestoreValue::from_map(document_from_json(json!({"name": "A"})).unwrap())];
    let err = extended
        .add(list, &dishes, &[WriterNode::new("images")], false, Some("data"))
        .await
        .unwrap_err();
    assert_eq!(err.code_str(), "firestore-ext/invalid-sub-collection-writers");
    assert_eq!(store.write_requests(), 0);
}

#[tokio::test]
async fn stamped_dates_are_lifted_into_the_envelope() {
    let (_, extended) = setup();
    let restaurants = extended.client().collection("restaurants").unwrap();
    let item = extended
        .add(document_from_json(restaurant()).unwrap(), &restaurants, &[WriterNode::new("dishes")], true, None)
        .await
        .unwrap();
    assert!(item.created_date.is_some());
    assert!(item.get(CREATED_DATE_FIELD).is_none());
    for dish in item.child("dishes").unwrap().items() {
        assert_eq!(dish.created_date, item.created_date);
    }
}

#[tokio::test]
async fn update_patches_every_level_in_one_batch() {
    let (store, extended) = setup();
    let restaurants = extended.client().collection("restaurants").unwrap();
    let writers = vec![WriterNode::new("info")];
    let data = document_from_json(json!({"name": "Margherita", "info": {"phone": "1"}})).unwrap();
    let item = extended.add(data, &restaurants, &writers, false, Some("r1")).await.unwrap();

    let before = store.write_requests();
    let patch = document_from_json(json!({"name": "Marinara", "info": {"phone": "2"}})).unwrap();
    extended.update(patch, item.reference(), &writers, true).await.unwrap();
    assert_eq!(store.write_requests(), before + 1);

    let queries = vec![QueryNode::new("info")];
    let read = extended
        .get_doc_deep(item.reference(), &queries, NotFoundPolicy::Throw)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        document_to_json(&clean(&read, &queries)),
        json!({"name": "Marinara", "info": {"phone": "2"}})
    );
    assert!(read.modified_date.is_some());
}

#[tokio::test]
async fn listener_re_emits_when_a_child_changes() {
    let (_, extended) = setup();
    let restaurants = extended.client().collection("restaurants").unwrap();
    let item = extended
        .add(document_from_json(restaurant()).unwrap(), &restaurants, &[WriterNode::new("dishes")], false, Some("r1"))
        .await
        .unwrap();

    let mut stream = extended.listen_doc(item.reference(), &[QueryNode::new("dishes")], NotFoundPolicy::Throw);
    let first = stream.next().await.unwrap().unwrap().unwrap();
    assert_eq!(first.child("dishes").unwrap().items().len(), 2);

    let dishes = item.reference().collection("dishes").unwrap();
    extended
        .add(document_from_json(json!({"name": "C"})).unwrap(), &dishes, &[], false, None)
        .await
        .unwrap();
    let next = stream.next().await.unwrap().unwrap().unwrap();
    assert_eq!(next.child("dishes").unwrap().items().len(), 3);
}

#[tokio::test]
async fn deleting_twice_is_harmless() {
    let (store, extended) = setup();
    let restaurants = extended.client().collection("restaurants").unwrap();
    let item = extended
        .add(document_from_json(restaurant()).unwrap(), &restaurants, &[WriterNode::new("dishes")], false, None)
        .await
        .unwrap();
    let queries = vec![QueryNode::new("dishes")];
    extended.delete(item.reference(), &queries).await.unwrap();
    extended.delete(item.reference(), &queries).await.unwrap();
    assert_eq!(store.document_count(), 0);
    let gone = extended
        .get_doc_deep(item.reference(), &queries, NotFoundPolicy::ReturnNull)
        .await
        .unwrap();
    assert!(gone.is_none());
}

#[tokio::test]
async fn changing_the_id_moves_the_tree() {
    let (store, extended) = setup();
    let restaurants = extended.client().collection("restaurants").unwrap();
    let item = extended
        .add(document_from_json(restaurant()).unwrap(), &restaurants, &[WriterNode::new("dishes")], true, Some("old"))
        .await
        .unwrap();
    let copy = extended
        .change_doc_id(item.reference(), "new", &[QueryNode::new("dishes")], None)
        .await
        .unwrap();
    assert_eq!(copy.id(), "new");
    assert_eq!(store.document_count(), 3);
    assert!(store.document_paths().iter().all(|path| path.starts_with("restaurants/new")));
}
