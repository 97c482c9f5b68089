use std::sync::Arc;

use firestore_extended::extended::{clean, FirestoreExtended, NotFoundPolicy, QueryNode, WriterNode};
use firestore_extended::firestore::{
    document_from_json, document_to_json, FirestoreClient, InMemoryDatastore,
};
use futures::executor::block_on;
use proptest::prelude::*;
use serde_json::{json, Value};

fn setup() -> (Arc<InMemoryDatastore>, FirestoreExtended) {
    let store = Arc::new(InMemoryDatastore::new());
    (store.clone(), FirestoreExtended::new(FirestoreClient::new(store)))
}

/// Each dish is a price and a number of images.
fn restaurant(dishes: &[(i64, usize)]) -> Value {
    let dishes: Vec<Value> = dishes
        .iter()
        .enumerate()
        .map(|(index, (price, images))| {
            let images: Vec<Value> = (0..*images)
                .map(|image| json!({"url": format!("d{index}-i{image}")}))
                .collect();
            json!({"name": format!("d{index}"), "price": price, "images": images})
        })
        .collect();
    json!({"name": "Margherita", "dishes": dishes})
}

fn sort_by_name(values: &mut [Value]) {
    values.sort_by_key(|value| value["name"].as_str().or(value["url"].as_str()).map(str::to_string));
}

fn normalise(mut value: Value) -> Value {
    if let Some(dishes) = value["dishes"].as_array_mut() {
        sort_by_name(dishes);
        for dish in dishes.iter_mut() {
            if let Some(images) = dish["images"].as_array_mut() {
                sort_by_name(images);
            }
        }
    }
    value
}

fn dishes_strategy() -> impl Strategy<Value = Vec<(i64, usize)>> {
    prop::collection::vec((0i64..100, 0usize..3), 0..4)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn nested_lists_round_trip(dishes in dishes_strategy()) {
        let (store, extended) = setup();
        let writers = vec![WriterNode::new("dishes").with_children(vec![WriterNode::new("images")])];
        let queries = vec![QueryNode::new("dishes").with_children(vec![QueryNode::new("images")])];
        let original = restaurant(&dishes);

        let read = block_on(async {
            let restaurants = extended.client().collection("restaurants").unwrap();
            let data = document_from_json(original.clone()).unwrap();
            let item = extended.add(data, &restaurants, &writers, true, None).await.unwrap();
            extended
                .get_doc_deep(item.reference(), &queries, NotFoundPolicy::Throw)
                .await
                .unwrap()
                .unwrap()
        });

        let images: usize = dishes.iter().map(|(_, images)| images).sum();
        prop_assert_eq!(store.document_count(), 1 + dishes.len() + images);
        prop_assert_eq!(normalise(document_to_json(&clean(&read, &queries))), normalise(original));
    }

    #[test]
    fn fixed_id_lists_keep_their_order(dishes in dishes_strategy()) {
        let (store, extended) = setup();
        let writers = vec![WriterNode::new("dishes").with_fixed_child_id("data")];
        let queries = vec![QueryNode::new("dishes").with_fixed_child_id("data")];
        let original = restaurant(&dishes);

        let (written, read) = block_on(async {
            let restaurants = extended.client().collection("restaurants").unwrap();
            let data = document_from_json(original.clone()).unwrap();
            let item = extended.add(data, &restaurants, &writers, false, None).await.unwrap();
            let read = extended
                .get_doc_deep(item.reference(), &queries, NotFoundPolicy::Throw)
                .await
                .unwrap()
                .unwrap();
            (item, read)
        });

        prop_assert_eq!(store.document_count(), 2);
        prop_assert_eq!(document_to_json(&clean(&written, &writers)), original.clone());
        let cleaned = document_to_json(&clean(&read, &queries));
        // a read cannot tell a stored empty list from an empty map
        if dishes.is_empty() {
            prop_assert_eq!(&cleaned["dishes"], &json!({}));
        } else {
            prop_assert_eq!(cleaned, original);
        }
    }

    #[test]
    fn deleting_a_tree_twice_leaves_nothing(dishes in dishes_strategy()) {
        let (store, extended) = setup();
        let writers = vec![WriterNode::new("dishes").with_children(vec![WriterNode::new("images")])];
        let queries = vec![QueryNode::new("dishes").with_children(vec![QueryNode::new("images")])];

        block_on(async {
            let restaurants = extended.client().collection("restaurants").unwrap();
            let data = document_from_json(restaurant(&dishes)).unwrap();
            let item = extended.add(data, &restaurants, &writers, false, None).await.unwrap();
            extended.delete(item.reference(), &queries).await.unwrap();
            extended.delete(item.reference(), &queries).await.unwrap();
        });
        prop_assert_eq!(store.document_count(), 0);
    }
}

#[test]
fn numeric_keyed_map_under_fixed_id_stays_a_map() {
    let (_, extended) = setup();
    let writers = vec![WriterNode::new("stats").with_fixed_child_id("s")];
    let original = json!({"name": "M", "stats": {"0": 5, "1": 7}});
    let item = block_on(async {
        let restaurants = extended.client().collection("restaurants").unwrap();
        let data = document_from_json(original.clone()).unwrap();
        extended.add(data, &restaurants, &writers, true, None).await.unwrap()
    });
    assert_eq!(document_to_json(&clean(&item, &writers)), original);
}
