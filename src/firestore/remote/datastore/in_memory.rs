use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

use async_channel::Sender;
use async_trait::async_trait;
use futures::StreamExt;

use crate::firestore::api::operations::{set_value_at_field_path, value_for_field_path};
use crate::firestore::api::query::{FieldFilter, FilterOperator, OrderBy, OrderDirection, QueryDefinition};
use crate::firestore::api::{DocumentSnapshot, SnapshotMetadata};
use crate::firestore::error::{internal_error, not_found, unavailable, FirestoreResult};
use crate::firestore::model::{DocumentKey, FieldPath, ResourcePath};
use crate::firestore::value::{FirestoreValue, MapValue, ValueKind};

use super::{Datastore, DocumentStream, QueryStream, WriteOperation};

type Documents = BTreeMap<DocumentKey, MapValue>;

struct DocumentListener {
    key: DocumentKey,
    last: DocumentSnapshot,
    sender: Sender<FirestoreResult<DocumentSnapshot>>,
}

struct QueryListener {
    query: QueryDefinition,
    last: Vec<DocumentSnapshot>,
    sender: Sender<FirestoreResult<Vec<DocumentSnapshot>>>,
}

#[derive(Default)]
struct Listeners {
    documents: Vec<DocumentListener>,
    queries: Vec<QueryListener>,
}

/// Process-local store with real-time listeners.
///
/// Listeners are fed through unbounded channels right after each mutation and
/// only when what they observe actually changed. Dropping the returned stream
/// unregisters the listener on the next mutation.
#[derive(Clone, Default)]
pub struct InMemoryDatastore {
    documents: Arc<Mutex<Documents>>,
    listeners: Arc<Mutex<Listeners>>,
    writes_issued: Arc<AtomicUsize>,
    write_requests: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of document writes attempted so far (each batched write counts once).
    pub fn writes_issued(&self) -> usize {
        self.writes_issued.load(AtomicOrdering::SeqCst)
    }

    /// Number of write calls received; a committed batch counts once.
    pub fn write_requests(&self) -> usize {
        self.write_requests.load(AtomicOrdering::SeqCst)
    }

    /// Makes every following write fail with `Unavailable` until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, AtomicOrdering::SeqCst);
    }

    /// Number of documents currently stored.
    pub fn document_count(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    /// Every stored document path, sorted.
    pub fn document_paths(&self) -> Vec<String> {
        self.documents
            .lock()
            .unwrap()
            .keys()
            .map(DocumentKey::canonical_string)
            .collect()
    }

    /// Number of listeners whose stream is still alive.
    pub fn active_listeners(&self) -> usize {
        let listeners = self.listeners.lock().unwrap();
        listeners
            .documents
            .iter()
            .filter(|listener| !listener.sender.is_closed())
            .count()
            + listeners
                .queries
                .iter()
                .filter(|listener| !listener.sender.is_closed())
                .count()
    }

    fn begin_write(&self, operations: usize) -> FirestoreResult<()> {
        self.writes_issued.fetch_add(operations, AtomicOrdering::SeqCst);
        self.write_requests.fetch_add(1, AtomicOrdering::SeqCst);
        if self.fail_writes.load(AtomicOrdering::SeqCst) {
            return Err(unavailable("In-memory datastore is rejecting writes"));
        }
        Ok(())
    }

    fn snapshot(&self, key: &DocumentKey) -> DocumentSnapshot {
        let documents = self.documents.lock().unwrap();
        snapshot_of(&documents, key)
    }

    fn query_documents(&self, query: &QueryDefinition) -> Vec<DocumentSnapshot> {
        let documents = self.documents.lock().unwrap();
        evaluate_query(&documents, query)
    }

    fn apply(&self, writes: Vec<WriteOperation>) -> FirestoreResult<()> {
        let changed: BTreeSet<DocumentKey> = writes.iter().map(|write| write.key().clone()).collect();
        {
            let mut documents = self.documents.lock().unwrap();
            let mut staged = documents.clone();
            for write in writes {
                apply_write(&mut staged, write)?;
            }
            *documents = staged;
        }
        self.notify(&changed);
        Ok(())
    }

    fn notify(&self, changed: &BTreeSet<DocumentKey>) {
        let touched_collections: BTreeSet<ResourcePath> =
            changed.iter().map(DocumentKey::collection_path).collect();
        let mut listeners = self.listeners.lock().unwrap();

        listeners.documents.retain_mut(|listener| {
            if listener.sender.is_closed() {
                return false;
            }
            if !changed.contains(&listener.key) {
                return true;
            }
            let current = self.snapshot(&listener.key);
            if current == listener.last {
                return true;
            }
            listener.last = current.clone();
            listener.sender.try_send(Ok(current)).is_ok()
        });

        listeners.queries.retain_mut(|listener| {
            if listener.sender.is_closed() {
                return false;
            }
            if !touched_collections.contains(listener.query.collection_path()) {
                return true;
            }
            let current = self.query_documents(&listener.query);
            if current == listener.last {
                return true;
            }
            listener.last = current.clone();
            listener.sender.try_send(Ok(current)).is_ok()
        });
    }
}

#[async_trait]
impl Datastore for InMemoryDatastore {
    async fn get_document(&self, key: &DocumentKey) -> FirestoreResult<DocumentSnapshot> {
        Ok(self.snapshot(key))
    }

    fn listen_document(&self, key: &DocumentKey) -> DocumentStream {
        let (sender, receiver) = async_channel::unbounded();
        let mut listeners = self.listeners.lock().unwrap();
        let initial = self.snapshot(key);
        // unbounded and the receiver is still held here
        let _ = sender.try_send(Ok(initial.clone()));
        listeners.documents.push(DocumentListener {
            key: key.clone(),
            last: initial,
            sender,
        });
        log::debug!("document listener opened on {key}");
        receiver.boxed()
    }

    async fn set_document(&self, key: &DocumentKey, data: MapValue) -> FirestoreResult<()> {
        self.begin_write(1)?;
        self.apply(vec![WriteOperation::Set {
            key: key.clone(),
            data,
        }])
    }

    async fn update_document(
        &self,
        key: &DocumentKey,
        data: MapValue,
        field_paths: Vec<FieldPath>,
    ) -> FirestoreResult<()> {
        self.begin_write(1)?;
        self.apply(vec![WriteOperation::Update {
            key: key.clone(),
            data,
            field_paths,
        }])
    }

    async fn delete_document(&self, key: &DocumentKey) -> FirestoreResult<()> {
        self.begin_write(1)?;
        self.apply(vec![WriteOperation::Delete { key: key.clone() }])
    }

    async fn run_query(&self, query: &QueryDefinition) -> FirestoreResult<Vec<DocumentSnapshot>> {
        Ok(self.query_documents(query))
    }

    fn listen_query(&self, query: &QueryDefinition) -> QueryStream {
        let (sender, receiver) = async_channel::unbounded();
        let mut listeners = self.listeners.lock().unwrap();
        let initial = self.query_documents(query);
        let _ = sender.try_send(Ok(initial.clone()));
        listeners.queries.push(QueryListener {
            query: query.clone(),
            last: initial,
            sender,
        });
        log::debug!("query listener opened on {}", query.collection_path());
        receiver.boxed()
    }

    async fn commit(&self, writes: Vec<WriteOperation>) -> FirestoreResult<()> {
        self.begin_write(writes.len())?;
        self.apply(writes)
    }
}

fn apply_write(documents: &mut Documents, write: WriteOperation) -> FirestoreResult<()> {
    match write {
        WriteOperation::Set { key, data } => {
            documents.insert(key, data);
        }
        WriteOperation::Update {
            key,
            data,
            field_paths,
        } => {
            let current = documents
                .get(&key)
                .ok_or_else(|| not_found(format!("Document {key} does not exist")))?;
            let mut fields = current.fields().clone();
            for path in &field_paths {
                let value = value_for_field_path(&data, path).ok_or_else(|| {
                    internal_error(format!("Failed to resolve value for update path {path}"))
                })?;
                set_value_at_field_path(&mut fields, path, value);
            }
            documents.insert(key, MapValue::new(fields));
        }
        WriteOperation::Delete { key } => {
            documents.remove(&key);
        }
    }
    Ok(())
}

fn snapshot_of(documents: &Documents, key: &DocumentKey) -> DocumentSnapshot {
    DocumentSnapshot::new(
        key.clone(),
        documents.get(key).cloned(),
        SnapshotMetadata::new(false, false),
    )
}

fn evaluate_query(documents: &Documents, query: &QueryDefinition) -> Vec<DocumentSnapshot> {
    let mut results: Vec<DocumentSnapshot> = documents
        .iter()
        .filter(|(key, _)| query.matches_collection(key))
        .map(|(key, data)| {
            DocumentSnapshot::new(key.clone(), Some(data.clone()), SnapshotMetadata::new(false, false))
        })
        .filter(|snapshot| document_satisfies_filters(snapshot, query.filters()))
        .filter(|snapshot| has_order_by_fields(snapshot, query.order_by()))
        .collect();

    results.sort_by(|left, right| compare_snapshots(left, right, query.order_by()));

    if let Some(limit) = query.limit() {
        results.truncate(limit as usize);
    }
    results
}

fn has_order_by_fields(snapshot: &DocumentSnapshot, order_by: &[OrderBy]) -> bool {
    order_by
        .iter()
        .all(|order| get_field_value(snapshot, order.field()).is_some())
}

fn document_satisfies_filters(snapshot: &DocumentSnapshot, filters: &[FieldFilter]) -> bool {
    filters
        .iter()
        .all(|filter| match get_field_value(snapshot, filter.field()) {
            Some(value) => evaluate_filter(filter, &value),
            None => false,
        })
}

fn evaluate_filter(filter: &FieldFilter, value: &FirestoreValue) -> bool {
    let ordering = || compare_values(value, filter.value());
    match filter.operator() {
        FilterOperator::Equal => value == filter.value(),
        FilterOperator::NotEqual => value != filter.value(),
        FilterOperator::LessThan => ordering() == Some(Ordering::Less),
        FilterOperator::LessThanOrEqual => {
            matches!(ordering(), Some(Ordering::Less | Ordering::Equal))
        }
        FilterOperator::GreaterThan => ordering() == Some(Ordering::Greater),
        FilterOperator::GreaterThanOrEqual => {
            matches!(ordering(), Some(Ordering::Greater | Ordering::Equal))
        }
        FilterOperator::ArrayContains => match value.kind() {
            ValueKind::Array(array) => array.contains(filter.value()),
            _ => false,
        },
        FilterOperator::In => match filter.value().kind() {
            ValueKind::Array(values) => values.contains(value),
            _ => false,
        },
    }
}

fn get_field_value(snapshot: &DocumentSnapshot, field: &FieldPath) -> Option<FirestoreValue> {
    if field.is_document_id() {
        return Some(FirestoreValue::from_reference(
            snapshot.document_key().canonical_string(),
        ));
    }
    value_for_field_path(snapshot.map_value()?, field)
}

fn compare_snapshots(left: &DocumentSnapshot, right: &DocumentSnapshot, order_by: &[OrderBy]) -> Ordering {
    for order in order_by {
        let left_value = get_field_value(left, order.field()).unwrap_or_else(FirestoreValue::null);
        let right_value = get_field_value(right, order.field()).unwrap_or_else(FirestoreValue::null);
        let mut ordering = compare_values(&left_value, &right_value)
            .unwrap_or_else(|| type_order(&left_value).cmp(&type_order(&right_value)));
        if order.direction() == OrderDirection::Descending {
            ordering = ordering.reverse();
        }
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    left.document_key().cmp(right.document_key())
}

fn compare_values(left: &FirestoreValue, right: &FirestoreValue) -> Option<Ordering> {
    match (left.kind(), right.kind()) {
        (ValueKind::Null, ValueKind::Null) => Some(Ordering::Equal),
        (ValueKind::Boolean(a), ValueKind::Boolean(b)) => Some(a.cmp(b)),
        (ValueKind::Integer(a), ValueKind::Integer(b)) => Some(a.cmp(b)),
        (ValueKind::Double(a), ValueKind::Double(b)) => a.partial_cmp(b),
        (ValueKind::Integer(a), ValueKind::Double(b)) => (*a as f64).partial_cmp(b),
        (ValueKind::Double(a), ValueKind::Integer(b)) => a.partial_cmp(&(*b as f64)),
        (ValueKind::Timestamp(a), ValueKind::Timestamp(b)) => Some(a.cmp(b)),
        (ValueKind::String(a), ValueKind::String(b)) => Some(a.cmp(b)),
        (ValueKind::Reference(a), ValueKind::Reference(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Cross-type ordering: null, booleans, numbers, timestamps, strings,
/// references, arrays, maps.
fn type_order(value: &FirestoreValue) -> u8 {
    match value.kind() {
        ValueKind::Null => 0,
        ValueKind::Boolean(_) => 1,
        ValueKind::Integer(_) | ValueKind::Double(_) => 2,
        ValueKind::Timestamp(_) => 3,
        ValueKind::String(_) => 4,
        ValueKind::Reference(_) => 5,
        ValueKind::Array(_) => 6,
        ValueKind::Map(_) => 7,
    }
}
