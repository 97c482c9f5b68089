use std::collections::BTreeMap;

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::{DocumentKey, FieldPath};
use crate::firestore::value::{DocumentData, FirestoreValue, MapValue, ValueKind};

/// Update payload split into the values to write and the field paths they replace.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedUpdateData {
    pub map: MapValue,
    pub field_paths: Vec<FieldPath>,
}

/// Interprets every top-level key as a dotted field path.
///
/// `{"address.city": "Roma"}` replaces only `city` inside `address`, while
/// `{"address": {...}}` replaces the whole map.
pub fn encode_update_data(data: DocumentData) -> FirestoreResult<EncodedUpdateData> {
    if data.is_empty() {
        return Err(invalid_argument(
            "update requires at least one field/value pair",
        ));
    }
    let mut fields = BTreeMap::new();
    let mut field_paths: Vec<FieldPath> = Vec::with_capacity(data.len());
    for (key, value) in data {
        let path = FieldPath::from_dot_separated(&key)?;
        if let Some(conflict) = field_paths
            .iter()
            .find(|existing| is_prefix(existing, &path) || is_prefix(&path, existing))
        {
            return Err(invalid_argument(format!(
                "Field paths '{conflict}' and '{path}' overlap in one update"
            )));
        }
        set_value_at_field_path(&mut fields, &path, value);
        field_paths.push(path);
    }
    Ok(EncodedUpdateData {
        map: MapValue::new(fields),
        field_paths,
    })
}

pub fn validate_document_path(path: &str) -> FirestoreResult<DocumentKey> {
    DocumentKey::from_string(path)
}

fn is_prefix(prefix: &FieldPath, path: &FieldPath) -> bool {
    prefix.segments().len() <= path.segments().len()
        && prefix
            .segments()
            .iter()
            .zip(path.segments())
            .all(|(l, r)| l == r)
}

pub(crate) fn value_for_field_path(map: &MapValue, path: &FieldPath) -> Option<FirestoreValue> {
    value_for_segments(map.fields(), path.segments())
}

fn value_for_segments(
    fields: &BTreeMap<String, FirestoreValue>,
    segments: &[String],
) -> Option<FirestoreValue> {
    let (first, rest) = segments.split_first()?;
    let value = fields.get(first)?;
    if rest.is_empty() {
        return Some(value.clone());
    }
    match value.kind() {
        ValueKind::Map(child) => value_for_segments(child.fields(), rest),
        _ => None,
    }
}

/// Writes `value` at `path`, creating intermediate maps and replacing
/// non-map values in the way.
pub(crate) fn set_value_at_field_path(
    fields: &mut BTreeMap<String, FirestoreValue>,
    path: &FieldPath,
    value: FirestoreValue,
) {
    set_value_at_segments(fields, path.segments(), value);
}

fn set_value_at_segments(
    fields: &mut BTreeMap<String, FirestoreValue>,
    segments: &[String],
    value: FirestoreValue,
) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        fields.insert(first.clone(), value);
        return;
    }

    let mut child_fields = match fields.get(first).map(FirestoreValue::kind) {
        Some(ValueKind::Map(map)) => map.fields().clone(),
        _ => BTreeMap::new(),
    };
    set_value_at_segments(&mut child_fields, rest, value);
    fields.insert(first.clone(), FirestoreValue::from_map(child_fields));
}
