//! Conversion between [`FirestoreValue`] trees and `serde_json::Value`.
//!
//! Timestamps leave the store as RFC 3339 strings and references as their
//! document path, so the JSON side never sees store-only kinds.

use std::collections::BTreeMap;

use chrono::SecondsFormat;
use serde_json::{Map, Number, Value};

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::value::{DocumentData, FirestoreValue, ValueKind};

impl FirestoreValue {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => FirestoreValue::null(),
            Value::Bool(flag) => FirestoreValue::from_bool(flag),
            Value::Number(number) => match number.as_i64() {
                Some(integer) => FirestoreValue::from_integer(integer),
                None => FirestoreValue::from_double(number.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(text) => FirestoreValue::from_string(text),
            Value::Array(values) => {
                FirestoreValue::from_array(values.into_iter().map(FirestoreValue::from_json).collect())
            }
            Value::Object(fields) => FirestoreValue::from_map(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, FirestoreValue::from_json(value)))
                    .collect(),
            ),
        }
    }

    pub fn to_json(&self) -> Value {
        match self.kind() {
            ValueKind::Null => Value::Null,
            ValueKind::Boolean(flag) => Value::Bool(*flag),
            ValueKind::Integer(integer) => Value::Number((*integer).into()),
            ValueKind::Double(double) => Number::from_f64(*double)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ValueKind::Timestamp(timestamp) => match timestamp.to_datetime() {
                Some(instant) => {
                    Value::String(instant.to_rfc3339_opts(SecondsFormat::AutoSi, true))
                }
                None => Value::Null,
            },
            ValueKind::String(text) => Value::String(text.clone()),
            ValueKind::Reference(path) => Value::String(path.clone()),
            ValueKind::Array(array) => {
                Value::Array(array.values().iter().map(FirestoreValue::to_json).collect())
            }
            ValueKind::Map(map) => Value::Object(fields_to_json(map.fields())),
        }
    }
}

/// Builds document fields from a JSON object.
pub fn document_from_json(value: Value) -> FirestoreResult<DocumentData> {
    match value {
        Value::Object(fields) => Ok(fields
            .into_iter()
            .map(|(key, value)| (key, FirestoreValue::from_json(value)))
            .collect()),
        other => Err(invalid_argument(format!(
            "Document data must be a JSON object, got {other}"
        ))),
    }
}

pub fn document_to_json(data: &DocumentData) -> Value {
    Value::Object(fields_to_json(data))
}

fn fields_to_json(fields: &BTreeMap<String, FirestoreValue>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect()
}
