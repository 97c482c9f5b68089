//! Separates a nested payload into the fields of the current document and
//! the values destined for child collections.

use std::collections::BTreeMap;

use crate::firestore::error::{invalid_argument, invalid_writer_config, FirestoreResult};
use crate::firestore::value::{DocumentData, FirestoreValue, ValueKind};

use super::nodes::{find_node, WriterNode};

/// Value handed to a tree write.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Fields(DocumentData),
    /// Only valid under an explicit id, where it is stored as one document
    /// keyed `"0".."n-1"`.
    List(Vec<FirestoreValue>),
}

impl From<DocumentData> for Payload {
    fn from(fields: DocumentData) -> Self {
        Payload::Fields(fields)
    }
}

impl From<Vec<FirestoreValue>> for Payload {
    fn from(values: Vec<FirestoreValue>) -> Self {
        Payload::List(values)
    }
}

impl Payload {
    pub(crate) fn from_value(name: &str, value: FirestoreValue) -> FirestoreResult<Self> {
        match value.into_kind() {
            ValueKind::Map(map) => Ok(Payload::Fields(map.into_fields())),
            ValueKind::Array(array) => Ok(Payload::List(array.into_values())),
            _ => Err(invalid_argument(format!(
                "Value of '{name}' must be a map or a list to be stored as a child collection"
            ))),
        }
    }
}

/// One level of a split payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Split {
    pub local_fields: DocumentData,
    pub child_payloads: BTreeMap<String, FirestoreValue>,
}

/// Splits one level of `payload`.
///
/// A list is only accepted with `fixed_child_id` and no writer nodes; it
/// comes back as local fields keyed by position.
pub fn split(payload: Payload, nodes: &[WriterNode], fixed_child_id: Option<&str>) -> FirestoreResult<Split> {
    match payload {
        Payload::Fields(fields) => Ok(split_fields(fields, nodes)),
        Payload::List(values) => {
            let Some(id) = fixed_child_id else {
                return Err(invalid_argument("A list payload needs an explicit document id"));
            };
            if !nodes.is_empty() {
                return Err(invalid_writer_config(format!(
                    "Document '{id}' stores a list and cannot also have sub collection writers"
                )));
            }
            Ok(Split {
                local_fields: list_to_fields(values),
                child_payloads: BTreeMap::new(),
            })
        }
    }
}

/// Moves every key named by a writer node into the child payloads.
pub fn split_fields(fields: DocumentData, nodes: &[WriterNode]) -> Split {
    let mut split = Split::default();
    for (key, value) in fields {
        if find_node(nodes, &key).is_some() {
            split.child_payloads.insert(key, value);
        } else {
            split.local_fields.insert(key, value);
        }
    }
    split
}

/// Checks a whole add payload against its writer tree without touching the store.
pub fn validate_tree(payload: &Payload, nodes: &[WriterNode], fixed_child_id: Option<&str>) -> FirestoreResult<()> {
    match payload {
        Payload::List(_) => {
            // Runs the same checks `split` applies to a list level.
            split(Payload::List(Vec::new()), nodes, fixed_child_id).map(|_| ())
        }
        Payload::Fields(fields) => {
            for (key, value) in fields {
                let Some(node) = find_node(nodes, key) else {
                    continue;
                };
                match value.kind() {
                    ValueKind::Map(map) => {
                        validate_tree(&Payload::Fields(map.fields().clone()), &node.children, None)?;
                    }
                    ValueKind::Array(array) => match node.fixed_child_id.as_deref() {
                        Some(id) => {
                            validate_tree(&Payload::List(Vec::new()), &node.children, Some(id))?;
                        }
                        None => {
                            for entry in array.values() {
                                let map = entry.as_map().ok_or_else(|| {
                                    invalid_argument(format!(
                                        "Entries of '{key}' must be maps to be stored as documents"
                                    ))
                                })?;
                                validate_tree(&Payload::Fields(map.clone()), &node.children, None)?;
                            }
                        }
                    },
                    _ => {
                        return Err(invalid_argument(format!(
                            "Value of '{key}' must be a map or a list to be stored as a child collection"
                        )))
                    }
                }
            }
            Ok(())
        }
    }
}

/// Checks a partial update against its writer tree. Lists are only
/// addressable under a fixed id.
pub fn validate_update_tree(fields: &DocumentData, nodes: &[WriterNode]) -> FirestoreResult<()> {
    for (key, value) in fields {
        let Some(node) = find_node(nodes, key) else {
            continue;
        };
        match value.kind() {
            ValueKind::Map(map) => validate_update_tree(map.fields(), &node.children)?,
            ValueKind::Array(_) => match node.fixed_child_id.as_deref() {
                Some(id) => {
                    split(Payload::List(Vec::new()), &node.children, Some(id))?;
                }
                None => {
                    return Err(invalid_writer_config(format!(
                        "Cannot update list '{key}': its documents have generated ids"
                    )))
                }
            },
            _ => {
                return Err(invalid_argument(format!(
                    "Value of '{key}' must be a map or a list to update a child collection"
                )))
            }
        }
    }
    Ok(())
}

pub(crate) fn list_to_fields(values: Vec<FirestoreValue>) -> DocumentData {
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| (index.to_string(), value))
        .collect()
}

/// Inverse of [`list_to_fields`]; `None` unless the keys are exactly `"0".."n-1"`.
pub(crate) fn fields_to_list(fields: &DocumentData) -> Option<Vec<FirestoreValue>> {
    if fields.is_empty() {
        return None;
    }
    (0..fields.len())
        .map(|index| fields.get(&index.to_string()).cloned())
        .collect()
}
