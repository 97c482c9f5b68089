//! Turns a read or written tree back into a plain payload that can be
//! submitted to a write again.

use crate::firestore::value::{DocumentData, FirestoreValue};

use super::item::{Child, Item};
use super::nodes::{find_node, ConfigNode};
use super::split::fields_to_list;
use super::stamper;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CleanOptions {
    /// Put `createdDate`/`modifiedDate` back as stored fields.
    pub keep_dates: bool,
    /// Fields dropped at every level.
    pub fields_to_remove: Vec<String>,
}

impl CleanOptions {
    pub fn keep_dates() -> Self {
        Self {
            keep_dates: true,
            fields_to_remove: Vec::new(),
        }
    }
}

/// Strips the envelope from `item` and folds its children back into fields.
///
/// A [`Child::List`] becomes its list again. A [`Child::Single`] that came
/// from a read, sits under a fixed id and has exactly the fields `"0".."n-1"`
/// is turned into a list too, since the store keeps no trace of which one
/// was written.
pub fn clean<N: ConfigNode>(item: &Item, nodes: &[N]) -> DocumentData {
    clean_with(item, nodes, &CleanOptions::default())
}

pub fn clean_with<N: ConfigNode>(item: &Item, nodes: &[N], options: &CleanOptions) -> DocumentData {
    let mut fields = item.data.clone();
    if options.keep_dates {
        stamper::restore_dates(item, &mut fields);
    }
    for field in &options.fields_to_remove {
        fields.remove(field);
    }

    for (name, child) in &item.children {
        let node = find_node(nodes, name);
        let child_nodes: &[N] = node.map(|node| node.children()).unwrap_or(&[]);
        let value = match child {
            Child::Single(single) => {
                let restored_list = node
                    .and_then(|node| node.fixed_child_id())
                    .filter(|_| single.metadata.snapshot_metadata.is_some() && single.children.is_empty())
                    .and_then(|_| fields_to_list(&single.data));
                match restored_list {
                    Some(values) => FirestoreValue::from_array(values),
                    None => FirestoreValue::from_map(clean_with(single, child_nodes, options)),
                }
            }
            Child::List(holder) => FirestoreValue::from_array(
                fields_to_list(&holder.data).unwrap_or_else(|| holder.data.values().cloned().collect()),
            ),
            Child::Many(items) => FirestoreValue::from_array(
                items
                    .iter()
                    .map(|entry| FirestoreValue::from_map(clean_with(entry, child_nodes, options)))
                    .collect(),
            ),
        };
        fields.insert(name.clone(), value);
    }
    fields
}

pub fn clean_many<N: ConfigNode>(items: &[Item], nodes: &[N], options: &CleanOptions) -> Vec<DocumentData> {
    items.iter().map(|item| clean_with(item, nodes, options)).collect()
}
