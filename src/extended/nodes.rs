use serde::{Deserialize, Serialize};

use crate::firestore::api::QueryConstraint;

/// Declares that the object key `name` is persisted as a child collection.
///
/// With `fixed_child_id` the value (list or object) lands in a single child
/// document under that id. Without it, a list becomes one child document per
/// element and an object one child document under the configured default id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriterNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_child_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<WriterNode>,
}

impl WriterNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fixed_child_id: None,
            children: Vec::new(),
        }
    }

    pub fn with_fixed_child_id(mut self, id: impl Into<String>) -> Self {
        self.fixed_child_id = Some(id.into());
        self
    }

    pub fn with_children(mut self, children: Vec<WriterNode>) -> Self {
        self.children = children;
        self
    }
}

/// Read-side mirror of [`WriterNode`] carrying the constraints applied to the
/// child collection query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryNode {
    pub name: String,
    pub fixed_child_id: Option<String>,
    pub constraints: Vec<QueryConstraint>,
    pub children: Vec<QueryNode>,
}

impl QueryNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fixed_child_id: None,
            constraints: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_fixed_child_id(mut self, id: impl Into<String>) -> Self {
        self.fixed_child_id = Some(id.into());
        self
    }

    pub fn with_constraint(mut self, constraint: QueryConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_children(mut self, children: Vec<QueryNode>) -> Self {
        self.children = children;
        self
    }
}

impl From<&QueryNode> for WriterNode {
    fn from(node: &QueryNode) -> Self {
        Self {
            name: node.name.clone(),
            fixed_child_id: node.fixed_child_id.clone(),
            children: writer_nodes_from_queries(&node.children),
        }
    }
}

/// Derives the writer tree matching a query tree (constraints are dropped).
pub fn writer_nodes_from_queries(nodes: &[QueryNode]) -> Vec<WriterNode> {
    nodes.iter().map(WriterNode::from).collect()
}

/// Shared view over both node kinds, so walks that only need names and ids
/// accept either tree.
pub trait ConfigNode: Sized {
    fn name(&self) -> &str;
    fn fixed_child_id(&self) -> Option<&str>;
    fn children(&self) -> &[Self];
}

impl ConfigNode for WriterNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn fixed_child_id(&self) -> Option<&str> {
        self.fixed_child_id.as_deref()
    }

    fn children(&self) -> &[Self] {
        &self.children
    }
}

impl ConfigNode for QueryNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn fixed_child_id(&self) -> Option<&str> {
        self.fixed_child_id.as_deref()
    }

    fn children(&self) -> &[Self] {
        &self.children
    }
}

pub(crate) fn find_node<'a, N: ConfigNode>(nodes: &'a [N], name: &str) -> Option<&'a N> {
    nodes.iter().find(|node| node.name() == name)
}
