//! Edit script protocol.
//!
//! Invariants:
//! - Operations are applied in emitted order.
//! - Every id referenced by an operation exists at the time it is applied,
//!   except the `tagID` of an `insert`, which it creates.
//! - `delete` removes the node and its whole subtree; no later operation in
//!   the same script references any id from that subtree.
//! - `index` is the position among the parent's children at the moment the
//!   operation is applied.
//! - An `insert` or `move` with no `parentID` targets the document root slot.

use crate::types::{Attributes, Node, NodeKind};
use core_types::TagId;
use serde::{Deserialize, Serialize};

/// Content of an inserted node. Children arrive as separate inserts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodePayload {
    Element {
        #[serde(rename = "tagName")]
        tag_name: String,
        #[serde(default)]
        attributes: Attributes,
    },
    Text {
        content: String,
    },
}

impl NodePayload {
    pub fn of(node: &Node) -> Self {
        match node.kind() {
            NodeKind::Element { name, attributes } => NodePayload::Element {
                tag_name: name.clone(),
                attributes: attributes.clone(),
            },
            NodeKind::Text { text } => NodePayload::Text {
                content: text.clone(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum EditOp {
    Insert {
        #[serde(rename = "tagID")]
        tag_id: TagId,
        #[serde(rename = "parentID")]
        parent_id: Option<TagId>,
        index: usize,
        node: NodePayload,
    },
    Delete {
        #[serde(rename = "tagID")]
        tag_id: TagId,
    },
    /// Detach the node, then insert it at `index` under `parentID`. No
    /// `parentID` makes it the document root.
    Move {
        #[serde(rename = "tagID")]
        tag_id: TagId,
        #[serde(rename = "parentID")]
        parent_id: Option<TagId>,
        index: usize,
    },
    SetAttribute {
        #[serde(rename = "tagID")]
        tag_id: TagId,
        name: String,
        value: String,
    },
    RemoveAttribute {
        #[serde(rename = "tagID")]
        tag_id: TagId,
        name: String,
    },
    SetText {
        #[serde(rename = "tagID")]
        tag_id: TagId,
        content: String,
    },
}

impl EditOp {
    pub fn tag_id(&self) -> TagId {
        match self {
            EditOp::Insert { tag_id, .. }
            | EditOp::Delete { tag_id }
            | EditOp::Move { tag_id, .. }
            | EditOp::SetAttribute { tag_id, .. }
            | EditOp::RemoveAttribute { tag_id, .. }
            | EditOp::SetText { tag_id, .. } => *tag_id,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditScript(Vec<EditOp>);

impl EditScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: EditOp) {
        self.0.push(op);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ops(&self) -> &[EditOp] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EditOp> {
        self.0.iter()
    }

    pub fn into_ops(self) -> Vec<EditOp> {
        self.0
    }
}

impl From<Vec<EditOp>> for EditScript {
    fn from(ops: Vec<EditOp>) -> Self {
        Self(ops)
    }
}

impl<'a> IntoIterator for &'a EditScript {
    type Item = &'a EditOp;
    type IntoIter = std::slice::Iter<'a, EditOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
