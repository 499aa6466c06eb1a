//! Reference consumer of edit scripts, used to check that a script really
//! turns one tree into another.

use crate::edit_script::{EditOp, EditScript, NodePayload};
use crate::types::{Attributes, Node};
use core_types::{TagId, TextRange};
use rustc_hash::FxHashMap;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplayError {
    DuplicateId(TagId),
    MissingNode(TagId),
    MissingParent(TagId),
    IndexOutOfBounds { parent: TagId, index: usize },
    NotAnElement(TagId),
    NotText(TagId),
    Cycle(TagId),
    MissingRoot,
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayError::DuplicateId(id) => write!(f, "id {id} already exists"),
            ReplayError::MissingNode(id) => write!(f, "node {id} does not exist"),
            ReplayError::MissingParent(id) => write!(f, "parent {id} does not exist"),
            ReplayError::IndexOutOfBounds { parent, index } => {
                write!(f, "index {index} out of bounds under {parent}")
            }
            ReplayError::NotAnElement(id) => write!(f, "node {id} is not an element"),
            ReplayError::NotText(id) => write!(f, "node {id} is not a text node"),
            ReplayError::Cycle(id) => write!(f, "moving {id} would create a cycle"),
            ReplayError::MissingRoot => f.write_str("no root node"),
        }
    }
}

impl std::error::Error for ReplayError {}

#[derive(Clone, Debug)]
struct ReplayNode {
    payload: NodePayload,
    parent: Option<TagId>,
    children: Vec<TagId>,
}

/// Arena of nodes keyed by id, mutated by applying edit scripts in order.
#[derive(Clone, Debug, Default)]
pub struct ScriptReplayer {
    nodes: FxHashMap<TagId, ReplayNode>,
    root: Option<TagId>,
}

impl ScriptReplayer {
    pub fn from_node(root: &Node) -> Result<Self, ReplayError> {
        let mut replayer = Self::default();
        replayer.insert_from_node(root, None)?;
        replayer.root = Some(root.id());
        Ok(replayer)
    }

    fn insert_from_node(&mut self, node: &Node, parent: Option<TagId>) -> Result<(), ReplayError> {
        if self.nodes.contains_key(&node.id()) {
            return Err(ReplayError::DuplicateId(node.id()));
        }
        self.nodes.insert(
            node.id(),
            ReplayNode {
                payload: NodePayload::of(node),
                parent,
                children: node.children().iter().map(Node::id).collect(),
            },
        );
        for child in node.children() {
            self.insert_from_node(child, Some(node.id()))?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn apply(&mut self, script: &EditScript) -> Result<(), ReplayError> {
        for op in script {
            self.apply_op(op)?;
        }
        Ok(())
    }

    pub fn apply_op(&mut self, op: &EditOp) -> Result<(), ReplayError> {
        match op {
            EditOp::Insert {
                tag_id,
                parent_id,
                index,
                node,
            } => {
                if self.nodes.contains_key(tag_id) {
                    return Err(ReplayError::DuplicateId(*tag_id));
                }
                self.nodes.insert(
                    *tag_id,
                    ReplayNode {
                        payload: node.clone(),
                        parent: None,
                        children: Vec::new(),
                    },
                );
                self.attach(*tag_id, *parent_id, *index)
            }
            EditOp::Delete { tag_id } => {
                if !self.nodes.contains_key(tag_id) {
                    return Err(ReplayError::MissingNode(*tag_id));
                }
                self.detach(*tag_id);
                self.remove_subtree(*tag_id);
                Ok(())
            }
            EditOp::Move {
                tag_id,
                parent_id,
                index,
            } => {
                if !self.nodes.contains_key(tag_id) {
                    return Err(ReplayError::MissingNode(*tag_id));
                }
                if let Some(parent) = parent_id {
                    if self.is_ancestor_or_self(*tag_id, *parent) {
                        return Err(ReplayError::Cycle(*tag_id));
                    }
                }
                self.detach(*tag_id);
                self.attach(*tag_id, *parent_id, *index)
            }
            EditOp::SetAttribute {
                tag_id,
                name,
                value,
            } => {
                self.attributes_mut(*tag_id)?
                    .insert(name.clone(), value.clone());
                Ok(())
            }
            EditOp::RemoveAttribute { tag_id, name } => {
                self.attributes_mut(*tag_id)?.remove(name);
                Ok(())
            }
            EditOp::SetText { tag_id, content } => {
                let node = self
                    .nodes
                    .get_mut(tag_id)
                    .ok_or(ReplayError::MissingNode(*tag_id))?;
                match &mut node.payload {
                    NodePayload::Text { content: existing } => {
                        *existing = content.clone();
                        Ok(())
                    }
                    NodePayload::Element { .. } => Err(ReplayError::NotText(*tag_id)),
                }
            }
        }
    }

    fn attributes_mut(&mut self, id: TagId) -> Result<&mut Attributes, ReplayError> {
        let node = self.nodes.get_mut(&id).ok_or(ReplayError::MissingNode(id))?;
        match &mut node.payload {
            NodePayload::Element { attributes, .. } => Ok(attributes),
            NodePayload::Text { .. } => Err(ReplayError::NotAnElement(id)),
        }
    }

    fn attach(&mut self, id: TagId, parent: Option<TagId>, index: usize) -> Result<(), ReplayError> {
        let Some(parent) = parent else {
            self.root = Some(id);
            return Ok(());
        };
        let parent_node = self
            .nodes
            .get_mut(&parent)
            .ok_or(ReplayError::MissingParent(parent))?;
        if !matches!(parent_node.payload, NodePayload::Element { .. }) {
            return Err(ReplayError::NotAnElement(parent));
        }
        if index > parent_node.children.len() {
            return Err(ReplayError::IndexOutOfBounds { parent, index });
        }
        parent_node.children.insert(index, id);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = Some(parent);
        }
        Ok(())
    }

    fn detach(&mut self, id: TagId) {
        let parent = self.nodes.get_mut(&id).and_then(|node| node.parent.take());
        match parent {
            Some(parent) => {
                if let Some(parent_node) = self.nodes.get_mut(&parent) {
                    parent_node.children.retain(|child| *child != id);
                }
            }
            None => {
                if self.root == Some(id) {
                    self.root = None;
                }
            }
        }
    }

    fn remove_subtree(&mut self, id: TagId) {
        let Some(node) = self.nodes.remove(&id) else {
            return;
        };
        for child in node.children {
            self.remove_subtree(child);
        }
    }

    fn is_ancestor_or_self(&self, ancestor: TagId, mut node: TagId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes.get(&node).and_then(|n| n.parent) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    /// Rebuild the current tree. Ranges are left empty.
    pub fn materialize(&self) -> Result<Node, ReplayError> {
        let root = self.root.ok_or(ReplayError::MissingRoot)?;
        self.materialize_node(root)
    }

    fn materialize_node(&self, id: TagId) -> Result<Node, ReplayError> {
        let node = self.nodes.get(&id).ok_or(ReplayError::MissingNode(id))?;
        let children = node
            .children
            .iter()
            .map(|child| self.materialize_node(*child))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(match &node.payload {
            NodePayload::Element {
                tag_name,
                attributes,
            } => Node::element(
                id,
                tag_name.clone(),
                attributes.clone(),
                TextRange::default(),
                children,
            ),
            NodePayload::Text { content } => Node::text(id, content.clone(), TextRange::default()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(name: &str) -> NodePayload {
        NodePayload::Element {
            tag_name: name.into(),
            attributes: Attributes::new(),
        }
    }

    #[test]
    fn rejects_inconsistent_scripts() {
        let mut replayer = ScriptReplayer::default();
        replayer
            .apply_op(&EditOp::Insert {
                tag_id: TagId::element(1),
                parent_id: None,
                index: 0,
                node: element("div"),
            })
            .expect("root insert");
        assert_eq!(
            replayer.apply_op(&EditOp::Insert {
                tag_id: TagId::element(2),
                parent_id: Some(TagId::element(1)),
                index: 3,
                node: element("p"),
            }),
            Err(ReplayError::IndexOutOfBounds {
                parent: TagId::element(1),
                index: 3
            })
        );
        assert_eq!(
            replayer.apply_op(&EditOp::Delete {
                tag_id: TagId::element(9)
            }),
            Err(ReplayError::MissingNode(TagId::element(9)))
        );
        assert_eq!(
            replayer.apply_op(&EditOp::Move {
                tag_id: TagId::element(1),
                parent_id: Some(TagId::element(1)),
                index: 0,
            }),
            Err(ReplayError::Cycle(TagId::element(1)))
        );
        assert_eq!(
            replayer.apply_op(&EditOp::SetText {
                tag_id: TagId::element(1),
                content: "x".into(),
            }),
            Err(ReplayError::NotText(TagId::element(1)))
        );
    }

    #[test]
    fn delete_removes_whole_subtree() {
        let leaf = Node::text(TagId::text(TagId::element(2), 0), "x", TextRange::default());
        let p = Node::element(TagId::element(2), "p", Attributes::new(), TextRange::default(), vec![leaf]);
        let root = Node::element(TagId::element(1), "div", Attributes::new(), TextRange::default(), vec![p]);
        let mut replayer = ScriptReplayer::from_node(&root).expect("init");
        assert_eq!(replayer.len(), 3);
        replayer
            .apply_op(&EditOp::Delete {
                tag_id: TagId::element(2),
            })
            .expect("delete");
        assert_eq!(replayer.len(), 1);
        let tree = replayer.materialize().expect("materialize");
        assert!(tree.children().is_empty());
    }
}
