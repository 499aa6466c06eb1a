use core_types::{Position, TagId, TextRange};
use rustc_hash::FxHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Attribute name -> value. Names are ASCII-lowercase; valueless attributes map
/// to the empty string. Ordering is by name, which keeps diffs deterministic.
pub type Attributes = BTreeMap<String, String>;

/// Fingerprint of a subtree: ids, tag names, attributes, text, and the
/// signatures of all children. Equal signatures mean the diff can skip the
/// subtree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Signature(pub u64);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Element { name: String, attributes: Attributes },
    Text { text: String },
}

/// One element or text run of a tree snapshot.
///
/// Parents own their children; the child -> parent relation lives in the
/// owning `Tree`'s index, never in the node.
#[derive(Clone, Debug)]
pub struct Node {
    id: TagId,
    kind: NodeKind,
    start: Position,
    end: Position,
    children: Vec<Node>,
    signature: Signature,
}

impl Node {
    pub fn element(
        id: TagId,
        name: impl Into<String>,
        attributes: Attributes,
        range: TextRange,
        children: Vec<Node>,
    ) -> Self {
        let mut node = Node {
            id,
            kind: NodeKind::Element {
                name: name.into(),
                attributes,
            },
            start: range.start,
            end: range.end,
            children,
            signature: Signature(0),
        };
        node.refresh_signature();
        node
    }

    pub fn text(id: TagId, text: impl Into<String>, range: TextRange) -> Self {
        let mut node = Node {
            id,
            kind: NodeKind::Text { text: text.into() },
            start: range.start,
            end: range.end,
            children: Vec::new(),
            signature: Signature(0),
        };
        node.refresh_signature();
        node
    }

    pub fn id(&self) -> TagId {
        self.id
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element { .. })
    }

    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { name, .. } => Some(name),
            NodeKind::Text { .. } => None,
        }
    }

    pub fn attributes(&self) -> Option<&Attributes> {
        match &self.kind {
            NodeKind::Element { attributes, .. } => Some(attributes),
            NodeKind::Text { .. } => None,
        }
    }

    pub fn text_content(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text { text } => Some(text),
            NodeKind::Element { .. } => None,
        }
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn end(&self) -> Position {
        self.end
    }

    pub fn range(&self) -> TextRange {
        TextRange {
            start: self.start,
            end: self.end,
        }
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn signature(&self) -> Signature {
        self.signature
    }

    /// Pre-order iterator over this node and all of its descendants.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    pub(crate) fn set_range(&mut self, start: Position, end: Position) {
        self.start = start;
        self.end = end;
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    /// Recompute this node's signature from its own content and the (already
    /// current) signatures of its children.
    pub(crate) fn refresh_signature(&mut self) {
        let mut hasher = FxHasher::default();
        self.id.hash(&mut hasher);
        match &self.kind {
            NodeKind::Element { name, attributes } => {
                0u8.hash(&mut hasher);
                name.hash(&mut hasher);
                attributes.len().hash(&mut hasher);
                for (key, value) in attributes {
                    key.hash(&mut hasher);
                    value.hash(&mut hasher);
                }
            }
            NodeKind::Text { text } => {
                1u8.hash(&mut hasher);
                text.hash(&mut hasher);
            }
        }
        self.children.len().hash(&mut hasher);
        for child in &self.children {
            child.signature.0.hash(&mut hasher);
        }
        self.signature = Signature(hasher.finish());
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
