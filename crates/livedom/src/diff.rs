//! Id-matched tree diffing to edit scripts.
//!
//! Contract:
//! - Nodes are matched by `TagId`. A node present on both sides must keep its
//!   kind and tag name; otherwise the diff fails with `KindMismatch`.
//! - Matched nodes with equal signatures are skipped with their subtrees.
//! - Output follows a pre-order walk of the new tree: attribute and text
//!   changes of a node, then placement of its children, then its children.
//! - Children that keep their parent and whose relative order is already
//!   right (a longest increasing subsequence) stay put; every other child is
//!   moved or inserted right after its previously placed sibling.
//! - Deletions come last, one per topmost removed subtree, in old pre-order,
//!   so nodes moved out of a removed subtree are never lost.
//!
//! Complexity: per changed child list of length n, O(n log n) to pick the
//! stable children, plus O(n) for each child that is moved or inserted.

use crate::edit_script::{EditOp, EditScript, NodePayload};
use crate::error::DiffError;
use crate::types::{Node, NodeKind};
use core_types::TagId;
use rustc_hash::{FxHashMap, FxHashSet};

/// Where the diffed subtree hangs in the target document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RootAnchor {
    pub parent: Option<TagId>,
    pub index: usize,
}

impl RootAnchor {
    /// The document root slot.
    pub const DOCUMENT: RootAnchor = RootAnchor {
        parent: None,
        index: 0,
    };

    pub fn child_of(parent: TagId, index: usize) -> Self {
        Self {
            parent: Some(parent),
            index,
        }
    }
}

/// Script turning `old` into `new`. Both are subtrees rooted at `anchor`.
pub fn diff_subtrees(old: &Node, new: &Node, anchor: RootAnchor) -> Result<EditScript, DiffError> {
    let mut differ = Differ::new(old, new)?;
    differ.place_root(old, new, anchor);
    differ.visit(new)?;
    differ.emit_deletions(old);
    log::debug!(
        target: "livedom.update",
        "diff {} -> {}: {} op(s)",
        old.id(),
        new.id(),
        differ.script.len()
    );
    Ok(differ.script)
}

/// Script creating `new` from nothing at `anchor`.
pub fn diff_from_empty(new: &Node, anchor: RootAnchor) -> Result<EditScript, DiffError> {
    let mut seen = FxHashSet::default();
    for node in new.descendants() {
        if !seen.insert(node.id()) {
            return Err(DiffError::DuplicateId(node.id()));
        }
    }
    let mut script = EditScript::new();
    script.push(EditOp::Insert {
        tag_id: new.id(),
        parent_id: anchor.parent,
        index: anchor.index,
        node: NodePayload::of(new),
    });
    emit_create_children(new, &mut script);
    Ok(script)
}

fn emit_create_children(node: &Node, script: &mut EditScript) {
    for (index, child) in node.children().iter().enumerate() {
        script.push(EditOp::Insert {
            tag_id: child.id(),
            parent_id: Some(node.id()),
            index,
            node: NodePayload::of(child),
        });
        emit_create_children(child, script);
    }
}

struct OldEntry<'a> {
    node: &'a Node,
    parent: Option<TagId>,
}

struct Differ<'a> {
    old: FxHashMap<TagId, OldEntry<'a>>,
    new_ids: FxHashSet<TagId>,
    /// Simulated child lists of every parent touched so far, in the order the
    /// consumer will see them while replaying.
    working: FxHashMap<TagId, Vec<TagId>>,
    /// Parents of old nodes that have been moved.
    relocated: FxHashMap<TagId, Option<TagId>>,
    script: EditScript,
}

impl<'a> Differ<'a> {
    fn new(old: &'a Node, new: &Node) -> Result<Self, DiffError> {
        let mut old_map = FxHashMap::default();
        index_old(old, None, &mut old_map)?;
        let mut new_ids = FxHashSet::default();
        for node in new.descendants() {
            if !new_ids.insert(node.id()) {
                return Err(DiffError::DuplicateId(node.id()));
            }
        }
        Ok(Self {
            old: old_map,
            new_ids,
            working: FxHashMap::default(),
            relocated: FxHashMap::default(),
            script: EditScript::new(),
        })
    }

    fn place_root(&mut self, old: &Node, new: &Node, anchor: RootAnchor) {
        if old.id() == new.id() {
            return;
        }
        // The old root stays at the anchor until the deletion pass.
        if self.old.contains_key(&new.id()) {
            self.detach(new.id());
            self.relocated.insert(new.id(), anchor.parent);
            self.script.push(EditOp::Move {
                tag_id: new.id(),
                parent_id: anchor.parent,
                index: anchor.index,
            });
        } else {
            self.script.push(EditOp::Insert {
                tag_id: new.id(),
                parent_id: anchor.parent,
                index: anchor.index,
                node: NodePayload::of(new),
            });
        }
    }

    fn visit(&mut self, node: &Node) -> Result<(), DiffError> {
        if let Some(entry) = self.old.get(&node.id()) {
            let previous = entry.node;
            if !same_kind(previous, node) {
                return Err(DiffError::KindMismatch(node.id()));
            }
            if previous.signature() == node.signature() {
                return Ok(());
            }
            self.emit_content_changes(previous, node);
        }
        self.place_children(node);
        for child in node.children() {
            self.visit(child)?;
        }
        Ok(())
    }

    fn emit_content_changes(&mut self, previous: &Node, node: &Node) {
        let tag_id = node.id();
        match (previous.kind(), node.kind()) {
            (
                NodeKind::Element {
                    attributes: before, ..
                },
                NodeKind::Element {
                    attributes: after, ..
                },
            ) => {
                for (name, value) in after {
                    if before.get(name) != Some(value) {
                        self.script.push(EditOp::SetAttribute {
                            tag_id,
                            name: name.clone(),
                            value: value.clone(),
                        });
                    }
                }
                for name in before.keys() {
                    if !after.contains_key(name) {
                        self.script.push(EditOp::RemoveAttribute {
                            tag_id,
                            name: name.clone(),
                        });
                    }
                }
            }
            (NodeKind::Text { text: before }, NodeKind::Text { text: after }) => {
                if before != after {
                    self.script.push(EditOp::SetText {
                        tag_id,
                        content: after.clone(),
                    });
                }
            }
            _ => {}
        }
    }

    fn place_children(&mut self, node: &Node) {
        let parent = node.id();
        self.ensure_working(parent);

        let keep = {
            let slot_of: FxHashMap<TagId, usize> = self
                .working
                .get(&parent)
                .map(|current| current.iter().enumerate().map(|(slot, id)| (*id, slot)).collect())
                .unwrap_or_default();
            let slots: Vec<(TagId, usize)> = node
                .children()
                .iter()
                .filter(|child| self.location(child.id()) == Some(parent))
                .filter_map(|child| slot_of.get(&child.id()).map(|slot| (child.id(), *slot)))
                .collect();
            let order: Vec<usize> = slots.iter().map(|(_, slot)| *slot).collect();
            longest_increasing_subsequence(&order)
                .into_iter()
                .map(|i| slots[i].0)
                .collect::<FxHashSet<TagId>>()
        };

        let mut previous: Option<TagId> = None;
        for child in node.children() {
            let id = child.id();
            if keep.contains(&id) {
                previous = Some(id);
                continue;
            }
            let moved = self.old.contains_key(&id);
            if moved {
                self.detach(id);
                self.relocated.insert(id, Some(parent));
            }
            let index = self.slot_after(parent, previous);
            if let Some(list) = self.working.get_mut(&parent) {
                list.insert(index, id);
            }
            self.script.push(if moved {
                EditOp::Move {
                    tag_id: id,
                    parent_id: Some(parent),
                    index,
                }
            } else {
                EditOp::Insert {
                    tag_id: id,
                    parent_id: Some(parent),
                    index,
                    node: NodePayload::of(child),
                }
            });
            previous = Some(id);
        }
    }

    fn emit_deletions(&mut self, old: &Node) {
        for node in old.descendants() {
            let id = node.id();
            if self.new_ids.contains(&id) {
                continue;
            }
            let topmost = match self.old.get(&id).and_then(|entry| entry.parent) {
                Some(parent) => self.new_ids.contains(&parent),
                None => true,
            };
            if topmost {
                self.script.push(EditOp::Delete { tag_id: id });
            }
        }
    }

    /// Current parent of an old node, accounting for moves already emitted.
    fn location(&self, id: TagId) -> Option<TagId> {
        match self.relocated.get(&id) {
            Some(parent) => *parent,
            None => self.old.get(&id).and_then(|entry| entry.parent),
        }
    }

    fn ensure_working(&mut self, parent: TagId) {
        if self.working.contains_key(&parent) {
            return;
        }
        let children = match self.old.get(&parent) {
            Some(entry) => entry.node.children().iter().map(Node::id).collect(),
            None => Vec::new(),
        };
        self.working.insert(parent, children);
    }

    fn detach(&mut self, id: TagId) {
        let Some(parent) = self.location(id) else {
            return;
        };
        self.ensure_working(parent);
        if let Some(list) = self.working.get_mut(&parent) {
            list.retain(|child| *child != id);
        }
    }

    fn slot_after(&self, parent: TagId, previous: Option<TagId>) -> usize {
        let Some(previous) = previous else {
            return 0;
        };
        self.working
            .get(&parent)
            .and_then(|list| list.iter().position(|id| *id == previous))
            .map_or(0, |slot| slot + 1)
    }
}

fn index_old<'a>(
    node: &'a Node,
    parent: Option<TagId>,
    map: &mut FxHashMap<TagId, OldEntry<'a>>,
) -> Result<(), DiffError> {
    if map.insert(node.id(), OldEntry { node, parent }).is_some() {
        return Err(DiffError::DuplicateId(node.id()));
    }
    for child in node.children() {
        index_old(child, Some(node.id()), map)?;
    }
    Ok(())
}

fn same_kind(a: &Node, b: &Node) -> bool {
    match (a.kind(), b.kind()) {
        (NodeKind::Element { name: x, .. }, NodeKind::Element { name: y, .. }) => x == y,
        (NodeKind::Text { .. }, NodeKind::Text { .. }) => true,
        _ => false,
    }
}

/// Indices (into `seq`) of one longest strictly increasing subsequence.
fn longest_increasing_subsequence(seq: &[usize]) -> Vec<usize> {
    // tails[k]: index into seq of the smallest tail of an increasing run of length k + 1.
    let mut tails: Vec<usize> = Vec::with_capacity(seq.len());
    let mut prev: Vec<Option<usize>> = vec![None; seq.len()];
    for (i, value) in seq.iter().enumerate() {
        let k = tails.partition_point(|&t| seq[t] < *value);
        if k > 0 {
            prev[i] = Some(tails[k - 1]);
        }
        if k == tails.len() {
            tails.push(i);
        } else {
            tails[k] = i;
        }
    }
    let mut out = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        out.push(i);
        cursor = prev[i];
    }
    out.reverse();
    out
}
