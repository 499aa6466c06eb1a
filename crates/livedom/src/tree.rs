//! Owned tree snapshot plus the id index over it.

use crate::builder::MarkLookup;
use crate::error::TreeError;
use crate::types::Node;
use core_types::{Position, TagId, TextRange};
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Link {
    parent: Option<TagId>,
    index: usize,
}

/// A rooted tree whose every node is reachable by id.
///
/// Nodes own their children; `links` records each node's parent and index so
/// lookups by id walk a path instead of the whole tree.
#[derive(Clone, Debug)]
pub struct Tree {
    root: Node,
    links: FxHashMap<TagId, Link>,
}

impl Tree {
    pub fn new(root: Node) -> Result<Self, TreeError> {
        let mut links = FxHashMap::default();
        index_subtree(&root, None, 0, &mut links)?;
        Ok(Self { root, links })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub(crate) fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    pub fn into_root(self) -> Node {
        self.root
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn contains(&self, id: TagId) -> bool {
        self.links.contains_key(&id)
    }

    pub fn parent_of(&self, id: TagId) -> Option<TagId> {
        self.links.get(&id).and_then(|link| link.parent)
    }

    pub fn index_in_parent(&self, id: TagId) -> Option<usize> {
        self.links.get(&id).map(|link| link.index)
    }

    pub fn get(&self, id: TagId) -> Option<&Node> {
        let path = self.path_to(id)?;
        let mut node = &self.root;
        for index in path {
            node = node.children().get(index)?;
        }
        Some(node)
    }

    /// Child indices leading from the root to `id`.
    fn path_to(&self, id: TagId) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut current = id;
        loop {
            let link = self.links.get(&current)?;
            match link.parent {
                Some(parent) => {
                    path.push(link.index);
                    current = parent;
                }
                None => break,
            }
        }
        path.reverse();
        Some(path)
    }

    /// Innermost element whose range contains `pos`. With `prefer_parent`, an
    /// element starting exactly at `pos` is skipped in favour of its parent.
    pub fn node_at(&self, pos: Position, prefer_parent: bool) -> Option<&Node> {
        let admits = |node: &Node| {
            node.is_element() && node.range().contains(pos) && !(prefer_parent && node.start() == pos)
        };
        if !admits(&self.root) {
            return None;
        }
        let mut node = &self.root;
        loop {
            let children = node.children();
            let first = children.partition_point(|child| child.end() <= pos);
            match children[first..]
                .iter()
                .take_while(|child| child.start() <= pos)
                .find(|child| admits(child))
            {
                Some(child) => node = child,
                None => return Some(node),
            }
        }
    }

    /// Tightest element strictly enclosing `range`: starting before its start
    /// and ending after its end.
    pub fn enclosing_element(&self, range: TextRange) -> Option<&Node> {
        let encloses =
            |node: &Node| node.is_element() && node.start() < range.start && node.end() > range.end;
        if !encloses(&self.root) {
            return None;
        }
        let mut node = &self.root;
        loop {
            let children = node.children();
            let first = children.partition_point(|child| child.end() <= range.end);
            match children[first..]
                .iter()
                .take_while(|child| child.start() < range.start)
                .find(|child| encloses(child))
            {
                Some(child) => node = child,
                None => return Some(node),
            }
        }
    }

    /// Swap the subtree rooted at `id` for `replacement`, returning the old
    /// subtree. Fails without modifying the tree if `id` is the root or
    /// unknown, or if `replacement` reuses an id living elsewhere in the tree.
    pub fn replace_subtree(&mut self, id: TagId, replacement: Node) -> Result<Node, TreeError> {
        let link = *self.links.get(&id).ok_or(TreeError::UnknownNode(id))?;
        let parent = link.parent.ok_or(TreeError::RootReplacement(id))?;
        let path = self.path_to(id).ok_or(TreeError::MissingParent(id))?;

        let old_ids: FxHashSet<TagId> = {
            let old = self.get(id).ok_or(TreeError::UnknownNode(id))?;
            if old.id() != id {
                return Err(TreeError::NotInParent { id, parent });
            }
            old.descendants().map(Node::id).collect()
        };
        let mut seen = FxHashSet::default();
        for node in replacement.descendants() {
            let fresh = seen.insert(node.id());
            if !fresh || (self.links.contains_key(&node.id()) && !old_ids.contains(&node.id())) {
                return Err(TreeError::DuplicateId(node.id()));
            }
        }

        for old in &old_ids {
            self.links.remove(old);
        }
        let mut links = FxHashMap::default();
        index_subtree(&replacement, Some(parent), link.index, &mut links)?;
        self.links.extend(links);

        let old = splice(&mut self.root, &path, replacement);
        log::trace!(
            target: "livedom.update",
            "spliced subtree {} -> {} under {} ({} old node(s))",
            id,
            self.get(parent)
                .and_then(|p| p.children().get(link.index))
                .map_or(TagId::INVALID, Node::id),
            parent,
            old_ids.len()
        );
        Ok(old)
    }

    /// Every node id with its current range, in document order.
    pub fn spans(&self) -> Vec<(TagId, TextRange)> {
        self.root.descendants().map(|node| (node.id(), node.range())).collect()
    }
}

impl MarkLookup for Tree {
    fn id_at(&self, pos: Position, prefer_parent: bool) -> Option<TagId> {
        self.node_at(pos, prefer_parent).map(Node::id)
    }
}

fn index_subtree(
    node: &Node,
    parent: Option<TagId>,
    index: usize,
    links: &mut FxHashMap<TagId, Link>,
) -> Result<(), TreeError> {
    if links.insert(node.id(), Link { parent, index }).is_some() {
        return Err(TreeError::DuplicateId(node.id()));
    }
    for (child_index, child) in node.children().iter().enumerate() {
        index_subtree(child, Some(node.id()), child_index, links)?;
    }
    Ok(())
}

/// Replace the node at `path` (non-empty) and refresh signatures of every
/// ancestor on the way back up.
fn splice(node: &mut Node, path: &[usize], replacement: Node) -> Node {
    let (&index, rest) = match path.split_first() {
        Some(split) => split,
        None => return std::mem::replace(node, replacement),
    };
    let old = if rest.is_empty() {
        std::mem::replace(&mut node.children_mut()[index], replacement)
    } else {
        splice(&mut node.children_mut()[index], rest, replacement)
    };
    node.refresh_signature();
    old
}
