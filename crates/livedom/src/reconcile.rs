//! Drift detection against an externally observed tree.
//!
//! The observed tree is what a renderer reports back: elements carry the
//! engine id in the reserved attribute (when the renderer preserved it), text
//! runs carry nothing. The reconciler maps it into the local id space and
//! diffs it toward the local tree, producing the corrective script.

use crate::config::SyncConfig;
use crate::diff::{RootAnchor, diff_subtrees};
use crate::edit_script::EditScript;
use crate::error::DiffError;
use crate::tree::Tree;
use crate::types::{Attributes, Node};
use core_types::{TagId, TextRange};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Serialized snapshot of the rendered document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ObservedNode {
    Element {
        tag: String,
        #[serde(default)]
        attributes: Attributes,
        #[serde(default)]
        children: Vec<ObservedNode>,
    },
    Text {
        content: String,
    },
}

#[derive(Clone, Debug)]
pub struct Reconciliation {
    /// Observed subtree that was compared against the local root, in local ids.
    pub root: Node,
    /// True when no observed element carried the local root's id.
    pub used_fallback_root: bool,
    /// Operations that bring the observed state back to the local tree.
    pub script: EditScript,
}

pub struct Reconciler {
    id_attribute: String,
}

impl Reconciler {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            id_attribute: config.id_attribute.clone(),
        }
    }

    /// Map `observed` into the local id space, stripping the id attribute.
    ///
    /// Elements without a usable id (missing, malformed, duplicated, or naming
    /// a local element with a different tag) get foreign ids, so the diff
    /// treats them as nodes the source never had.
    pub fn adapt(&self, local: &Tree, observed: &ObservedNode) -> Node {
        let mut state = AdaptState {
            id_attribute: &self.id_attribute,
            local,
            claimed: FxHashSet::default(),
            next_foreign: 1,
        };
        match observed {
            ObservedNode::Element { .. } => state.adapt_node(observed, None, 0),
            // A bare text root has no parent to derive an id from.
            ObservedNode::Text { content } => {
                let id = state.foreign_id();
                Node::text(TagId::text(id, 0), content.clone(), TextRange::default())
            }
        }
    }

    pub fn reconcile(
        &self,
        local: &Tree,
        observed: &ObservedNode,
    ) -> Result<Reconciliation, DiffError> {
        let adapted = self.adapt(local, observed);
        let target = local.root().id();
        let (root, anchor, used_fallback_root) = match find_with_anchor(&adapted, target, None, 0) {
            Some((node, anchor)) => (node.clone(), anchor, false),
            None => {
                log::debug!(
                    target: "livedom.reconcile",
                    "local root {target} not found in observed tree; comparing from its root"
                );
                (adapted, RootAnchor::DOCUMENT, true)
            }
        };
        let script = diff_subtrees(&root, local.root(), anchor)?;
        log::debug!(
            target: "livedom.reconcile",
            "drift script has {} op(s){}",
            script.len(),
            if used_fallback_root { " (fallback root)" } else { "" }
        );
        Ok(Reconciliation {
            root,
            used_fallback_root,
            script,
        })
    }
}

struct AdaptState<'a> {
    id_attribute: &'a str,
    local: &'a Tree,
    claimed: FxHashSet<TagId>,
    next_foreign: u32,
}

impl AdaptState<'_> {
    fn foreign_id(&mut self) -> TagId {
        let id = TagId::foreign(self.next_foreign);
        self.next_foreign = self.next_foreign.wrapping_add(1).max(1);
        id
    }

    fn adapt_node(&mut self, observed: &ObservedNode, parent: Option<TagId>, index: usize) -> Node {
        match observed {
            ObservedNode::Text { content } => {
                let parent = parent.unwrap_or(TagId::INVALID);
                Node::text(TagId::text(parent, index), content.clone(), TextRange::default())
            }
            ObservedNode::Element {
                tag,
                attributes,
                children,
            } => {
                let name = tag.to_ascii_lowercase();
                let mut attributes = attributes.clone();
                let claimed = attributes.remove(self.id_attribute);
                let id = match claimed.as_deref().and_then(|raw| self.accept(raw, &name)) {
                    Some(id) => id,
                    None => {
                        let id = self.foreign_id();
                        log::trace!(
                            target: "livedom.reconcile",
                            "<{name}> with id attribute {claimed:?} mapped to foreign id {id}"
                        );
                        id
                    }
                };
                let children = children
                    .iter()
                    .enumerate()
                    .map(|(i, child)| self.adapt_node(child, Some(id), i))
                    .collect();
                Node::element(id, name, attributes, TextRange::default(), children)
            }
        }
    }

    fn accept(&mut self, raw: &str, name: &str) -> Option<TagId> {
        let id = TagId(raw.trim().parse::<u64>().ok()?);
        if id == TagId::INVALID || id.is_text() || self.claimed.contains(&id) {
            return None;
        }
        if let Some(local) = self.local.get(id) {
            if local.name() != Some(name) {
                return None;
            }
        }
        self.claimed.insert(id);
        Some(id)
    }
}

fn find_with_anchor(
    node: &Node,
    target: TagId,
    parent: Option<TagId>,
    index: usize,
) -> Option<(&Node, RootAnchor)> {
    if node.id() == target {
        return Some((node, RootAnchor { parent, index }));
    }
    node.children()
        .iter()
        .enumerate()
        .find_map(|(i, child)| find_with_anchor(child, target, Some(node.id()), i))
}
