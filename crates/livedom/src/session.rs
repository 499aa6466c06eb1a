//! Editing session: owns the current tree and turns text edits into edit
//! scripts, reparsing only the affected element when the edit cannot change
//! structure.
//!
//! State machine per update:
//! - every delta first shifts the cached tree's positions;
//! - a single text-only delta strictly inside a non-root element takes the
//!   incremental path: that element's span is reparsed with id reuse, diffed
//!   against the old subtree, and spliced in;
//! - anything else, or any failure on the incremental path, takes the full
//!   path: the whole text is reparsed with id reuse and diffed against the
//!   whole tree.
//!
//! A failed full parse keeps the last valid tree (with shifted positions) and
//! marks the session dirty. No script is produced until the text parses
//! again; the next successful update then covers everything since the last
//! script.

use crate::builder::{FreshIds, PreserveIds, TreeBuilder, implied_closes};
use crate::classify::{EditClass, classify};
use crate::config::SyncConfig;
use crate::delta::EditDelta;
use crate::diff::{RootAnchor, diff_from_empty, diff_subtrees};
use crate::edit_script::EditScript;
use crate::error::{DiffError, InstrumentError, UpdateError};
use crate::ids::IdGenerator;
use crate::instrument::instrument;
use crate::line_index::LineIndex;
use crate::reconcile::{ObservedNode, Reconciler, Reconciliation};
use crate::scanner::{MarkupScanner, TagScanner};
use crate::tracker::shift_positions;
use crate::tree::Tree;
use crate::types::Node;
use core_types::{Position, TagId, TextRange};
use rustc_hash::FxHashSet;

/// Why an update took the full path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FullReason {
    Load,
    NoPreviousTree,
    Disabled,
    /// Zero or several deltas in one update.
    DeltaCount,
    Dirty,
    StructuralEdit,
    NoEnclosingElement,
    EnclosingIsRoot,
    StalePositions,
    SubtreeParse,
    /// The reparsed element got a new id, so its tag name changed.
    SubtreeRenamed,
    /// The reparsed element's start tag would implicitly close one of its
    /// ancestors in the full document.
    ClosesAncestor,
    SubtreeDiff,
    SpliceFailed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdatePath {
    Incremental { reparsed: TagId },
    Full(FullReason),
}

/// New coordinates for the caller's boundary-marker store.
///
/// On the incremental path `upserted` covers the reparsed subtree only;
/// nodes outside it moved with the text and need no update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarkerUpdate {
    pub upserted: Vec<(TagId, TextRange)>,
    pub removed: Vec<TagId>,
}

#[derive(Clone, Debug)]
pub struct UpdateOutcome {
    pub script: EditScript,
    pub path: UpdatePath,
    pub markers: MarkerUpdate,
}

pub struct Session<S: TagScanner = MarkupScanner> {
    config: SyncConfig,
    builder: TreeBuilder<S>,
    ids: IdGenerator,
    tree: Option<Tree>,
    dirty: bool,
}

impl Session {
    pub fn new(config: SyncConfig) -> Self {
        let builder = TreeBuilder::new(config.builder);
        Self::with_builder(config, builder)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}

impl<S: TagScanner> Session<S> {
    pub fn with_builder(config: SyncConfig, builder: TreeBuilder<S>) -> Self {
        Self {
            config,
            builder,
            ids: IdGenerator::new(),
            tree: None,
            dirty: false,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    /// True while the text fails to parse and scripts are withheld.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Innermost element at `pos`, for cursor highlighting.
    pub fn node_at(&self, pos: Position) -> Option<&Node> {
        self.tree.as_ref()?.node_at(pos, false)
    }

    /// Parse `text` from scratch with fresh ids. The script builds the whole
    /// tree for a consumer that starts empty.
    pub fn load(&mut self, text: &str) -> Result<UpdateOutcome, UpdateError> {
        self.ids.reset();
        self.tree = None;
        self.dirty = false;
        let root = match self
            .builder
            .build(text, Position::ZERO, &mut FreshIds::new(&mut self.ids))
        {
            Ok(root) => root,
            Err(errors) => {
                log::debug!(target: "livedom.update", "load failed: {errors}");
                return Err(errors.into());
            }
        };
        let tree = Tree::new(root)?;
        let script = diff_from_empty(tree.root(), RootAnchor::DOCUMENT)?;
        let markers = MarkerUpdate {
            upserted: tree.spans(),
            removed: Vec::new(),
        };
        log::debug!(target: "livedom.update", "loaded {} node(s)", tree.len());
        self.tree = Some(tree);
        Ok(UpdateOutcome {
            script,
            path: UpdatePath::Full(FullReason::Load),
            markers,
        })
    }

    /// Apply `deltas` (in document order) that turned the previous text into
    /// `text`, and produce the script for the change.
    ///
    /// Malformed deltas are rejected before anything is shifted.
    pub fn update(&mut self, text: &str, deltas: &[EditDelta]) -> Result<UpdateOutcome, UpdateError> {
        for (index, delta) in deltas.iter().enumerate() {
            if let Err(problem) = delta.validate() {
                log::debug!(target: "livedom.update", "rejecting delta {index}: {problem}");
                return Err(UpdateError::InvalidDelta {
                    index,
                    range: delta.range,
                    problem,
                });
            }
        }
        let Some(tree) = self.tree.as_mut() else {
            return self.full_update(text, FullReason::NoPreviousTree);
        };
        for delta in deltas {
            shift_positions(tree.root_mut(), delta);
        }

        let reason = match self.incremental_target(deltas) {
            Ok(enclosing) => match self.incremental_update(text, enclosing) {
                Ok(outcome) => return Ok(outcome),
                Err(reason) => reason,
            },
            Err(reason) => reason,
        };
        self.full_update(text, reason)
    }

    /// The element to reparse, or why there is none.
    fn incremental_target(&self, deltas: &[EditDelta]) -> Result<TagId, FullReason> {
        if !self.config.incremental {
            return Err(FullReason::Disabled);
        }
        let [delta] = deltas else {
            return Err(FullReason::DeltaCount);
        };
        if self.dirty {
            return Err(FullReason::Dirty);
        }
        if classify(delta) == EditClass::Structural {
            return Err(FullReason::StructuralEdit);
        }
        let tree = self.tree.as_ref().ok_or(FullReason::NoPreviousTree)?;
        // A removal has collapsed onto its start in the shifted tree.
        let range = if delta.is_insertion() {
            delta.range
        } else {
            TextRange::new(delta.range.start, delta.range.start)
        };
        let enclosing = tree
            .enclosing_element(range)
            .ok_or(FullReason::NoEnclosingElement)?;
        if tree.parent_of(enclosing.id()).is_none() {
            return Err(FullReason::EnclosingIsRoot);
        }
        Ok(enclosing.id())
    }

    fn incremental_update(&mut self, text: &str, id: TagId) -> Result<UpdateOutcome, FullReason> {
        let Self {
            builder, ids, tree, ..
        } = self;
        let tree = tree.as_mut().ok_or(FullReason::NoPreviousTree)?;
        let (parent, index) = match (tree.parent_of(id), tree.index_in_parent(id)) {
            (Some(parent), Some(index)) => (parent, index),
            _ => return Err(FullReason::EnclosingIsRoot),
        };
        let old = tree.get(id).ok_or(FullReason::SpliceFailed)?;
        let lines = LineIndex::new(text);
        let span = match (lines.offset(old.start()), lines.offset(old.end())) {
            (Some(start), Some(end)) if start <= end => &text[start..end],
            _ => return Err(FullReason::StalePositions),
        };

        let built = {
            let mut policy = PreserveIds::from_tree(tree, ids);
            builder.build(span, old.start(), &mut policy)
        };
        let subtree = match built {
            Ok(subtree) => subtree,
            Err(errors) => {
                log::debug!(target: "livedom.update", "subtree {id} reparse failed: {errors}");
                return Err(FullReason::SubtreeParse);
            }
        };
        if subtree.id() != id || subtree.name() != old.name() {
            log::debug!(
                target: "livedom.update",
                "subtree {id} reparsed as <{}> {}",
                subtree.name().unwrap_or_default(),
                subtree.id()
            );
            return Err(FullReason::SubtreeRenamed);
        }
        // Descendants cannot reach past the reparsed root without failing the
        // subtree build, so only the root's own start tag needs checking.
        if builder.config().implied_end_tags {
            let ancestors = ancestor_names(tree, parent);
            let name = subtree.name().unwrap_or_default();
            if implied_closes(name, ancestors.iter().copied()) > 0 {
                log::debug!(target: "livedom.update", "<{name}> at {id} would close an ancestor");
                return Err(FullReason::ClosesAncestor);
            }
        }
        let script = match diff_subtrees(old, &subtree, RootAnchor::child_of(parent, index)) {
            Ok(script) => script,
            Err(err) => {
                log::debug!(target: "livedom.update", "subtree {id} diff failed: {err}");
                return Err(FullReason::SubtreeDiff);
            }
        };
        let markers = MarkerUpdate {
            upserted: subtree
                .descendants()
                .map(|node| (node.id(), node.range()))
                .collect(),
            removed: removed_ids(old, &subtree),
        };
        let reparsed = subtree.id();
        if let Err(err) = tree.replace_subtree(id, subtree) {
            log::warn!(target: "livedom.update", "splice of {id} failed: {err}");
            return Err(FullReason::SpliceFailed);
        }
        log::debug!(
            target: "livedom.update",
            "incremental update of {id}: {} op(s)",
            script.len()
        );
        Ok(UpdateOutcome {
            script,
            path: UpdatePath::Incremental { reparsed },
            markers,
        })
    }

    fn full_update(&mut self, text: &str, reason: FullReason) -> Result<UpdateOutcome, UpdateError> {
        log::debug!(target: "livedom.update", "full update ({reason:?})");
        let Self {
            builder,
            ids,
            tree,
            dirty,
            ..
        } = self;
        let built = match tree.as_ref() {
            Some(previous) => {
                builder.build(text, Position::ZERO, &mut PreserveIds::from_tree(previous, ids))
            }
            None => builder.build(text, Position::ZERO, &mut FreshIds::new(ids)),
        };
        let root = match built {
            Ok(root) => root,
            Err(errors) => {
                *dirty = tree.is_some();
                log::debug!(target: "livedom.update", "full parse failed, keeping last tree: {errors}");
                return Err(errors.into());
            }
        };
        let next = Tree::new(root)?;
        let (script, removed) = match tree.as_ref() {
            Some(previous) => (
                diff_subtrees(previous.root(), next.root(), RootAnchor::DOCUMENT)?,
                removed_ids(previous.root(), next.root()),
            ),
            None => (diff_from_empty(next.root(), RootAnchor::DOCUMENT)?, Vec::new()),
        };
        let markers = MarkerUpdate {
            upserted: next.spans(),
            removed,
        };
        *tree = Some(next);
        *dirty = false;
        Ok(UpdateOutcome {
            script,
            path: UpdatePath::Full(reason),
            markers,
        })
    }

    /// Text with engine ids injected; plain `text` when nothing is loaded.
    pub fn instrumented_text(&self, text: &str) -> Result<String, InstrumentError> {
        match &self.tree {
            Some(tree) => instrument(tree.root(), text, &self.config),
            None => Ok(text.to_string()),
        }
    }

    /// Compare a renderer's view against the current tree. `None` when
    /// nothing is loaded.
    pub fn reconcile(&self, observed: &ObservedNode) -> Result<Option<Reconciliation>, DiffError> {
        let Some(tree) = &self.tree else {
            return Ok(None);
        };
        Reconciler::new(&self.config).reconcile(tree, observed).map(Some)
    }
}

/// Tag names from `from` up to the root, innermost first.
fn ancestor_names(tree: &Tree, from: TagId) -> Vec<&str> {
    let mut names = Vec::new();
    let mut current = Some(from);
    while let Some(id) = current {
        if let Some(name) = tree.get(id).and_then(Node::name) {
            names.push(name);
        }
        current = tree.parent_of(id);
    }
    names
}

fn removed_ids(old: &Node, new: &Node) -> Vec<TagId> {
    let kept: FxHashSet<TagId> = new.descendants().map(Node::id).collect();
    old.descendants()
        .map(Node::id)
        .filter(|id| !kept.contains(id))
        .collect()
}
