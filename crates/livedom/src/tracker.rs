//! Position tracking: keeps the previous tree's boundaries in step with the
//! text after each edit, without touching shape or ids.

use crate::delta::EditDelta;
use crate::types::Node;
use core_types::{Position, TextRange};

/// Shift every boundary of `root` affected by `delta`. Returns the number of
/// nodes visited.
///
/// Boundaries at or after the edit start move. Subtrees that end strictly
/// before the edit start are skipped, for insertions and removals alike: a
/// removal can collapse boundaries anywhere inside its range, so nothing past
/// the start is safe to skip.
pub fn shift_positions(root: &mut Node, delta: &EditDelta) -> usize {
    let shift: fn(Position, TextRange) -> Position = if delta.is_insertion() {
        shift_for_insert
    } else {
        shift_for_remove
    };
    let visited = shift_subtree(root, delta.range, shift);
    log::trace!(
        target: "livedom.track",
        "shifted {} node(s) for edit {}..{}",
        visited,
        delta.range.start,
        delta.range.end
    );
    visited
}

fn shift_subtree(node: &mut Node, range: TextRange, shift: fn(Position, TextRange) -> Position) -> usize {
    if node.end() < range.start {
        return 0;
    }
    let start = shift(node.start(), range);
    let end = shift(node.end(), range);
    node.set_range(start, end);

    let children = node.children_mut();
    let first = children.partition_point(|child| child.end() < range.start);
    let mut visited = 1;
    for child in &mut children[first..] {
        visited += shift_subtree(child, range, shift);
    }
    visited
}

/// `range` is the inserted span in post-edit coordinates.
pub fn shift_for_insert(p: Position, range: TextRange) -> Position {
    if p < range.start {
        return p;
    }
    if p.row == range.start.row {
        Position {
            row: range.end.row,
            column: p.column - range.start.column + range.end.column,
        }
    } else {
        Position {
            row: p.row + (range.end.row - range.start.row),
            column: p.column,
        }
    }
}

/// `range` is the removed span in pre-edit coordinates. Boundaries inside it
/// collapse onto its start.
pub fn shift_for_remove(p: Position, range: TextRange) -> Position {
    if p < range.start {
        return p;
    }
    if p < range.end {
        return range.start;
    }
    if p.row == range.end.row {
        Position {
            row: range.start.row,
            column: p.column - range.end.column + range.start.column,
        }
    } else {
        Position {
            row: p.row - (range.end.row - range.start.row),
            column: p.column,
        }
    }
}
