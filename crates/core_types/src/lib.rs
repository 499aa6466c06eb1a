//! Identifier and coordinate types shared across the workspace.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Stable identity of one logical element or text run.
///
/// The 64-bit space is partitioned so the three producers never collide:
/// - element ids minted by the identifier generator occupy the low 32 bits;
/// - text ids set `TEXT_BIT` and pack `(parent element id, child index)`;
/// - ids minted for foreign elements (seen by the reconciler without an engine
///   id) set `FOREIGN_BIT`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(pub u64);

impl TagId {
    /// Reserved sentinel; never assigned to a node.
    pub const INVALID: TagId = TagId(0);

    const TEXT_BIT: u64 = 1 << 63;
    const FOREIGN_BIT: u64 = 1 << 62;
    const PARENT_MASK: u64 = (1 << 30) - 1;

    pub fn element(raw: u32) -> Self {
        TagId(u64::from(raw))
    }

    /// Id of the text run at `index` among the children of `parent`.
    ///
    /// Only the low 30 bits of the parent id participate; element ids beyond
    /// that range would alias, which a single editing session never reaches.
    pub fn text(parent: TagId, index: usize) -> Self {
        let parent_bits = (parent.0 & Self::PARENT_MASK) | ((parent.0 & Self::FOREIGN_BIT) >> 32);
        TagId(Self::TEXT_BIT | (parent_bits << 32) | (index as u64 & u64::from(u32::MAX)))
    }

    pub fn foreign(raw: u32) -> Self {
        TagId(Self::FOREIGN_BIT | u64::from(raw))
    }

    pub fn is_text(self) -> bool {
        self.0 & Self::TEXT_BIT != 0
    }

    pub fn is_foreign(self) -> bool {
        !self.is_text() && self.0 & Self::FOREIGN_BIT != 0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Zero-based document coordinate. Columns count Unicode scalar values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub column: usize,
}

impl Position {
    pub const ZERO: Position = Position { row: 0, column: 0 };

    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.row
            .cmp(&other.row)
            .then_with(|| self.column.cmp(&other.column))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.column)
    }
}

/// Half-open document range `[start, end)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub start: Position,
    pub end: Position,
}

impl TextRange {
    pub fn new(start: Position, end: Position) -> Self {
        debug_assert!(start <= end, "range start must be <= end");
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos < self.end
    }
}
