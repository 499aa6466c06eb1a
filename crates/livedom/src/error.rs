//! Error types for building, splicing, diffing, and updating trees.
//!
//! Parse failures are values, not panics: the caller keeps showing the last
//! valid tree while the document is malformed.

use core_types::{Position, TagId, TextRange};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseErrorCode {
    /// A start/end tag, doctype, or quoted attribute value runs into end of input.
    UnterminatedTag,
    UnterminatedComment,
    /// An end tag that does not close any open element.
    UnmatchedEndTag,
    /// An element without an optional end tag is still open at end of input.
    UnclosedElement,
    /// A second element starts after the root element closed.
    MultipleRoots,
    NoRootElement,
}

impl ParseErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ParseErrorCode::UnterminatedTag => "unterminated tag",
            ParseErrorCode::UnterminatedComment => "unterminated comment",
            ParseErrorCode::UnmatchedEndTag => "unmatched end tag",
            ParseErrorCode::UnclosedElement => "unclosed element",
            ParseErrorCode::MultipleRoots => "multiple root elements",
            ParseErrorCode::NoRootElement => "no root element",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub code: ParseErrorCode,
    pub position: Position,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.code.as_str(), self.position)
    }
}

/// Non-empty list of parse errors from one build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseErrors(pub Vec<ParseError>);

impl ParseErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ParseError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, code: ParseErrorCode) -> bool {
        self.0.iter().any(|err| err.code == code)
    }
}

impl fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i != 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseErrors {}

/// Structural failures of tree bookkeeping. A splice that reports one of these
/// has not touched the tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeError {
    UnknownNode(TagId),
    MissingParent(TagId),
    NotInParent { id: TagId, parent: TagId },
    /// The root has no parent to splice into.
    RootReplacement(TagId),
    DuplicateId(TagId),
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::UnknownNode(id) => write!(f, "node {id} is not in the tree"),
            TreeError::MissingParent(id) => write!(f, "parent of node {id} is missing"),
            TreeError::NotInParent { id, parent } => {
                write!(f, "node {id} is not a child of {parent}")
            }
            TreeError::RootReplacement(id) => write!(f, "cannot splice over root node {id}"),
            TreeError::DuplicateId(id) => write!(f, "duplicate node id {id}"),
        }
    }
}

impl std::error::Error for TreeError {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffError {
    DuplicateId(TagId),
    /// The same id names an element on one side and a different tag (or a
    /// text run) on the other.
    KindMismatch(TagId),
}

impl fmt::Display for DiffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffError::DuplicateId(id) => write!(f, "duplicate node id {id} in diff input"),
            DiffError::KindMismatch(id) => {
                write!(f, "node {id} changed kind or tag name between snapshots")
            }
        }
    }
}

impl std::error::Error for DiffError {}

#[derive(Debug)]
pub enum UpdateError {
    /// The document does not parse; the last valid tree is kept and no
    /// script is produced.
    Parse(ParseErrors),
    Tree(TreeError),
    Diff(DiffError),
    /// Delta `index` of the update was malformed; nothing was applied.
    InvalidDelta {
        index: usize,
        range: TextRange,
        problem: DeltaProblem,
    },
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateError::Parse(errors) => write!(f, "parse failed: {errors}"),
            UpdateError::Tree(err) => write!(f, "tree update failed: {err}"),
            UpdateError::Diff(err) => write!(f, "diff failed: {err}"),
            UpdateError::InvalidDelta {
                index,
                range,
                problem,
            } => write!(
                f,
                "delta {index} ({}..{}) rejected: {problem}",
                range.start, range.end
            ),
        }
    }
}

impl std::error::Error for UpdateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UpdateError::Parse(errors) => Some(errors),
            UpdateError::Tree(err) => Some(err),
            UpdateError::Diff(err) => Some(err),
            UpdateError::InvalidDelta { .. } => None,
        }
    }
}

impl From<ParseErrors> for UpdateError {
    fn from(errors: ParseErrors) -> Self {
        UpdateError::Parse(errors)
    }
}

impl From<TreeError> for UpdateError {
    fn from(err: TreeError) -> Self {
        UpdateError::Tree(err)
    }
}

impl From<DiffError> for UpdateError {
    fn from(err: DiffError) -> Self {
        UpdateError::Diff(err)
    }
}

/// Why an incoming edit delta was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeltaProblem {
    /// `range.end` precedes `range.start`.
    Reversed,
    /// The range does not span the delta's text; `expected` is the end the
    /// text implies.
    EndMismatch { expected: Position },
}

impl fmt::Display for DeltaProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeltaProblem::Reversed => f.write_str("range end precedes its start"),
            DeltaProblem::EndMismatch { expected } => {
                write!(f, "range does not span its text (text ends at {expected})")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstrumentError {
    /// An element's recorded start does not point at its start tag in the
    /// supplied text (the tree is stale for this text).
    StalePosition { id: TagId, position: Position },
}

impl fmt::Display for InstrumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentError::StalePosition { id, position } => {
                write!(f, "element {id} has no start tag at {position}")
            }
        }
    }
}

impl std::error::Error for InstrumentError {}
