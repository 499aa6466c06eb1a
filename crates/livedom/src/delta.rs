//! Edit deltas as supplied by the text-editing surface.

use crate::error::DeltaProblem;
use core_types::{Position, TextRange};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// One text change. `range` is in the coordinates of the document *before*
/// a removal and *after* an insertion, so both directions describe the span
/// of the affected text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditDelta {
    pub range: TextRange,
    #[serde(flatten)]
    pub action: EditAction,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum EditAction {
    InsertText { text: String },
    RemoveText { text: String },
    /// Whole lines, each implicitly terminated by a newline.
    InsertLines { lines: Vec<String> },
    RemoveLines { lines: Vec<String> },
}

impl EditDelta {
    /// Insertion of `text` at `at`; the end of the range is derived from the
    /// text.
    pub fn insert(at: Position, text: impl Into<String>) -> Self {
        let text = text.into();
        let end = end_after(at, &text);
        Self {
            range: TextRange::new(at, end),
            action: EditAction::InsertText { text },
        }
    }

    /// Removal of `text`, which occupied `range` before the edit.
    pub fn remove(range: TextRange, text: impl Into<String>) -> Self {
        Self {
            range,
            action: EditAction::RemoveText { text: text.into() },
        }
    }

    pub fn insert_lines(row: usize, lines: Vec<String>) -> Self {
        let range = TextRange::new(Position::new(row, 0), Position::new(row + lines.len(), 0));
        Self {
            range,
            action: EditAction::InsertLines { lines },
        }
    }

    pub fn remove_lines(row: usize, lines: Vec<String>) -> Self {
        let range = TextRange::new(Position::new(row, 0), Position::new(row + lines.len(), 0));
        Self {
            range,
            action: EditAction::RemoveLines { lines },
        }
    }

    pub fn is_insertion(&self) -> bool {
        matches!(
            self.action,
            EditAction::InsertText { .. } | EditAction::InsertLines { .. }
        )
    }

    /// The inserted or removed characters.
    pub fn affected_text(&self) -> Cow<'_, str> {
        match &self.action {
            EditAction::InsertText { text } | EditAction::RemoveText { text } => {
                Cow::Borrowed(text)
            }
            EditAction::InsertLines { lines } | EditAction::RemoveLines { lines } => {
                let mut joined = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
                for line in lines {
                    joined.push_str(line);
                    joined.push('\n');
                }
                Cow::Owned(joined)
            }
        }
    }
}

impl EditDelta {
    /// Check that `range` is ordered and spans exactly the affected text.
    /// Deltas come straight off the wire; the tracker relies on both.
    pub fn validate(&self) -> Result<(), DeltaProblem> {
        if self.range.end < self.range.start {
            return Err(DeltaProblem::Reversed);
        }
        let expected = end_after(self.range.start, &self.affected_text());
        if self.range.end != expected {
            return Err(DeltaProblem::EndMismatch { expected });
        }
        Ok(())
    }
}

fn end_after(at: Position, text: &str) -> Position {
    match text.rfind('\n') {
        Some(last_nl) => Position {
            row: at.row + text.bytes().filter(|b| *b == b'\n').count(),
            column: text[last_nl + 1..].chars().count(),
        },
        None => Position {
            row: at.row,
            column: at.column + text.chars().count(),
        },
    }
}
