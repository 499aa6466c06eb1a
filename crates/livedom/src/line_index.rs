//! Byte offset <-> (row, column) conversion. Columns count `char`s.

use core_types::Position;
use memchr::{memchr_iter, memrchr};

/// Line-start table over one version of the document text.
pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = Vec::with_capacity(text.len() / 32 + 1);
        line_starts.push(0);
        line_starts.extend(memchr_iter(b'\n', text.as_bytes()).map(|nl| nl + 1));
        Self { text, line_starts }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte offset of `pos`, or `None` if the row does not exist or the column
    /// runs past the end of its line.
    pub fn offset(&self, pos: Position) -> Option<usize> {
        let line_start = *self.line_starts.get(pos.row)?;
        let line_end = self
            .line_starts
            .get(pos.row + 1)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        let line = &self.text[line_start..line_end];
        if pos.column == 0 {
            return Some(line_start);
        }
        let mut chars = line.char_indices().skip(pos.column - 1);
        let (idx, ch) = chars.next()?;
        Some(line_start + idx + ch.len_utf8())
    }

    /// Position of a byte offset, which must lie on a char boundary.
    pub fn position(&self, offset: usize) -> Position {
        debug_assert!(self.text.is_char_boundary(offset));
        let row = self.line_starts.partition_point(|start| *start <= offset) - 1;
        let line_start = self.line_starts[row];
        Position {
            row,
            column: self.text[line_start..offset].chars().count(),
        }
    }
}

/// Forward-only offset -> position conversion for scans that visit offsets in
/// increasing order. Linear in the text length overall.
pub(crate) struct PositionCursor<'a> {
    text: &'a str,
    offset: usize,
    pos: Position,
}

impl<'a> PositionCursor<'a> {
    /// `origin` is the absolute position of `text[0]`.
    pub(crate) fn new(text: &'a str, origin: Position) -> Self {
        Self {
            text,
            offset: 0,
            pos: origin,
        }
    }

    pub(crate) fn advance_to(&mut self, offset: usize) -> Position {
        debug_assert!(offset >= self.offset, "cursor only moves forward");
        debug_assert!(self.text.is_char_boundary(offset));
        let chunk = &self.text.as_bytes()[self.offset..offset];
        match memrchr(b'\n', chunk) {
            Some(last_nl) => {
                self.pos.row += memchr_iter(b'\n', chunk).count();
                self.pos.column = self.text[self.offset + last_nl + 1..offset].chars().count();
            }
            None => {
                self.pos.column += self.text[self.offset..offset].chars().count();
            }
        }
        self.offset = offset;
        self.pos
    }
}
