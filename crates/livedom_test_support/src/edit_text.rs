//! Apply (row, column) edits to plain strings, mirroring what an editor
//! buffer does. Columns count chars.

/// Byte offset of `(row, column)`, or `None` past the end of the row or text.
pub fn offset_of(text: &str, row: usize, column: usize) -> Option<usize> {
    let mut line_start = 0;
    for _ in 0..row {
        line_start += text[line_start..].find('\n')? + 1;
    }
    let line_end = text[line_start..]
        .find('\n')
        .map_or(text.len(), |nl| line_start + nl);
    let line = &text[line_start..line_end];
    if column == 0 {
        return Some(line_start);
    }
    line.char_indices()
        .nth(column - 1)
        .map(|(idx, ch)| line_start + idx + ch.len_utf8())
}

pub fn insert_at(text: &str, row: usize, column: usize, inserted: &str) -> Option<String> {
    let at = offset_of(text, row, column)?;
    let mut out = String::with_capacity(text.len() + inserted.len());
    out.push_str(&text[..at]);
    out.push_str(inserted);
    out.push_str(&text[at..]);
    Some(out)
}

/// Remove `[start, end)` and return the new text plus the removed slice.
pub fn remove_range(
    text: &str,
    start: (usize, usize),
    end: (usize, usize),
) -> Option<(String, String)> {
    let from = offset_of(text, start.0, start.1)?;
    let to = offset_of(text, end.0, end.1)?;
    if from > to {
        return None;
    }
    let mut out = String::with_capacity(text.len() - (to - from));
    out.push_str(&text[..from]);
    out.push_str(&text[to..]);
    Some((out, text[from..to].to_string()))
}
