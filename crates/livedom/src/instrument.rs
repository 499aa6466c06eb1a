//! Instrumented text: the source with each element's engine id injected into
//! its start tag. Everything else, including whitespace and attribute
//! spelling, is copied through untouched.

use crate::config::SyncConfig;
use crate::error::InstrumentError;
use crate::line_index::LineIndex;
use crate::types::Node;

pub fn instrument(root: &Node, text: &str, config: &SyncConfig) -> Result<String, InstrumentError> {
    let index = LineIndex::new(text);
    let mut insertions: Vec<(usize, String)> = Vec::new();
    for node in root.descendants() {
        let Some(name) = node.name() else {
            continue;
        };
        let stale = InstrumentError::StalePosition {
            id: node.id(),
            position: node.start(),
        };
        let offset = index.offset(node.start()).ok_or_else(|| stale.clone())?;
        let name_end = offset + 1 + name.len();
        let tag = text.as_bytes().get(offset..name_end).ok_or_else(|| stale.clone())?;
        if tag[0] != b'<' || !tag[1..].eq_ignore_ascii_case(name.as_bytes()) {
            return Err(stale);
        }
        insertions.push((name_end, format!(" {}=\"{}\"", config.id_attribute, node.id())));
    }
    insertions.sort_by_key(|(offset, _)| *offset);

    let extra: usize = insertions.iter().map(|(_, attr)| attr.len()).sum();
    let mut out = String::with_capacity(text.len() + extra);
    let mut copied = 0;
    for (offset, attr) in insertions {
        out.push_str(&text[copied..offset]);
        out.push_str(&attr);
        copied = offset;
    }
    out.push_str(&text[copied..]);
    log::trace!(target: "livedom.update", "instrumented {} byte(s) -> {}", text.len(), out.len());
    Ok(out)
}
