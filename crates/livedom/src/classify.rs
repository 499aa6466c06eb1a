//! Text-only vs structural edit classification.
//!
//! An edit is text-only when the characters it adds or removes cannot change
//! where a tag begins or ends, or what its attributes are. Anything touching
//! `<`, `>`, `/`, `=`, or a quote character is structural. Entity references
//! (`&amp;`) only change decoded text and stay text-only.

use crate::delta::EditDelta;
use memchr::memchr3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditClass {
    TextOnly,
    Structural,
}

pub fn classify_text(text: &str) -> EditClass {
    let bytes = text.as_bytes();
    if memchr3(b'<', b'>', b'/', bytes).is_some() || memchr3(b'=', b'"', b'\'', bytes).is_some() {
        EditClass::Structural
    } else {
        EditClass::TextOnly
    }
}

pub fn classify(delta: &EditDelta) -> EditClass {
    classify_text(&delta.affected_text())
}
