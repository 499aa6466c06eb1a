//! Character reference decoding for text runs and attribute values.
//!
//! Covers the named references that show up in hand-written markup plus
//! well-formed, semicolon-terminated numeric references. Anything else passes
//! through unchanged, so the decoded text never loses source characters.

use memchr::memchr;

const NAMED: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{a0}'),
    ("copy", '\u{a9}'),
    ("reg", '\u{ae}'),
    ("trade", '\u{2122}'),
    ("hellip", '\u{2026}'),
    ("mdash", '\u{2014}'),
    ("ndash", '\u{2013}'),
    ("laquo", '\u{ab}'),
    ("raquo", '\u{bb}'),
    ("times", '\u{d7}'),
    ("middot", '\u{b7}'),
];

// Longest name in NAMED plus '#x10FFFF' headroom.
const MAX_REFERENCE_LEN: usize = 8;

pub(crate) fn decode_entities(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let Some(first) = memchr(b'&', bytes) else {
        return raw.to_string();
    };
    let mut out = String::with_capacity(raw.len());
    out.push_str(&raw[..first]);
    let mut i = first;
    while i < bytes.len() {
        if bytes[i] != b'&' {
            let next = memchr(b'&', &bytes[i..]).map_or(bytes.len(), |rel| i + rel);
            out.push_str(&raw[i..next]);
            i = next;
            continue;
        }
        match decode_reference(&raw[i + 1..]) {
            Some((ch, consumed)) => {
                out.push(ch);
                i += 1 + consumed;
            }
            None => {
                out.push('&');
                i += 1;
            }
        }
    }
    out
}

/// Decode the reference body following an `&`. Returns the character and the
/// number of bytes consumed including the terminating `;`.
fn decode_reference(rest: &str) -> Option<(char, usize)> {
    let window = &rest.as_bytes()[..rest.len().min(MAX_REFERENCE_LEN + 1)];
    let semi = memchr(b';', window)?;
    let body = &rest[..semi];
    let ch = if let Some(numeric) = body.strip_prefix('#') {
        let value = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
                u32::from_str_radix(hex, 16).ok()?
            }
            Some(_) => return None,
            None if !numeric.is_empty() && numeric.bytes().all(|b| b.is_ascii_digit()) => {
                numeric.parse::<u32>().ok()?
            }
            None => return None,
        };
        char::from_u32(value).filter(|ch| *ch != '\0')?
    } else {
        NAMED
            .iter()
            .find(|(name, _)| *name == body)
            .map(|(_, ch)| *ch)?
    };
    Some((ch, semi + 1))
}
