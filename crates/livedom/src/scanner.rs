//! Tag-boundary scanner: splits markup into start/end tags, text, comments and
//! doctypes with byte spans, without deciding nesting.
//!
//! Tag and attribute names are ASCII `[A-Za-z0-9:_-]` (first char alphabetic),
//! interned as ASCII-lowercase strings. A `<` that cannot start a tag is text.
//! `script`/`style` bodies are raw text up to the matching close tag.
//!
//! The builder only depends on the `TagScanner` trait; `MarkupScanner` is the
//! default implementation.
use crate::entities::decode_entities;
use crate::error::ParseErrorCode;
use memchr::{memchr, memmem};

const COMMENT_START: &[u8] = b"<!--";
const COMMENT_END: &[u8] = b"-->";
const SCRIPT_CLOSE_TAG: &[u8] = b"</script";
const STYLE_CLOSE_TAG: &[u8] = b"</style";

/// Byte span into the scanned source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start must be <= end");
        Self { start, end }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanKind {
    StartTag {
        name: String,
        /// Source order; duplicates preserved (the builder keeps the first).
        attributes: Vec<(String, String)>,
        self_closing: bool,
    },
    EndTag {
        name: String,
    },
    /// Entity-decoded text (raw for `script`/`style` bodies).
    Text {
        text: String,
    },
    Comment,
    Doctype,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanToken {
    pub kind: ScanKind,
    pub span: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanError {
    pub code: ParseErrorCode,
    pub offset: usize,
}

#[derive(Clone, Debug, Default)]
pub struct ScanOutput {
    pub tokens: Vec<ScanToken>,
    pub errors: Vec<ScanError>,
}

pub trait TagScanner {
    fn scan(&self, source: &str) -> ScanOutput;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MarkupScanner;

impl TagScanner for MarkupScanner {
    fn scan(&self, source: &str) -> ScanOutput {
        Scan::new(source).run()
    }
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic()
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

fn starts_with_ignore_ascii_case_at(haystack: &[u8], start: usize, needle: &[u8]) -> bool {
    haystack
        .get(start..start + needle.len())
        .is_some_and(|window| window.eq_ignore_ascii_case(needle))
}

pub(crate) fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Find `</script` / `</style` (ASCII case-insensitive) followed by optional
/// whitespace and `>`. Returns the span of the close tag relative to `haystack`.
fn find_rawtext_close_tag(haystack: &[u8], close_tag: &[u8]) -> Option<Span> {
    let n = close_tag.len();
    let mut i = 0;
    while i + n <= haystack.len() {
        i += memchr(b'<', &haystack[i..])?;
        if starts_with_ignore_ascii_case_at(haystack, i, close_tag) {
            let mut k = i + n;
            while k < haystack.len() && haystack[k].is_ascii_whitespace() {
                k += 1;
            }
            if haystack.get(k) == Some(&b'>') {
                return Some(Span::new(i, k + 1));
            }
        }
        i += 1;
    }
    None
}

struct Scan<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    out: ScanOutput,
}

impl<'a> Scan<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            out: ScanOutput::default(),
        }
    }

    fn run(mut self) -> ScanOutput {
        // Slices are only cut at ASCII structural bytes, so every endpoint is a
        // UTF-8 char boundary.
        while self.pos < self.bytes.len() {
            if !self.at_markup(self.pos) {
                self.scan_text();
                continue;
            }
            let keep_going = if self.bytes[self.pos..].starts_with(COMMENT_START) {
                self.scan_comment()
            } else if self.bytes.get(self.pos + 1) == Some(&b'!') {
                self.scan_declaration()
            } else if self.bytes.get(self.pos + 1) == Some(&b'/') {
                self.scan_end_tag()
            } else {
                self.scan_start_tag()
            };
            if !keep_going {
                break;
            }
        }
        self.out
    }

    /// `<` followed by a tag-name start, `/` + tag-name start, or `!`.
    fn at_markup(&self, i: usize) -> bool {
        if self.bytes[i] != b'<' {
            return false;
        }
        match self.bytes.get(i + 1) {
            Some(b'!') => true,
            Some(b'/') => self.bytes.get(i + 2).is_some_and(|b| is_name_start(*b)),
            Some(b) => is_name_start(*b),
            None => false,
        }
    }

    fn error(&mut self, code: ParseErrorCode, offset: usize) {
        self.out.errors.push(ScanError { code, offset });
    }

    fn push(&mut self, kind: ScanKind, start: usize, end: usize) {
        self.out.tokens.push(ScanToken {
            kind,
            span: Span::new(start, end),
        });
    }

    fn scan_text(&mut self) {
        let start = self.pos;
        let mut i = start + 1;
        loop {
            match memchr(b'<', &self.bytes[i.min(self.bytes.len())..]) {
                Some(rel) if self.at_markup(i + rel) => {
                    i += rel;
                    break;
                }
                Some(rel) => i += rel + 1,
                None => {
                    i = self.bytes.len();
                    break;
                }
            }
        }
        let text = decode_entities(&self.input[start..i]);
        self.push(ScanKind::Text { text }, start, i);
        self.pos = i;
    }

    fn scan_comment(&mut self) -> bool {
        let start = self.pos;
        let body = start + COMMENT_START.len();
        match memmem::find(&self.bytes[body..], COMMENT_END) {
            Some(rel) => {
                let end = body + rel + COMMENT_END.len();
                self.push(ScanKind::Comment, start, end);
                self.pos = end;
                true
            }
            None => {
                self.error(ParseErrorCode::UnterminatedComment, start);
                false
            }
        }
    }

    /// `<!doctype ...>` and other `<!...>` declarations.
    fn scan_declaration(&mut self) -> bool {
        let start = self.pos;
        match memchr(b'>', &self.bytes[start..]) {
            Some(rel) => {
                let end = start + rel + 1;
                self.push(ScanKind::Doctype, start, end);
                self.pos = end;
                true
            }
            None => {
                self.error(ParseErrorCode::UnterminatedTag, start);
                false
            }
        }
    }

    fn scan_name(&mut self, from: usize) -> (String, usize) {
        let mut j = from;
        while j < self.bytes.len() && is_name_char(self.bytes[j]) {
            j += 1;
        }
        (self.input[from..j].to_ascii_lowercase(), j)
    }

    fn scan_end_tag(&mut self) -> bool {
        let start = self.pos;
        let (name, after_name) = self.scan_name(start + 2);
        match memchr(b'>', &self.bytes[after_name..]) {
            Some(rel) => {
                let end = after_name + rel + 1;
                self.push(ScanKind::EndTag { name }, start, end);
                self.pos = end;
                true
            }
            None => {
                self.error(ParseErrorCode::UnterminatedTag, start);
                false
            }
        }
    }

    fn skip_whitespace(&self, mut k: usize) -> usize {
        while k < self.bytes.len() && self.bytes[k].is_ascii_whitespace() {
            k += 1;
        }
        k
    }

    fn scan_start_tag(&mut self) -> bool {
        let start = self.pos;
        let len = self.bytes.len();
        let (name, mut k) = self.scan_name(start + 1);
        let mut attributes: Vec<(String, String)> = Vec::new();
        let mut self_closing = false;
        let mut closed = false;

        while k < len {
            k = self.skip_whitespace(k);
            if k >= len {
                break;
            }
            match self.bytes[k] {
                b'>' => {
                    k += 1;
                    closed = true;
                    break;
                }
                b'/' if self.bytes.get(k + 1) == Some(&b'>') => {
                    self_closing = true;
                    k += 2;
                    closed = true;
                    break;
                }
                b'/' => {
                    k += 1;
                    continue;
                }
                _ => {}
            }
            let (attribute_name, after_name) = self.scan_name(k);
            if after_name == k {
                // Not a name character; skip it the way browsers drop junk in tags.
                k += self.input[k..].chars().next().map_or(1, char::len_utf8);
                continue;
            }
            k = self.skip_whitespace(after_name);
            let mut value = String::new();
            if k < len && self.bytes[k] == b'=' {
                k = self.skip_whitespace(k + 1);
                if k < len && (self.bytes[k] == b'"' || self.bytes[k] == b'\'') {
                    let quote = self.bytes[k];
                    let vstart = k + 1;
                    match memchr(quote, &self.bytes[vstart..]) {
                        Some(rel) => {
                            value = decode_entities(&self.input[vstart..vstart + rel]);
                            k = vstart + rel + 1;
                        }
                        None => {
                            k = len;
                            break;
                        }
                    }
                } else {
                    let vstart = k;
                    while k < len && !self.bytes[k].is_ascii_whitespace() && self.bytes[k] != b'>'
                    {
                        if self.bytes[k] == b'/' && self.bytes.get(k + 1) == Some(&b'>') {
                            break;
                        }
                        k += 1;
                    }
                    value = decode_entities(&self.input[vstart..k]);
                }
            }
            attributes.push((attribute_name, value));
        }

        if !closed {
            self.error(ParseErrorCode::UnterminatedTag, start);
            return false;
        }
        let rawtext_close = match name.as_str() {
            "script" if !self_closing => Some(SCRIPT_CLOSE_TAG),
            "style" if !self_closing => Some(STYLE_CLOSE_TAG),
            _ => None,
        };
        self.push(
            ScanKind::StartTag {
                name: name.clone(),
                attributes,
                self_closing,
            },
            start,
            k,
        );
        self.pos = k;
        if let Some(close_tag) = rawtext_close {
            self.scan_rawtext(name, close_tag);
        }
        true
    }

    /// Raw text body of `script`/`style`. A missing close tag leaves the rest
    /// of the input as text; the builder reports the element as unclosed.
    fn scan_rawtext(&mut self, name: String, close_tag: &[u8]) {
        let body = self.pos;
        match find_rawtext_close_tag(&self.bytes[body..], close_tag) {
            Some(rel) => {
                if rel.start > 0 {
                    let text = self.input[body..body + rel.start].to_string();
                    self.push(ScanKind::Text { text }, body, body + rel.start);
                }
                self.push(ScanKind::EndTag { name }, body + rel.start, body + rel.end);
                self.pos = body + rel.end;
            }
            None => {
                if body < self.bytes.len() {
                    let text = self.input[body..].to_string();
                    self.push(ScanKind::Text { text }, body, self.bytes.len());
                }
                self.pos = self.bytes.len();
            }
        }
    }
}
