//! Structural builder: nests scanner tokens into an identified node tree.
//!
//! Element ids come from an `IdentityPolicy`. `FreshIds` numbers every element
//! from the generator; `PreserveIds` reuses the id of the element that
//! occupied the same start position in the previous tree, so unaffected
//! elements keep their identity across reparses.
//!
//! Text ids are not policy-controlled: a text run is `TagId::text(parent,
//! index)`, its parent element id plus its index among that parent's children.

use crate::config::BuilderConfig;
use crate::error::{ParseError, ParseErrorCode, ParseErrors};
use crate::ids::IdGenerator;
use crate::line_index::PositionCursor;
use crate::scanner::{MarkupScanner, ScanKind, TagScanner, is_void_element};
use crate::tree::Tree;
use crate::types::{Attributes, Node};
use core_types::{Position, TagId, TextRange};
use rustc_hash::FxHashSet;

/// What a policy knows about an element when it must pick its id.
#[derive(Clone, Copy, Debug)]
pub struct ElementRequest<'a> {
    pub name: &'a str,
    pub start: Position,
    /// Ids already assigned to the open ancestors, outermost first.
    pub ancestors: &'a [TagId],
}

pub trait IdentityPolicy {
    fn assign(&mut self, request: &ElementRequest<'_>) -> TagId;
}

/// Position -> id lookup over whatever tracks node boundaries for the
/// previous version of the document.
pub trait MarkLookup {
    /// Innermost marked element containing `pos`. With `prefer_parent`, an
    /// element whose boundary sits exactly on `pos` yields to its parent.
    fn id_at(&self, pos: Position, prefer_parent: bool) -> Option<TagId>;
}

/// Default full-document policy: a fresh id for every element.
pub struct FreshIds<'g> {
    ids: &'g mut IdGenerator,
}

impl<'g> FreshIds<'g> {
    pub fn new(ids: &'g mut IdGenerator) -> Self {
        Self { ids }
    }
}

impl IdentityPolicy for FreshIds<'_> {
    fn assign(&mut self, _request: &ElementRequest<'_>) -> TagId {
        self.ids.next_id()
    }
}

/// Identity-preserving policy used while updating an existing tree.
///
/// An element reuses the id marked at its start position unless:
/// - nothing is marked there;
/// - the marked element starts earlier (it is an ancestor of the new element,
///   so the new element did not exist before);
/// - the id already belongs to an open ancestor or another element of this
///   build;
/// - the previous element with that id had a different tag name (tag names
///   cannot be changed in place downstream).
pub struct PreserveIds<'a> {
    previous: &'a Tree,
    lookup: &'a dyn MarkLookup,
    ids: &'a mut IdGenerator,
    used: FxHashSet<TagId>,
}

impl<'a> PreserveIds<'a> {
    pub fn new(previous: &'a Tree, lookup: &'a dyn MarkLookup, ids: &'a mut IdGenerator) -> Self {
        Self {
            previous,
            lookup,
            ids,
            used: FxHashSet::default(),
        }
    }

    /// Use the previous tree's own boundaries as the marks.
    pub fn from_tree(previous: &'a Tree, ids: &'a mut IdGenerator) -> Self {
        Self::new(previous, previous, ids)
    }

    fn reusable(&self, request: &ElementRequest<'_>) -> Option<TagId> {
        let found = self.lookup.id_at(request.start, false)?;
        if request.ancestors.contains(&found) || self.used.contains(&found) {
            log::trace!(
                target: "livedom.build",
                "id {found} at {} belongs to another element of this build",
                request.start
            );
            return None;
        }
        let previous = self.previous.get(found)?;
        if previous.start() != request.start {
            return None;
        }
        if previous.name() != Some(request.name) {
            log::trace!(
                target: "livedom.build",
                "tag at {} renamed {:?} -> {}; minting a fresh id",
                request.start,
                previous.name(),
                request.name
            );
            return None;
        }
        Some(found)
    }
}

impl IdentityPolicy for PreserveIds<'_> {
    fn assign(&mut self, request: &ElementRequest<'_>) -> TagId {
        let id = match self.reusable(request) {
            Some(id) => id,
            None => self.ids.next_id(),
        };
        self.used.insert(id);
        id
    }
}

pub struct TreeBuilder<S: TagScanner = MarkupScanner> {
    scanner: S,
    config: BuilderConfig,
}

impl TreeBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self::with_scanner(MarkupScanner, config)
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new(BuilderConfig::default())
    }
}

impl<S: TagScanner> TreeBuilder<S> {
    pub fn with_scanner(scanner: S, config: BuilderConfig) -> Self {
        Self { scanner, config }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Parse `source`, whose first byte sits at `origin` in the document, into
    /// a single rooted tree.
    ///
    /// Text, comments and doctypes outside the root element are ignored.
    pub fn build(
        &self,
        source: &str,
        origin: Position,
        policy: &mut dyn IdentityPolicy,
    ) -> Result<Node, ParseErrors> {
        let scanned = self.scanner.scan(source);

        let mut errors: Vec<ParseError> = Vec::new();
        let mut cursor = PositionCursor::new(source, origin);
        for err in &scanned.errors {
            errors.push(ParseError {
                code: err.code,
                position: cursor.advance_to(err.offset),
            });
        }

        let mut state = BuildState::new(self.config, policy);
        let mut cursor = PositionCursor::new(source, origin);
        for token in scanned.tokens {
            let start = cursor.advance_to(token.span.start);
            let end = cursor.advance_to(token.span.end);
            match token.kind {
                ScanKind::StartTag {
                    name,
                    attributes,
                    self_closing,
                } => state.start_tag(name, attributes, self_closing, TextRange { start, end }),
                ScanKind::EndTag { name } => state.end_tag(&name, TextRange { start, end }),
                ScanKind::Text { text } => state.text(text, TextRange { start, end }),
                ScanKind::Comment | ScanKind::Doctype => {}
            }
        }
        let eof = cursor.advance_to(source.len());
        let root = state.finish(eof, origin);

        errors.append(&mut state.errors);
        if !errors.is_empty() {
            errors.sort_by_key(|err| err.position);
            log::debug!(target: "livedom.build", "build failed with {} error(s)", errors.len());
            return Err(ParseErrors(errors));
        }
        root.ok_or_else(|| {
            ParseErrors(vec![ParseError {
                code: ParseErrorCode::NoRootElement,
                position: origin,
            }])
        })
    }
}

struct OpenElement {
    id: TagId,
    name: String,
    attributes: Attributes,
    start: Position,
    children: Vec<Node>,
}

struct BuildState<'p> {
    config: BuilderConfig,
    policy: &'p mut dyn IdentityPolicy,
    stack: Vec<OpenElement>,
    ancestors: Vec<TagId>,
    root: Option<Node>,
    errors: Vec<ParseError>,
}

impl<'p> BuildState<'p> {
    fn new(config: BuilderConfig, policy: &'p mut dyn IdentityPolicy) -> Self {
        Self {
            config,
            policy,
            stack: Vec::new(),
            ancestors: Vec::new(),
            root: None,
            errors: Vec::new(),
        }
    }

    fn error(&mut self, code: ParseErrorCode, position: Position) {
        self.errors.push(ParseError { code, position });
    }

    fn start_tag(
        &mut self,
        name: String,
        raw_attributes: Vec<(String, String)>,
        self_closing: bool,
        range: TextRange,
    ) {
        if self.config.implied_end_tags {
            while let Some(top) = self.stack.last() {
                if !start_implies_close(&name, &top.name) {
                    break;
                }
                self.close_top(range.start);
            }
        }
        if self.stack.is_empty() && self.root.is_some() {
            self.error(ParseErrorCode::MultipleRoots, range.start);
            return;
        }

        let mut attributes = Attributes::new();
        for (key, value) in raw_attributes {
            attributes.entry(key).or_insert(value);
        }
        let id = self.policy.assign(&ElementRequest {
            name: &name,
            start: range.start,
            ancestors: &self.ancestors,
        });

        if self_closing || is_void_element(&name) {
            let node = Node::element(id, name, attributes, range, Vec::new());
            self.attach(node);
            return;
        }
        self.ancestors.push(id);
        self.stack.push(OpenElement {
            id,
            name,
            attributes,
            start: range.start,
            children: Vec::new(),
        });
    }

    fn end_tag(&mut self, name: &str, range: TextRange) {
        let Some(index) = self.stack.iter().rposition(|open| open.name == name) else {
            if !is_void_element(name) {
                self.error(ParseErrorCode::UnmatchedEndTag, range.start);
            }
            return;
        };
        let blocked = self.stack[index + 1..]
            .iter()
            .any(|open| !self.config.implied_end_tags || !has_optional_end_tag(&open.name));
        if blocked {
            self.error(ParseErrorCode::UnmatchedEndTag, range.start);
            return;
        }
        while self.stack.len() > index + 1 {
            self.close_top(range.start);
        }
        self.close_top(range.end);
    }

    fn text(&mut self, text: String, range: TextRange) {
        let Some(parent) = self.stack.last_mut() else {
            return;
        };
        let id = TagId::text(parent.id, parent.children.len());
        parent.children.push(Node::text(id, text, range));
    }

    fn close_top(&mut self, end: Position) {
        let Some(open) = self.stack.pop() else {
            return;
        };
        self.ancestors.pop();
        let node = Node::element(
            open.id,
            open.name,
            open.attributes,
            TextRange {
                start: open.start,
                end,
            },
            open.children,
        );
        self.attach(node);
    }

    fn attach(&mut self, node: Node) {
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(node);
        } else if self.root.is_none() {
            self.root = Some(node);
        } else {
            self.error(ParseErrorCode::MultipleRoots, node.start());
        }
    }

    fn finish(&mut self, eof: Position, origin: Position) -> Option<Node> {
        while let Some(top) = self.stack.last() {
            if self.config.implied_end_tags && has_optional_end_tag(&top.name) {
                self.close_top(eof);
                continue;
            }
            let start = top.start;
            self.error(ParseErrorCode::UnclosedElement, start);
            self.close_top(eof);
        }
        if self.root.is_none() && self.errors.is_empty() {
            self.error(ParseErrorCode::NoRootElement, origin);
        }
        self.root.take()
    }
}

fn has_optional_end_tag(name: &str) -> bool {
    matches!(
        name,
        "html"
            | "head"
            | "body"
            | "p"
            | "li"
            | "dt"
            | "dd"
            | "option"
            | "optgroup"
            | "tr"
            | "td"
            | "th"
            | "thead"
            | "tbody"
            | "tfoot"
            | "colgroup"
            | "caption"
            | "rb"
            | "rt"
            | "rp"
            | "rtc"
    )
}

/// How many of the open elements `open` (innermost first) a start tag named
/// `opening` closes implicitly before it is inserted.
pub fn implied_closes<'a>(opening: &str, open: impl IntoIterator<Item = &'a str>) -> usize {
    open.into_iter()
        .take_while(|name| start_implies_close(opening, name))
        .count()
}

/// Whether opening `opening` implicitly closes the currently open `open`.
fn start_implies_close(opening: &str, open: &str) -> bool {
    match open {
        "p" => matches!(
            opening,
            "address"
                | "article"
                | "aside"
                | "blockquote"
                | "details"
                | "div"
                | "dl"
                | "fieldset"
                | "figcaption"
                | "figure"
                | "footer"
                | "form"
                | "h1"
                | "h2"
                | "h3"
                | "h4"
                | "h5"
                | "h6"
                | "header"
                | "hgroup"
                | "hr"
                | "main"
                | "menu"
                | "nav"
                | "ol"
                | "p"
                | "pre"
                | "section"
                | "table"
                | "ul"
        ),
        "li" => opening == "li",
        "dt" | "dd" => matches!(opening, "dt" | "dd"),
        "option" => matches!(opening, "option" | "optgroup"),
        "optgroup" => opening == "optgroup",
        "td" | "th" => matches!(opening, "td" | "th" | "tr" | "tbody" | "thead" | "tfoot"),
        "tr" => matches!(opening, "tr" | "tbody" | "thead" | "tfoot"),
        "thead" | "tbody" => matches!(opening, "tbody" | "tfoot"),
        "rb" | "rt" | "rp" => matches!(opening, "rb" | "rt" | "rp" | "rtc"),
        "head" => opening == "body",
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeKind;

    fn build(source: &str) -> Result<Node, ParseErrors> {
        let mut ids = IdGenerator::new();
        TreeBuilder::default().build(source, Position::ZERO, &mut FreshIds::new(&mut ids))
    }

    fn shape(node: &Node) -> String {
        match node.kind() {
            NodeKind::Text { text } => format!("{text:?}"),
            NodeKind::Element { name, .. } => {
                let children: Vec<String> = node.children().iter().map(shape).collect();
                format!("{name}[{}]", children.join(","))
            }
        }
    }

    fn codes(errors: &ParseErrors) -> Vec<ParseErrorCode> {
        errors.iter().map(|err| err.code).collect()
    }

    #[test]
    fn builds_nested_tree_with_positions() {
        let root = build("<div>\n  <p>hi</p>\n</div>").expect("build failed");
        assert_eq!(shape(&root), "div[\"\\n  \",p[\"hi\"],\"\\n\"]");
        assert_eq!(root.id(), TagId::element(1));
        assert_eq!(root.start(), Position::new(0, 0));
        assert_eq!(root.end(), Position::new(2, 6));

        let p = &root.children()[1];
        assert_eq!(p.id(), TagId::element(2));
        assert_eq!(p.range(), TextRange::new(Position::new(1, 2), Position::new(1, 11)));
        let text = &p.children()[0];
        assert_eq!(text.id(), TagId::text(p.id(), 0));
        assert_eq!(text.range(), TextRange::new(Position::new(1, 5), Position::new(1, 7)));
    }

    #[test]
    fn origin_offsets_every_position() {
        let mut ids = IdGenerator::new();
        let root = TreeBuilder::default()
            .build("<b>x</b>", Position::new(3, 4), &mut FreshIds::new(&mut ids))
            .expect("build failed");
        assert_eq!(root.range(), TextRange::new(Position::new(3, 4), Position::new(3, 12)));
        assert_eq!(root.children()[0].start(), Position::new(3, 7));
    }

    #[test]
    fn void_and_self_closing_elements_have_no_children() {
        let root = build("<p>a<br>b<img src=x/><svg:path d=1 /></p>").expect("build failed");
        assert_eq!(shape(&root), "p[\"a\",br[],\"b\",img[],svg:path[]]");
        assert_eq!(
            root.children()[3].attributes().and_then(|a| a.get("src")).map(String::as_str),
            Some("x")
        );
    }

    #[test]
    fn duplicate_attributes_keep_the_first_value() {
        let root = build("<a href=one href=two></a>").expect("build failed");
        assert_eq!(
            root.attributes().and_then(|a| a.get("href")).map(String::as_str),
            Some("one")
        );
    }

    #[test]
    fn optional_end_tags_close_implicitly() {
        let root = build("<ul><li>one<li>two</ul>").expect("build failed");
        assert_eq!(shape(&root), "ul[li[\"one\"],li[\"two\"]]");
        let first = &root.children()[0];
        assert_eq!(first.end(), root.children()[1].start());

        let root = build("<div><p>para<div>block</div></div>").expect("build failed");
        assert_eq!(shape(&root), "div[p[\"para\"],div[\"block\"]]");

        let root = build("<table><tr><td>a<td>b<tr><td>c</table>").expect("build failed");
        assert_eq!(shape(&root), "table[tr[td[\"a\"],td[\"b\"]],tr[td[\"c\"]]]");
    }

    #[test]
    fn implied_closes_counts_cascading_closes() {
        assert_eq!(implied_closes("hr", ["p", "div"]), 1);
        assert_eq!(implied_closes("tr", ["td", "tr", "tbody", "table"]), 2);
        assert_eq!(implied_closes("span", ["p", "div"]), 0);
        assert_eq!(implied_closes("li", ["ul", "li"]), 0);
    }

    #[test]
    fn implied_end_tags_can_be_disabled() {
        let mut ids = IdGenerator::new();
        let builder = TreeBuilder::new(BuilderConfig {
            implied_end_tags: false,
        });
        let err = builder
            .build("<ul><li>one</ul>", Position::ZERO, &mut FreshIds::new(&mut ids))
            .expect_err("strict build should fail");
        assert!(err.has(ParseErrorCode::UnmatchedEndTag));
    }

    #[test]
    fn text_outside_root_is_ignored() {
        let root = build("<!DOCTYPE html>\n<html><body></body></html>\n").expect("build failed");
        assert_eq!(shape(&root), "html[body[]]");
    }

    #[test]
    fn malformed_markup_yields_errors_and_no_tree() {
        let err = build("<div><span></div>").expect_err("expected failure");
        assert_eq!(
            codes(&err),
            vec![
                ParseErrorCode::UnclosedElement,
                ParseErrorCode::UnclosedElement,
                ParseErrorCode::UnmatchedEndTag,
            ]
        );

        let err = build("<div></span></div>").expect_err("expected failure");
        assert_eq!(codes(&err), vec![ParseErrorCode::UnmatchedEndTag]);
        assert_eq!(err.0[0].position, Position::new(0, 5));

        let err = build("<div></div><div></div>").expect_err("expected failure");
        assert!(err.has(ParseErrorCode::MultipleRoots));
        assert_eq!(err.0[0].position, Position::new(0, 11));

        let err = build("just text").expect_err("expected failure");
        assert_eq!(codes(&err), vec![ParseErrorCode::NoRootElement]);

        let err = build("<div class=\"x></div>").expect_err("expected failure");
        assert!(err.has(ParseErrorCode::UnterminatedTag));
    }

    #[test]
    fn stray_void_end_tags_are_ignored() {
        let root = build("<p>a</br>b</p>").expect("build failed");
        assert_eq!(shape(&root), "p[\"a\",\"b\"]");
    }

    #[test]
    fn text_ids_follow_child_index() {
        let root = build("<p>a<b>x</b>c</p>").expect("build failed");
        let ids: Vec<TagId> = root.children().iter().map(Node::id).collect();
        assert_eq!(
            ids,
            vec![
                TagId::text(root.id(), 0),
                TagId::element(2),
                TagId::text(root.id(), 2),
            ]
        );
    }

    #[test]
    fn preserve_policy_reuses_ids_at_unchanged_starts() {
        let mut ids = IdGenerator::new();
        let old = TreeBuilder::default()
            .build("<div><p>a</p><i>b</i></div>", Position::ZERO, &mut FreshIds::new(&mut ids))
            .expect("build failed");
        let old = Tree::new(old).expect("tree");

        // `<span>` inserted at the start of `<p>`'s old slot; shift the old
        // tree the way the tracker would have (p and i move right by 13).
        let mut shifted = old.clone();
        crate::tracker::shift_positions(
            shifted.root_mut(),
            &crate::delta::EditDelta::insert(Position::new(0, 5), "<span></span>"),
        );
        let mut policy = PreserveIds::from_tree(&shifted, &mut ids);
        let new = TreeBuilder::default()
            .build(
                "<div><span></span><p>a</p><i>b</i></div>",
                Position::ZERO,
                &mut policy,
            )
            .expect("build failed");
        let ids_of = |node: &Node| node.children().iter().map(Node::id).collect::<Vec<_>>();
        assert_eq!(new.id(), TagId::element(1));
        assert_eq!(
            ids_of(&new),
            vec![TagId::element(4), TagId::element(2), TagId::element(3)]
        );
    }

    #[test]
    fn preserve_policy_mints_fresh_id_on_rename() {
        let mut ids = IdGenerator::new();
        let old = TreeBuilder::default()
            .build("<div><p>a</p></div>", Position::ZERO, &mut FreshIds::new(&mut ids))
            .expect("build failed");
        let old = Tree::new(old).expect("tree");
        let mut policy = PreserveIds::from_tree(&old, &mut ids);
        let new = TreeBuilder::default()
            .build("<div><q>a</q></div>", Position::ZERO, &mut policy)
            .expect("build failed");
        assert_eq!(new.id(), TagId::element(1));
        assert_eq!(new.children()[0].id(), TagId::element(3));
    }
}
