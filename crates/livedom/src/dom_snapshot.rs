//! Line-per-node tree rendering for test assertions.
//!
//! Two trees are equal under some options exactly when their snapshots are
//! equal line for line. Lines are indented by depth; elements render as
//! `<name a="v">`, text as a quoted escaped string. Attributes come out in
//! name order, so attribute order never matters. Ids (`#id`) and ranges
//! (`@start..end`) are appended only when the options ask for them.

use crate::types::{Node, NodeKind};
use std::fmt::{self, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DomSnapshotOptions {
    pub ignore_ids: bool,
    pub include_positions: bool,
}

impl Default for DomSnapshotOptions {
    fn default() -> Self {
        Self {
            ignore_ids: true,
            include_positions: false,
        }
    }
}

impl DomSnapshotOptions {
    /// Shape, content and ids; positions ignored.
    pub const WITH_IDS: DomSnapshotOptions = DomSnapshotOptions {
        ignore_ids: false,
        include_positions: false,
    };
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DomSnapshot {
    lines: Vec<String>,
    /// Slash-separated location of each line's node, for mismatch reports.
    paths: Vec<String>,
}

impl DomSnapshot {
    pub fn new(root: &Node, options: DomSnapshotOptions) -> Self {
        let mut snapshot = Self {
            lines: Vec::new(),
            paths: Vec::new(),
        };
        snapshot.push_node(root, &options, 0, &label(root));
        snapshot
    }

    fn push_node(&mut self, node: &Node, options: &DomSnapshotOptions, depth: usize, path: &str) {
        let mut line = "  ".repeat(depth);
        write_line(&mut line, node, options);
        self.lines.push(line);
        self.paths.push(format!("/{path}"));
        for (index, child) in node.children().iter().enumerate() {
            let child_path = format!("{path}/{}[{index}]", label(child));
            self.push_node(child, options, depth + 1, &child_path);
        }
    }

    pub fn as_lines(&self) -> &[String] {
        &self.lines
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

impl fmt::Display for DomSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// First differing line between two snapshots.
#[derive(Debug)]
pub struct DomMismatch {
    pub line: usize,
    pub path: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    expected_tree: String,
    actual_tree: String,
}

impl fmt::Display for DomMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |line: &Option<String>| match line {
            Some(line) => clip(line.trim_start(), 160),
            None => "<missing>".to_string(),
        };
        writeln!(f, "tree mismatch at {} (line {})", self.path, self.line + 1)?;
        writeln!(f, "expected: {}", show(&self.expected))?;
        writeln!(f, "actual:   {}", show(&self.actual))?;
        writeln!(f, "expected tree:\n{}", self.expected_tree)?;
        write!(f, "actual tree:\n{}", self.actual_tree)
    }
}

impl std::error::Error for DomMismatch {}

pub fn assert_dom_eq(expected: &Node, actual: &Node, options: DomSnapshotOptions) {
    if let Err(mismatch) = compare_dom(expected, actual, options) {
        panic!("{mismatch}");
    }
}

pub fn compare_dom(
    expected: &Node,
    actual: &Node,
    options: DomSnapshotOptions,
) -> Result<(), Box<DomMismatch>> {
    let expected = DomSnapshot::new(expected, options);
    let actual = DomSnapshot::new(actual, options);
    let longest = expected.lines.len().max(actual.lines.len());
    let Some(line) = (0..longest).find(|&i| expected.lines.get(i) != actual.lines.get(i)) else {
        return Ok(());
    };
    let path = expected
        .paths
        .get(line)
        .or_else(|| actual.paths.get(line))
        .cloned()
        .unwrap_or_default();
    Err(Box::new(DomMismatch {
        line,
        path,
        expected: expected.lines.get(line).cloned(),
        actual: actual.lines.get(line).cloned(),
        expected_tree: expected.render(),
        actual_tree: actual.render(),
    }))
}

fn label(node: &Node) -> String {
    match node.kind() {
        NodeKind::Element { name, attributes } => match attributes.get("id") {
            Some(id) if !id.is_empty() => format!("{name}#{id}"),
            _ => name.clone(),
        },
        NodeKind::Text { .. } => "#text".to_string(),
    }
}

fn clip(line: &str, max: usize) -> String {
    if line.len() <= max {
        return line.to_string();
    }
    let mut cut = max.saturating_sub(3);
    while !line.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &line[..cut])
}

fn write_line(out: &mut String, node: &Node, options: &DomSnapshotOptions) {
    match node.kind() {
        NodeKind::Element { name, attributes } => {
            out.push('<');
            out.push_str(name);
            for (key, value) in attributes {
                write!(out, " {key}=\"").ok();
                escape_into(out, value);
                out.push('"');
            }
            out.push('>');
        }
        NodeKind::Text { text } => {
            out.push('"');
            escape_into(out, text);
            out.push('"');
        }
    }
    if !options.ignore_ids {
        write!(out, " #{}", node.id()).ok();
    }
    if options.include_positions {
        write!(out, " @{}..{}", node.start(), node.end()).ok();
    }
}

fn escape_into(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '"' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                write!(out, "\\u{{{:04X}}}", c as u32).ok();
            }
            c => out.push(c),
        }
    }
}
