//! Shared helpers for livedom's integration tests: readable diffs of snapshot
//! lines, text editing by (row, column), and TOML edit-scenario fixtures.

use std::fmt::Write;

pub mod edit_text;
pub mod scenario;

/// Escape `text` for single-line failure messages.
pub fn escape_text(text: &str) -> String {
    text.escape_debug().to_string()
}

/// Side-by-side excerpt around the first differing line of two snapshots.
pub fn diff_lines(expected: &[String], actual: &[String]) -> String {
    fn line(lines: &[String], idx: usize) -> &str {
        lines.get(idx).map_or("<missing>", String::as_str)
    }
    let max = expected.len().max(actual.len());
    let mut out = String::new();

    match (0..max).find(|&i| line(expected, i) != line(actual, i)) {
        Some(i) => {
            let start = i.saturating_sub(2);
            let end = (i + 3).min(max);
            let _ = writeln!(
                &mut out,
                "first mismatch at line {} (showing {}..={}):",
                i + 1,
                start + 1,
                end
            );
            for idx in start..end {
                let marker = if idx == i { ">" } else { " " };
                let _ = writeln!(&mut out, "{marker} {:>4}  expected: {}", idx + 1, line(expected, idx));
                let _ = writeln!(&mut out, "{marker} {:>4}    actual: {}", idx + 1, line(actual, idx));
            }
        }
        None if expected.len() != actual.len() => {
            let _ = writeln!(&mut out, "prefix matched but lengths differ");
        }
        None => {}
    }
    let _ = writeln!(
        &mut out,
        "expected {} lines, actual {} lines",
        expected.len(),
        actual.len()
    );
    out
}
