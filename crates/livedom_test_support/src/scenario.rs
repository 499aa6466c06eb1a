//! Edit-scenario fixtures: a source document and a sequence of edits, each
//! with the update path and script shape the engine is expected to produce.

use crate::edit_text::{insert_at, remove_range};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

pub const EDIT_SCENARIOS_FORMAT_V1: &str = "livedom-edit-scenarios-v1";

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
struct ScenarioManifest {
    format: String,
    #[serde(rename = "case")]
    cases: Vec<Scenario>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Scenario {
    pub id: String,
    pub source: String,
    #[serde(rename = "step", default)]
    pub steps: Vec<ScenarioStep>,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepAction {
    Insert,
    Remove,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedPath {
    Incremental,
    Full,
    /// The edit leaves the document unparsable.
    Error,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ScenarioStep {
    pub action: StepAction,
    pub start: [usize; 2],
    /// Removal end; ignored for insertions.
    #[serde(default)]
    pub end: Option<[usize; 2]>,
    /// Inserted text; ignored for removals.
    #[serde(default)]
    pub text: String,
    pub expect_path: ExpectedPath,
    /// Wire names of the expected ops, in order.
    #[serde(default)]
    pub expect_ops: Vec<String>,
}

/// Outcome of applying a step to a text buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppliedStep {
    pub text: String,
    pub start: (usize, usize),
    /// End of the inserted or removed span (post-edit for insertions,
    /// pre-edit for removals).
    pub end: (usize, usize),
    /// The inserted or removed characters.
    pub affected: String,
}

impl ScenarioStep {
    pub fn apply(&self, text: &str) -> Result<AppliedStep, String> {
        let start = (self.start[0], self.start[1]);
        match self.action {
            StepAction::Insert => {
                let next = insert_at(text, start.0, start.1, &self.text)
                    .ok_or_else(|| format!("insert position {start:?} out of range"))?;
                Ok(AppliedStep {
                    text: next,
                    start,
                    end: end_after(start, &self.text),
                    affected: self.text.clone(),
                })
            }
            StepAction::Remove => {
                let end = self
                    .end
                    .map(|[row, column]| (row, column))
                    .ok_or_else(|| "remove step needs an end".to_string())?;
                let (next, removed) = remove_range(text, start, end)
                    .ok_or_else(|| format!("remove range {start:?}..{end:?} out of range"))?;
                Ok(AppliedStep {
                    text: next,
                    start,
                    end,
                    affected: removed,
                })
            }
        }
    }
}

fn end_after(start: (usize, usize), text: &str) -> (usize, usize) {
    match text.rfind('\n') {
        Some(last) => (
            start.0 + text.matches('\n').count(),
            text[last + 1..].chars().count(),
        ),
        None => (start.0, start.1 + text.chars().count()),
    }
}

pub fn load_scenarios(path: &Path) -> Vec<Scenario> {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("failed to read scenario file {path:?}: {err}"));
    parse_scenarios(&content, path)
}

pub fn parse_scenarios(content: &str, path: &Path) -> Vec<Scenario> {
    let manifest: ScenarioManifest = toml::from_str(content)
        .unwrap_or_else(|err| panic!("failed to parse scenario TOML {path:?}: {err}"));
    assert_eq!(
        manifest.format, EDIT_SCENARIOS_FORMAT_V1,
        "unsupported scenario format in {path:?}"
    );
    let mut seen = BTreeSet::new();
    for case in &manifest.cases {
        assert!(
            seen.insert(case.id.as_str()),
            "duplicate scenario id in {path:?}: {}",
            case.id
        );
        assert!(
            !case.steps.is_empty(),
            "scenario {} in {path:?} has no steps",
            case.id
        );
        for step in &case.steps {
            if step.action == StepAction::Remove {
                assert!(
                    step.end.is_some(),
                    "remove step without end in scenario {} ({path:?})",
                    case.id
                );
            }
        }
    }
    manifest.cases
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
format = "livedom-edit-scenarios-v1"

[[case]]
id = "bang"
source = "<p>hi</p>"

[[case.step]]
action = "insert"
start = [0, 5]
text = "!"
expect_path = "full"
expect_ops = ["setText"]

[[case.step]]
action = "remove"
start = [0, 5]
end = [0, 6]
expect_path = "full"
"#;

    #[test]
    fn parses_and_applies_steps() {
        let cases = parse_scenarios(SAMPLE, Path::new("inline"));
        assert_eq!(cases.len(), 1);
        let case = &cases[0];
        assert_eq!(case.steps.len(), 2);

        let first = case.steps[0].apply(&case.source).expect("insert");
        assert_eq!(first.text, "<p>hi!</p>");
        assert_eq!(first.end, (0, 6));

        let second = case.steps[1].apply(&first.text).expect("remove");
        assert_eq!(second.text, case.source);
        assert_eq!(second.affected, "!");
    }

    #[test]
    fn multi_line_insert_end_is_on_last_line() {
        assert_eq!(end_after((2, 4), "a\nbc"), (3, 2));
    }

    #[test]
    #[should_panic(expected = "duplicate scenario id")]
    fn rejects_duplicate_ids() {
        let doubled = format!(
            "{SAMPLE}\n[[case]]\nid = \"bang\"\nsource = \"<p></p>\"\n[[case.step]]\naction = \"insert\"\nstart = [0, 0]\nexpect_path = \"full\"\n"
        );
        parse_scenarios(&doubled, Path::new("inline"));
    }
}
