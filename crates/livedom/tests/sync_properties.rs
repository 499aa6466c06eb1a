use livedom::dom_snapshot::{DomSnapshotOptions, assert_dom_eq};
use livedom::test_harness::ScriptReplayer;
use livedom::{
    DEFAULT_ID_ATTRIBUTE, EditClass, EditDelta, FreshIds, FullReason, IdGenerator, Node, Position,
    RootAnchor, Session, SyncConfig, TagId, TextRange, TreeBuilder, UpdatePath, classify_text,
    diff_subtrees, shift_positions,
};
use livedom_test_support::edit_text::insert_at;

const DOCUMENT: &str = "<main>\n  <h1 class=\"title\">Notes</h1>\n  <ul>\n    <li>one</li>\n    <li>two <b>bold</b></li>\n  </ul>\n  <p>tail &amp; end</p>\n</main>\n";

fn loaded(text: &str) -> Session {
    let mut session = Session::default();
    session.load(text).expect("load failed");
    session
}

fn element_ids(root: &Node) -> Vec<(TagId, String)> {
    root.descendants()
        .filter_map(|node| node.name().map(|name| (node.id(), name.to_string())))
        .collect()
}

/// Type `inserted` at `(row, column)` in `text`; returns the new text and delta.
fn typed(text: &str, row: usize, column: usize, inserted: &str) -> (String, EditDelta) {
    let next = insert_at(text, row, column, inserted).expect("position in range");
    (next, EditDelta::insert(Position::new(row, column), inserted))
}

#[test]
fn text_edits_keep_every_element_id() {
    let mut session = loaded(DOCUMENT);
    let before = element_ids(session.tree().expect("tree").root());

    // Inside "two " in the second list item.
    let (text, delta) = typed(DOCUMENT, 4, 12, "and ");
    let outcome = session.update(&text, &[delta]).expect("update");
    assert!(matches!(outcome.path, UpdatePath::Incremental { .. }), "{:?}", outcome.path);

    let after = element_ids(session.tree().expect("tree").root());
    assert_eq!(before, after);
}

#[test]
fn sequential_incremental_updates_match_one_full_reparse() {
    let edits = [(3, 11, "!"), (6, 9, "new "), (1, 21, "My "), (4, 17, "er")];

    let mut incremental = loaded(DOCUMENT);
    let original = incremental.tree().expect("tree").root().clone();
    let mut text = DOCUMENT.to_string();
    let mut deltas = Vec::new();
    for (row, column, inserted) in edits {
        let (next, delta) = typed(&text, row, column, inserted);
        let outcome = incremental
            .update(&next, std::slice::from_ref(&delta))
            .expect("incremental update");
        assert!(
            matches!(outcome.path, UpdatePath::Incremental { .. }),
            "edit {inserted:?} took {:?}",
            outcome.path
        );
        text = next;
        deltas.push(delta);
    }

    let mut full = loaded(DOCUMENT);
    let outcome = full.update(&text, &deltas).expect("full update");
    assert_eq!(outcome.path, UpdatePath::Full(FullReason::DeltaCount));

    let incremental_root = incremental.tree().expect("tree").root();
    let full_root = full.tree().expect("tree").root();
    assert_dom_eq(
        full_root,
        incremental_root,
        DomSnapshotOptions {
            ignore_ids: false,
            include_positions: true,
        },
    );

    let sorted = |root: &Node| {
        let script = diff_subtrees(&original, root, RootAnchor::DOCUMENT).expect("diff");
        let mut ops: Vec<String> = script
            .iter()
            .map(|op| serde_json::to_string(op).expect("serialize"))
            .collect();
        ops.sort();
        ops
    };
    assert_eq!(sorted(incremental_root), sorted(full_root));
}

#[test]
fn single_line_insert_shifts_only_later_columns_on_its_row() {
    let mut ids = IdGenerator::new();
    let root = TreeBuilder::default()
        .build(DOCUMENT, Position::ZERO, &mut FreshIds::new(&mut ids))
        .expect("build");
    let at = Position::new(4, 12);
    let inserted = "xyz";

    let mut shifted = root.clone();
    shift_positions(&mut shifted, &EditDelta::insert(at, inserted));

    for (before, after) in root.descendants().zip(shifted.descendants()) {
        for (old, new) in [(before.start(), after.start()), (before.end(), after.end())] {
            if old.row == at.row && old.column >= at.column {
                assert_eq!(new, Position::new(old.row, old.column + inserted.len()));
            } else {
                assert_eq!(new, old);
            }
        }
    }
}

#[test]
fn instrumented_text_round_trips() {
    let session = loaded(DOCUMENT);
    let tree = session.tree().expect("tree");
    let instrumented = session.instrumented_text(DOCUMENT).expect("instrument");
    assert_ne!(instrumented, DOCUMENT);

    let mut ids = IdGenerator::starting_after(1000);
    let reparsed = TreeBuilder::default()
        .build(&instrumented, Position::ZERO, &mut FreshIds::new(&mut ids))
        .expect("instrumented text parses");

    let originals: Vec<&Node> = tree.root().descendants().collect();
    let copies: Vec<&Node> = reparsed.descendants().collect();
    assert_eq!(originals.len(), copies.len());
    for (original, copy) in originals.into_iter().zip(copies) {
        assert_eq!(original.name(), copy.name());
        assert_eq!(original.text_content(), copy.text_content());
        if let (Some(expected), Some(actual)) = (original.attributes(), copy.attributes()) {
            let mut actual = actual.clone();
            let injected = actual.remove(DEFAULT_ID_ATTRIBUTE);
            assert_eq!(injected, Some(original.id().to_string()));
            assert_eq!(expected, &actual);
        }
    }
}

#[test]
fn dangerous_characters_always_force_full_reparse() {
    for ch in ["<", ">", "/", "=", "\"", "'"] {
        assert_eq!(classify_text(ch), EditClass::Structural, "{ch:?}");

        let mut session = loaded(DOCUMENT);
        let (text, delta) = typed(DOCUMENT, 3, 11, ch);
        let path = match session.update(&text, &[delta]) {
            Ok(outcome) => outcome.path,
            Err(err) => panic!("inserting {ch:?} failed: {err}"),
        };
        assert_eq!(path, UpdatePath::Full(FullReason::StructuralEdit), "{ch:?}");
    }
    assert_eq!(classify_text("&amp;"), EditClass::TextOnly);

    let mut session = loaded(DOCUMENT);
    let (text, delta) = typed(DOCUMENT, 3, 11, "&amp;");
    let outcome = session.update(&text, &[delta]).expect("update");
    assert!(matches!(outcome.path, UpdatePath::Incremental { .. }));
}

#[test]
fn paragraph_text_edit_is_single_set_text() {
    let mut session = loaded("<div><p>hi</p></div>");
    let (text, delta) = typed("<div><p>hi</p></div>", 0, 10, "!");
    let outcome = session.update(&text, &[delta]).expect("update");
    assert_eq!(
        outcome.path,
        UpdatePath::Incremental {
            reparsed: TagId::element(2)
        }
    );
    assert_eq!(outcome.script.len(), 1);
    assert_eq!(
        serde_json::to_value(&outcome.script).expect("serialize"),
        serde_json::json!([{"op": "setText", "tagID": TagId::text(TagId::element(2), 0).0, "content": "hi!"}])
    );
}

#[test]
fn consumer_catches_up_after_invalid_period() {
    let source = "<div><p>a</p><p>b</p></div>";
    let mut session = loaded(source);
    let mut consumer = ScriptReplayer::from_node(session.tree().expect("tree").root())
        .expect("consumer");

    // Open a tag, keep typing while the document is broken, then close it.
    let (text, delta) = typed(source, 0, 13, "<em>");
    assert!(session.update(&text, &[delta]).is_err());
    let (text, delta) = typed(&text, 0, 17, "x");
    assert!(session.update(&text, &[delta]).is_err());
    assert!(session.is_dirty());
    let (text, delta) = typed(&text, 0, 18, "</em>");
    let outcome = session.update(&text, &[delta]).expect("valid again");
    assert_eq!(outcome.path, UpdatePath::Full(FullReason::Dirty));

    consumer.apply(&outcome.script).expect("replay");
    let replayed = consumer.materialize().expect("materialize");
    assert_dom_eq(
        session.tree().expect("tree").root(),
        &replayed,
        DomSnapshotOptions::WITH_IDS,
    );
}

#[test]
fn markers_cover_reparsed_subtree_and_removals() {
    let source = "<div><p>a</p><p>b</p></div>";
    let mut session = loaded(source);
    let (text, delta) = typed(source, 0, 9, "z");
    let outcome = session.update(&text, &[delta]).expect("update");
    let p = TagId::element(2);
    assert_eq!(
        outcome.markers.upserted,
        vec![
            (p, TextRange::new(Position::new(0, 5), Position::new(0, 14))),
            (
                TagId::text(p, 0),
                TextRange::new(Position::new(0, 8), Position::new(0, 10))
            ),
        ]
    );
    assert!(outcome.markers.removed.is_empty());

    let without_second = "<div><p>az</p></div>";
    let delta = EditDelta::remove(
        TextRange::new(Position::new(0, 14), Position::new(0, 22)),
        "<p>b</p>",
    );
    let outcome = session.update(without_second, &[delta]).expect("update");
    assert_eq!(
        outcome.markers.removed,
        vec![TagId::element(3), TagId::text(TagId::element(3), 0)]
    );
}

#[test]
fn disabled_incremental_config_matches_incremental_result() {
    let mut fast = loaded(DOCUMENT);
    let mut slow = Session::new(SyncConfig {
        incremental: false,
        ..SyncConfig::default()
    });
    slow.load(DOCUMENT).expect("load");
    let (text, delta) = typed(DOCUMENT, 6, 9, "very ");
    let a = fast.update(&text, std::slice::from_ref(&delta)).expect("fast");
    let b = slow.update(&text, &[delta]).expect("slow");
    assert_eq!(a.script, b.script);
}
