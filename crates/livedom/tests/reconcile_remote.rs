use livedom::{EditOp, NodePayload, ObservedNode, Reconciler, Session, SyncConfig, TagId};
use serde_json::json;

fn observed(value: serde_json::Value) -> ObservedNode {
    serde_json::from_value(value).expect("observed tree json")
}

fn loaded(text: &str) -> Session {
    let mut session = Session::default();
    session.load(text).expect("load failed");
    session
}

fn op_names(ops: &[EditOp]) -> Vec<String> {
    ops.iter()
        .map(|op| {
            serde_json::to_value(op).expect("serialize")["op"]
                .as_str()
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}

/// Renderers wrap the document; the local root is found inside the wrapper.
fn wrapped(div: serde_json::Value) -> ObservedNode {
    observed(json!({
        "type": "element",
        "tag": "html",
        "children": [{
            "type": "element",
            "tag": "body",
            "children": [div],
        }],
    }))
}

#[test]
fn wrapper_elements_do_not_count_as_drift() {
    let session = loaded("<div><p>hi</p></div>");
    let view = wrapped(json!({
        "type": "element",
        "tag": "div",
        "attributes": {"data-livedom-id": "1"},
        "children": [{
            "type": "element",
            "tag": "p",
            "attributes": {"data-livedom-id": "2"},
            "children": [{"type": "text", "content": "hi"}],
        }],
    }));
    let result = session
        .reconcile(&view)
        .expect("reconcile")
        .expect("tree loaded");
    assert!(!result.used_fallback_root);
    assert_eq!(result.root.name(), Some("div"));
    assert_eq!(result.root.id(), TagId::element(1));
    assert!(result.script.is_empty(), "{:?}", result.script);
}

#[test]
fn stale_text_inside_wrapper_is_reset() {
    let session = loaded("<div><p>fresh</p></div>");
    let view = wrapped(json!({
        "type": "element",
        "tag": "div",
        "attributes": {"data-livedom-id": "1"},
        "children": [{
            "type": "element",
            "tag": "p",
            "attributes": {"data-livedom-id": "2"},
            "children": [{"type": "text", "content": "stale"}],
        }],
    }));
    let result = session.reconcile(&view).expect("reconcile").expect("tree");
    assert_eq!(
        result.script.ops(),
        &[EditOp::SetText {
            tag_id: TagId::text(TagId::element(2), 0),
            content: "fresh".into(),
        }]
    );
}

#[test]
fn dropped_element_is_inserted_again() {
    let session = loaded("<div><p>a</p><p>b</p></div>");
    let view = observed(json!({
        "type": "element",
        "tag": "div",
        "attributes": {"data-livedom-id": "1"},
        "children": [{
            "type": "element",
            "tag": "p",
            "attributes": {"data-livedom-id": "2"},
            "children": [{"type": "text", "content": "a"}],
        }],
    }));
    let result = session.reconcile(&view).expect("reconcile").expect("tree");
    assert_eq!(op_names(result.script.ops()), vec!["insert", "insert"]);
    assert_eq!(
        result.script.ops()[0],
        EditOp::Insert {
            tag_id: TagId::element(3),
            parent_id: Some(TagId::element(1)),
            index: 1,
            node: NodePayload::Element {
                tag_name: "p".into(),
                attributes: Default::default(),
            },
        }
    );
}

#[test]
fn renderer_only_element_is_deleted() {
    let session = loaded("<div><p>a</p></div>");
    let view = observed(json!({
        "type": "element",
        "tag": "div",
        "attributes": {"data-livedom-id": "1"},
        "children": [
            {
                "type": "element",
                "tag": "p",
                "attributes": {"data-livedom-id": "2"},
                "children": [{"type": "text", "content": "a"}],
            },
            {
                "type": "element",
                "tag": "aside",
                "children": [{"type": "text", "content": "injected"}],
            },
        ],
    }));
    let result = session.reconcile(&view).expect("reconcile").expect("tree");
    assert_eq!(op_names(result.script.ops()), vec!["delete"]);
    assert!(result.script.ops()[0].tag_id().is_foreign());
}

#[test]
fn view_without_ids_is_compared_from_its_root() {
    let session = loaded("<div><p>a</p></div>");
    let view = observed(json!({
        "type": "element",
        "tag": "div",
        "children": [{
            "type": "element",
            "tag": "p",
            "children": [{"type": "text", "content": "a"}],
        }],
    }));
    let result = session.reconcile(&view).expect("reconcile").expect("tree");
    assert!(result.used_fallback_root);
    assert!(result.root.id().is_foreign());
    // The whole local tree is rebuilt in place of the foreign one.
    let names = op_names(result.script.ops());
    assert_eq!(names.first().map(String::as_str), Some("insert"));
    assert_eq!(names.last().map(String::as_str), Some("delete"));
}

#[test]
fn custom_id_attribute_is_honoured() {
    let config = SyncConfig {
        id_attribute: "data-src-id".into(),
        ..SyncConfig::default()
    };
    let mut session = Session::new(config.clone());
    session.load("<div>x</div>").expect("load");
    let view = observed(json!({
        "type": "element",
        "tag": "div",
        "attributes": {"data-src-id": "1", "class": "shell"},
        "children": [{"type": "text", "content": "x"}],
    }));
    let tree = session.tree().expect("tree");
    let result = Reconciler::new(&config)
        .reconcile(tree, &view)
        .expect("reconcile");
    assert!(!result.used_fallback_root);
    assert_eq!(op_names(result.script.ops()), vec!["removeAttribute"]);
}

#[test]
fn nothing_to_reconcile_before_load() {
    let session = Session::default();
    let view = observed(json!({"type": "text", "content": "x"}));
    assert!(session.reconcile(&view).expect("reconcile").is_none());
}
