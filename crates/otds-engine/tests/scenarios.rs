//! End-to-end scenarios over wire-form requests and snapshots.

use otds_core::fixtures::{self, KeyValue, PlainText};
use otds_core::{OtError, PresenceOp, PresencePath, PresenceStore, Request, Snapshot};
use otds_engine::{EditCommitPolicy, EngineConfigBuilder, OtEngine};
use serde_json::{json, Value};

fn engine() -> OtEngine {
    OtEngine::new(fixtures::registry())
}

fn apply_raw(engine: &OtEngine, snapshot: &mut Snapshot, raw: Value) -> Result<Request, OtError> {
    let mut request = engine.parse_request(&raw)?;
    engine.apply(snapshot, &mut request)?;
    Ok(request)
}

#[test]
fn test_create_then_delete_document() {
    let engine = engine();
    let mut doc = Snapshot::new();

    let mut create = Request::from_value(&json!({"create": {"type": "json0", "data": {"a": 1}}})).unwrap();
    engine.normalize(&mut create);
    engine.apply(&mut doc, &mut create).unwrap();

    let wire = doc.to_value();
    assert_eq!(wire["v"], json!(1));
    assert_eq!(wire["type"], json!(KeyValue::URI));
    assert_eq!(wire["data"], json!({"a": 1}));
    assert_eq!(wire["m"]["ctime"], wire["m"]["mtime"]);

    let delete = apply_raw(&engine, &mut doc, json!({"del": true, "v": 1})).unwrap();
    assert_eq!(doc.to_value(), json!({"v": 2}));
    assert_eq!(
        delete.to_value()["prev"],
        json!({"type": KeyValue::URI, "data": {"a": 1}})
    );
}

#[test]
fn test_transform_wire_requests() {
    let engine = engine();
    let mut pending = engine
        .parse_request(&json!({"v": 5, "op": [{"p": 2, "i": "b"}], "src": "s1", "seq": 9}))
        .unwrap();
    let applied = engine
        .parse_request(&json!({"v": 5, "op": [{"p": 0, "i": "aa"}]}))
        .unwrap();

    engine
        .transform(Some(PlainText::URI), &mut pending, &applied)
        .unwrap();

    let wire = pending.to_value();
    assert_eq!(wire["v"], json!(6));
    assert_eq!(wire["op"], json!([{"p": 4, "i": "b"}]));
    assert_eq!(wire["src"], json!("s1"));
}

#[test]
fn test_rejected_requests_fail_apply_too() {
    let engine = engine();
    let mut seq_only = Request::edit(json!([]));
    seq_only.seq = Some(1);
    let mut src_only = Request::delete();
    src_only.src = Some("s1".into());
    let typed_rejections = [
        Request::create("rich-text", None),
        Request::create("", None),
        seq_only,
        src_only,
    ];

    for mut request in typed_rejections {
        let raw = request.to_value();
        assert!(engine.check_request(&raw).is_err(), "{raw}");
        assert!(engine.check_typed(&request).is_err(), "{raw}");

        let mut empty = Snapshot::new();
        assert!(engine.apply(&mut empty, &mut request).is_err(), "{raw}");
        assert_eq!(empty, Snapshot::new());

        let existing = Snapshot::with_content(1, PlainText::URI, json!("abc"));
        let mut doc = existing.clone();
        assert!(engine.apply(&mut doc, &mut request).is_err(), "{raw}");
        assert_eq!(doc, existing);
    }

    // The remaining rejections never produce a typed request at all.
    for raw in [
        json!(null),
        json!({}),
        json!({"del": false}),
        json!({"op": [], "src": 4, "seq": 1}),
        json!({"op": [], "m": "meta"}),
    ] {
        assert!(engine.check_request(&raw).is_err(), "{raw}");
        assert!(Request::from_value(&raw).is_err(), "{raw}");
    }
}

#[test]
fn test_policies_differ_only_on_failure() {
    let op = json!([{"p": 0, "i": "x"}, {"p": 9, "d": "z"}]);
    let base = Snapshot::with_content(0, PlainText::URI, json!("abc"));

    let incremental = engine();
    let mut doc = base.clone();
    let mut request = Request::edit(op.clone());
    assert!(incremental.apply(&mut doc, &mut request).is_err());
    assert_eq!(doc.data(), Some(&json!("xabc")));
    assert_eq!(doc.v, 0);
    assert_eq!(request.op(), Some(&op));

    let atomic = engine().with_config(
        EngineConfigBuilder::new()
            .edit_commit(EditCommitPolicy::Atomic)
            .build(),
    );
    let mut doc = base.clone();
    let mut request = Request::edit(op.clone());
    assert!(atomic.apply(&mut doc, &mut request).is_err());
    assert_eq!(doc, base);
    assert_eq!(request.op(), Some(&op));
}

#[test]
fn test_presence_follows_edits() {
    let engine = engine();
    let mut doc = Snapshot::new();
    let mut store = PresenceStore::default();

    apply_raw(&engine, &mut doc, json!({"create": {"type": "text", "data": "hello"}})).unwrap();

    let cursor = PresenceOp::from_value(&json!({"p": ["alice", "_cursor"], "val": 5})).unwrap();
    engine.apply_presence(&mut store, &cursor).unwrap();
    let name = PresenceOp::set(PresencePath::Field("alice".into(), "name".into()), json!("Alice"));
    engine.apply_presence(&mut store, &name).unwrap();

    let mut edit = engine
        .parse_request(&json!({"v": 1, "op": [{"p": 0, "i": ">> "}], "src": "bob", "seq": 1}))
        .unwrap();
    engine.apply(&mut doc, &mut edit).unwrap();
    engine
        .update_presence(doc.type_uri(), &mut store, &edit)
        .unwrap();
    assert_eq!(store.cursor("alice"), Some(&json!(8)));
    assert_eq!(store.session("alice").unwrap()["name"], json!("Alice"));

    let mut delete = engine.parse_request(&json!({"del": true})).unwrap();
    engine.apply(&mut doc, &mut delete).unwrap();
    engine
        .update_presence(None, &mut store, &delete)
        .unwrap();
    assert_eq!(store.cursor("alice"), None);
    assert_eq!(store.session("alice").unwrap()["name"], json!("Alice"));
}

#[test]
fn test_reserved_presence_keys() {
    let engine = engine();
    let mut store = PresenceStore::default();

    let ok = PresenceOp::from_value(&json!({"p": ["s1", "_cursor"], "val": 0})).unwrap();
    assert!(engine.apply_presence(&mut store, &ok).is_ok());

    let reserved = PresenceOp::from_value(&json!({"p": ["s1", "_other"], "val": 0})).unwrap();
    assert_eq!(
        engine.apply_presence(&mut store, &reserved).unwrap_err(),
        OtError::ReservedValue
    );

    let reset = PresenceOp::from_value(&json!({"p": [], "val": null})).unwrap();
    engine.apply_presence(&mut store, &reset).unwrap();
    assert_eq!(store.data, json!({}));
}
