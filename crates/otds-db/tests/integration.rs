//! Store-level tests: concurrent writers, replay of the op log, and presence.

use otds_core::fixtures::{self, KeyValue, PlainText};
use otds_core::{OtError, PresenceOp, PresencePath, Request, Snapshot, CURSOR_KEY};
use otds_db::{DbError, DocumentKey, DocumentStore, StoreConfig};
use otds_engine::OtEngine;
use proptest::prelude::*;
use serde_json::json;
use std::thread;

fn store() -> DocumentStore {
    DocumentStore::new(OtEngine::new(fixtures::registry()), StoreConfig::default())
}

/// Rebuild a document from version 0 using its log only.
fn replay(store: &DocumentStore, key: &DocumentKey) -> Snapshot {
    let engine = store.engine();
    let mut snapshot = Snapshot::new();
    for op in store.ops(key, 0, None).unwrap() {
        let mut request = op.to_request();
        engine.apply(&mut snapshot, &mut request).unwrap();
    }
    snapshot
}

fn text_len(store: &DocumentStore, key: &DocumentKey) -> usize {
    store
        .fetch(key)
        .data()
        .and_then(|data| data.as_str())
        .map_or(0, |text| text.chars().count())
}

#[test]
fn test_concurrent_writers_converge() {
    let store = store();
    let key = DocumentKey::generate("notes");
    store
        .submit(&key, Request::create("text", Some(json!("0123456789"))))
        .unwrap();

    thread::scope(|scope| {
        for writer in 0..4u64 {
            let store = &store;
            let key = &key;
            scope.spawn(move || {
                let src = format!("writer-{writer}");
                for seq in 1..=25u64 {
                    // Author against whatever was visible, then race to submit.
                    let seen = store.fetch(key);
                    let base = seen.v;
                    let len = seen.data().and_then(|d| d.as_str()).map_or(0, |t| t.chars().count());
                    let edit = PlainText::insert((seq as usize * 7 + writer as usize) % (len + 1), "w");
                    let request = Request::edit(edit).at_version(base).from_session(src.clone(), seq);
                    store.submit(key, request).unwrap();
                }
            });
        }
    });

    let snapshot = store.fetch(&key);
    assert_eq!(snapshot.v, 101);
    assert_eq!(text_len(&store, &key), 110);
    let replayed = replay(&store, &key);
    assert_eq!(replayed.v, snapshot.v);
    assert_eq!(replayed.data(), snapshot.data());
}

#[test]
fn test_documents_are_independent() {
    let store = store();
    let notes = DocumentKey::new("notes", "1");
    let settings = DocumentKey::new("settings", "1");

    store
        .submit_value(&notes, &json!({"create": {"type": "text", "data": "n"}}))
        .unwrap();
    store
        .submit_value(&settings, &json!({"create": {"type": "json0"}}))
        .unwrap();
    store
        .submit(&settings, Request::edit(KeyValue::set("theme", json!("dark"))))
        .unwrap();

    assert_eq!(store.version(&notes), 1);
    assert_eq!(store.version(&settings), 2);
    assert_eq!(store.fetch(&settings).data(), Some(&json!({"theme": "dark"})));
    assert_eq!(store.keys(), vec![notes, settings]);
}

#[test]
fn test_delete_and_recreate() {
    let store = store();
    let key = DocumentKey::new("notes", "x");
    store.submit(&key, Request::create("text", Some(json!("a")))).unwrap();
    store.submit(&key, Request::delete().at_version(1)).unwrap();

    // A stale edit cannot land on a deleted document.
    let err = store
        .submit(&key, Request::edit(PlainText::insert(0, "b")).at_version(1))
        .unwrap_err();
    assert_eq!(err.to_string(), "Document was deleted");

    store.submit(&key, Request::create("json0", None)).unwrap();
    let snapshot = store.fetch(&key);
    assert_eq!(snapshot.v, 3);
    assert_eq!(snapshot.type_uri(), Some(KeyValue::URI));

    let log = store.ops(&key, 1, Some(2)).unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].prev.as_ref().map(|prev| &prev.data), Some(&json!("a")));
}

#[test]
fn test_own_cursor_moves_past_own_insert() {
    let store = store();
    let key = DocumentKey::new("notes", "c");
    store.submit(&key, Request::create("text", Some(json!("ab")))).unwrap();
    for sid in ["me", "you"] {
        let cursor = PresenceOp::set(PresencePath::Field(sid.into(), CURSOR_KEY.into()), json!(1));
        store.submit_presence(&key, 1, cursor).unwrap();
    }

    store
        .submit(&key, Request::edit(PlainText::insert(1, "X")).from_session("me", 1))
        .unwrap();

    let presence = store.presence(&key);
    assert_eq!(presence.cursor("me"), Some(&json!(2)));
    assert_eq!(presence.cursor("you"), Some(&json!(1)));
}

#[test]
fn test_rejected_create_is_still_logged() {
    let store = store();
    let key = DocumentKey::new("notes", "hooked");
    let create = Request::create("text", Some(json!("abc"))).with_validate(|_, _| Err("nope".into()));

    let err = store.submit(&key, create).unwrap_err();
    assert_eq!(err, DbError::Ot(OtError::Rejected("nope".into())));
    assert_eq!(store.version(&key), 1);
    assert_eq!(store.ops(&key, 0, None).unwrap().len(), 1);

    // Both edits are based on v1; the second must be rebased past the first.
    store
        .submit(&key, Request::edit(PlainText::insert(0, "x")).at_version(1))
        .unwrap();
    let committed = store
        .submit(&key, Request::edit(PlainText::insert(3, "y")).at_version(1))
        .unwrap();
    assert_eq!(committed.transformed, 1);
    assert_eq!(store.fetch(&key).data(), Some(&json!("xabcy")));

    let replayed = replay(&store, &key);
    assert_eq!(replayed.v, 3);
    assert_eq!(replayed.data(), store.fetch(&key).data());
}

#[test]
fn test_rejected_delete_is_still_logged() {
    let store = store();
    let key = DocumentKey::new("notes", "hooked-delete");
    store.submit(&key, Request::create("text", Some(json!("abc")))).unwrap();

    let delete = Request::delete().with_validate(|_, _| Err("kept".into()));
    assert!(store.submit(&key, delete).is_err());

    let log = store.ops(&key, 0, None).unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].prev.as_ref().map(|prev| &prev.data), Some(&json!("abc")));
    assert_eq!(replay(&store, &key), store.fetch(&key));
}

#[test]
fn test_failed_edit_leaves_no_trace() {
    let store = store();
    let key = DocumentKey::new("notes", "partial");
    store.submit(&key, Request::create("text", Some(json!("abc")))).unwrap();

    let err = store
        .submit_value(&key, &json!({"op": [{"p": 0, "i": "Z"}, {"p": 99, "i": "y"}]}))
        .unwrap_err();
    assert_eq!(err.to_string(), "Insert position out of range");

    let snapshot = store.fetch(&key);
    assert_eq!(snapshot.v, 1);
    assert_eq!(snapshot.data(), Some(&json!("abc")));
    assert_eq!(store.ops(&key, 0, None).unwrap().len(), 1);
    assert_eq!(replay(&store, &key).data(), snapshot.data());
}

#[test]
fn test_position_past_usize_range_is_an_error() {
    let store = store();
    let key = DocumentKey::new("notes", "huge");
    store.submit(&key, Request::create("text", Some(json!("abc")))).unwrap();

    for component in [json!({"p": u64::MAX, "d": "a"}), json!({"p": u64::MAX, "i": "a"})] {
        let err = store
            .submit_value(&key, &json!({ "op": [component] }))
            .unwrap_err();
        assert!(matches!(err, DbError::Ot(OtError::Provider(_))), "{err}");
    }
    assert_eq!(store.fetch(&key).data(), Some(&json!("abc")));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn stale_submissions_replay_to_snapshot(
        edits in prop::collection::vec((0u64..4, 0usize..20, any::<bool>()), 1..20)
    ) {
        let store = store();
        let key = DocumentKey::new("notes", "p");
        store.submit(&key, Request::create("text", Some(json!("abcdef")))).unwrap();

        for (lag, pos, insert) in edits {
            let head = store.version(&key);
            let base = head.saturating_sub(lag).max(1);
            // Author against the text as it was at `base`.
            let mut at_base = Snapshot::new();
            for op in store.ops(&key, 0, Some(base)).unwrap() {
                store.engine().apply(&mut at_base, &mut op.to_request()).unwrap();
            }
            let text: Vec<char> = at_base.data().and_then(|d| d.as_str()).unwrap_or("").chars().collect();
            let op = if insert || text.is_empty() {
                PlainText::insert(pos % (text.len() + 1), "z")
            } else {
                let p = pos % text.len();
                PlainText::delete(p, &text[p].to_string())
            };
            store.submit(&key, Request::edit(op).at_version(base)).unwrap();
        }

        let replayed = replay(&store, &key);
        let snapshot = store.fetch(&key);
        prop_assert_eq!(replayed.v, snapshot.v);
        prop_assert_eq!(replayed.data(), snapshot.data());
    }
}
