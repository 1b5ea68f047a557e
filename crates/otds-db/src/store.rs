//! Document Store - committed state for many OT documents.
//!
//! Each document owns a snapshot, its committed-op log and its presence.
//! Submissions are serialised per document by that document's lock; different
//! documents proceed in parallel.
//!
//! A submission based on an older version is transformed past every op
//! committed since, one op at a time in commit order, and then applied at the
//! head.

use crate::config::StoreConfig;
use crate::error::{DbError, Result};
use crate::oplog::CommittedOp;
use otds_core::{PresenceOp, PresenceStore, Request, Snapshot};
use otds_engine::OtEngine;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use ulid::Ulid;

/// Address of a document: a collection name plus an id within it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentKey {
    pub collection: String,
    pub id: String,
}

impl DocumentKey {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// A key with a fresh, sortable id.
    pub fn generate(collection: impl Into<String>) -> Self {
        Self::new(collection, Ulid::new().to_string())
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Outcome of a successful submission.
#[derive(Clone, Debug, PartialEq)]
pub struct Committed {
    pub op: CommittedOp,
    /// Number of committed ops the submission was transformed past.
    pub transformed: u64,
}

#[derive(Debug, Default)]
struct DocumentEntry {
    snapshot: Snapshot,
    ops: Vec<CommittedOp>,
    presence: PresenceStore,
    last_seq: HashMap<String, u64>,
}

impl DocumentEntry {
    /// Ops committed at or after `from`. The log starts at version 0, so an
    /// op's version is its index.
    fn since(&self, from: u64) -> &[CommittedOp] {
        let from = (from as usize).min(self.ops.len());
        &self.ops[from..]
    }
}

/// Thread-safe store of OT documents.
pub struct DocumentStore {
    engine: Arc<OtEngine>,
    config: StoreConfig,
    documents: RwLock<HashMap<DocumentKey, Arc<Mutex<DocumentEntry>>>>,
}

impl DocumentStore {
    pub fn new(engine: impl Into<Arc<OtEngine>>, config: StoreConfig) -> Self {
        Self {
            engine: engine.into(),
            config,
            documents: RwLock::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> &OtEngine {
        &self.engine
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn entry(&self, key: &DocumentKey) -> Option<Arc<Mutex<DocumentEntry>>> {
        self.documents.read().get(key).cloned()
    }

    fn entry_or_insert(&self, key: &DocumentKey) -> Arc<Mutex<DocumentEntry>> {
        if let Some(entry) = self.entry(key) {
            return entry;
        }
        self.documents.write().entry(key.clone()).or_default().clone()
    }

    fn existing(&self, key: &DocumentKey) -> Result<Arc<Mutex<DocumentEntry>>> {
        self.entry(key)
            .ok_or_else(|| DbError::DocumentNotFound(key.to_string()))
    }

    /// Where a submission based on `base` sits relative to `head`.
    fn check_lag(&self, base: u64, head: u64) -> Result<()> {
        if base > head {
            return Err(DbError::FutureVersion {
                submitted: base,
                head,
            });
        }
        let behind = head - base;
        if behind > self.config.max_op_lag {
            return Err(DbError::OpTooOld {
                behind,
                limit: self.config.max_op_lag,
            });
        }
        Ok(())
    }

    // === Submission ===

    /// Commit a request against the document at `key`.
    ///
    /// A request without `v` is taken to be based on the current head. A
    /// create or delete refused by its `validate` hook stays committed and
    /// logged; the refusal is still returned. A failed edit leaves the
    /// document untouched.
    pub fn submit(&self, key: &DocumentKey, request: Request) -> Result<Committed> {
        self.commit(key, request).inspect_err(|err| {
            warn!(document = %key, error = %err, "submission rejected");
        })
    }

    fn commit(&self, key: &DocumentKey, mut request: Request) -> Result<Committed> {
        self.engine.check_typed(&request)?;
        self.engine.normalize(&mut request);

        let entry = self.entry_or_insert(key);
        let mut doc = entry.lock();
        let head = doc.snapshot.v;
        let base = *request.v.get_or_insert(head);
        self.check_lag(base, head)?;

        if self.config.reject_duplicate_submits {
            if let (Some(src), Some(seq)) = (&request.src, request.seq) {
                if doc.last_seq.get(src).is_some_and(|last| seq <= *last) {
                    return Err(DbError::DuplicateOp {
                        src: src.clone(),
                        seq,
                    });
                }
            }
        }

        let type_uri = doc.snapshot.type_uri().map(str::to_string);
        for committed in doc.since(base) {
            self.engine
                .transform(type_uri.as_deref(), &mut request, &committed.to_request())?;
        }

        let DocumentEntry {
            snapshot,
            ops,
            presence,
            last_seq,
        } = &mut *doc;

        // Work on a copy: an edit that fails part way leaves its earlier
        // atoms behind, and those must never reach the stored snapshot.
        let mut scratch = snapshot.clone();
        let applied = self.engine.apply(&mut scratch, &mut request);
        if let Err(err) = &applied {
            if scratch.v == head {
                return Err(err.clone().into());
            }
        }
        // A create or delete rejected by its `validate` hook has still
        // landed; it is logged like any other commit before the error
        // is reported.
        *snapshot = scratch;

        let op = CommittedOp::from_request(head, &request);
        ops.push(op.clone());
        if let (Some(src), Some(seq)) = (&request.src, request.seq) {
            last_seq.insert(src.clone(), seq);
        }

        if self.config.track_presence {
            if let Err(err) = self
                .engine
                .update_presence(snapshot.type_uri(), presence, &request)
            {
                warn!(document = %key, error = %err, "presence not updated");
            }
        }

        debug!(
            document = %key,
            action = op.action.name(),
            v = snapshot.v,
            transformed = head - base,
            "op committed"
        );
        applied?;
        Ok(Committed {
            op,
            transformed: head - base,
        })
    }

    /// Parse a wire-form request and commit it.
    pub fn submit_value(&self, key: &DocumentKey, raw: &Value) -> Result<Committed> {
        let request = self.engine.parse_request(raw)?;
        self.submit(key, request)
    }

    /// Parse a JSON-encoded request and commit it.
    pub fn submit_str(&self, key: &DocumentKey, raw: &str) -> Result<Committed> {
        let raw: Value = serde_json::from_str(raw)?;
        self.submit_value(key, &raw)
    }

    // === Reads ===

    /// Current snapshot. Unknown documents read as an empty version 0.
    pub fn fetch(&self, key: &DocumentKey) -> Snapshot {
        self.entry(key)
            .map(|entry| entry.lock().snapshot.clone())
            .unwrap_or_default()
    }

    pub fn version(&self, key: &DocumentKey) -> u64 {
        self.entry(key).map_or(0, |entry| entry.lock().snapshot.v)
    }

    /// Committed ops with `from <= v < to`; `to` defaults to the head.
    pub fn ops(&self, key: &DocumentKey, from: u64, to: Option<u64>) -> Result<Vec<CommittedOp>> {
        let entry = self.existing(key)?;
        let doc = entry.lock();
        let to = to.unwrap_or(u64::MAX);
        Ok(doc
            .since(from)
            .iter()
            .take_while(|op| op.v < to)
            .cloned()
            .collect())
    }

    /// Snapshot and log together, JSON-encoded.
    pub fn export(&self, key: &DocumentKey) -> Result<String> {
        let entry = self.existing(key)?;
        let doc = entry.lock();
        let ops: Vec<Value> = doc.ops.iter().map(CommittedOp::to_value).collect();
        let out = serde_json::to_string(&json!({
            "snapshot": doc.snapshot,
            "ops": ops,
        }))?;
        Ok(out)
    }

    pub fn keys(&self) -> Vec<DocumentKey> {
        let mut keys: Vec<_> = self.documents.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    // === Presence ===

    /// Apply a presence op authored against `base_version`, moving its
    /// cursor past every op committed since.
    pub fn submit_presence(
        &self,
        key: &DocumentKey,
        base_version: u64,
        mut op: PresenceOp,
    ) -> Result<PresenceOp> {
        let entry = self.existing(key)?;
        let mut doc = entry.lock();
        self.check_lag(base_version, doc.snapshot.v)?;

        let type_uri = doc.snapshot.type_uri().map(str::to_string);
        for committed in doc.since(base_version) {
            self.engine.transform_presence(
                type_uri.as_deref(),
                &doc.presence,
                &mut op,
                &committed.to_request(),
            )?;
        }
        self.engine.apply_presence(&mut doc.presence, &op)?;
        trace!(document = %key, presence = %op.to_value(), "presence applied");
        Ok(op)
    }

    /// Copy of the document's presence.
    pub fn presence(&self, key: &DocumentKey) -> PresenceStore {
        self.entry(key)
            .map(|entry| entry.lock().presence.clone())
            .unwrap_or_default()
    }
}

impl fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentStore")
            .field("config", &self.config)
            .field("documents", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfigBuilder;
    use otds_core::fixtures::{self, PlainText};
    use otds_core::{OtError, PresencePath};

    fn store() -> DocumentStore {
        DocumentStore::new(OtEngine::new(fixtures::registry()), StoreConfig::default())
    }

    fn key() -> DocumentKey {
        DocumentKey::new("notes", "a")
    }

    fn create_text(store: &DocumentStore, text: &str) {
        store
            .submit(&key(), Request::create("text", Some(json!(text))))
            .unwrap();
    }

    #[test]
    fn test_unknown_document_reads_empty() {
        let store = store();
        assert_eq!(store.fetch(&key()), Snapshot::new());
        assert_eq!(store.version(&key()), 0);
        assert!(matches!(
            store.ops(&key(), 0, None),
            Err(DbError::DocumentNotFound(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_create_normalizes_type() {
        let store = store();
        create_text(&store, "hi");
        let snapshot = store.fetch(&key());
        assert_eq!(snapshot.v, 1);
        assert_eq!(snapshot.type_uri(), Some(PlainText::URI));

        let ops = store.ops(&key(), 0, None).unwrap();
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            &ops[0].action,
            otds_core::Action::Create { type_id, .. } if type_id == PlainText::URI
        ));
    }

    #[test]
    fn test_stale_submission_is_transformed() {
        let store = store();
        create_text(&store, "abc");
        store
            .submit(&key(), Request::edit(PlainText::insert(0, "xx")).at_version(1))
            .unwrap();

        let committed = store
            .submit(&key(), Request::edit(PlainText::insert(3, "!")).at_version(1))
            .unwrap();
        assert_eq!(committed.transformed, 1);
        assert_eq!(committed.op.v, 2);
        assert_eq!(store.fetch(&key()).data(), Some(&json!("xxabc!")));
    }

    #[test]
    fn test_future_and_old_versions_refused() {
        let store = DocumentStore::new(
            OtEngine::new(fixtures::registry()),
            StoreConfigBuilder::new().max_op_lag(1).build(),
        );
        create_text(&store, "");
        for i in 0..2 {
            store
                .submit(&key(), Request::edit(PlainText::insert(i, "a")))
                .unwrap();
        }

        let err = store
            .submit(&key(), Request::edit(PlainText::insert(0, "b")).at_version(9))
            .unwrap_err();
        assert_eq!(err, DbError::FutureVersion { submitted: 9, head: 3 });

        let err = store
            .submit(&key(), Request::edit(PlainText::insert(0, "b")).at_version(1))
            .unwrap_err();
        assert_eq!(err, DbError::OpTooOld { behind: 2, limit: 1 });
        assert_eq!(store.version(&key()), 3);
    }

    #[test]
    fn test_duplicate_submit_refused() {
        let store = store();
        create_text(&store, "");
        let edit = || Request::edit(PlainText::insert(0, "a")).from_session("s1", 1);
        store.submit(&key(), edit()).unwrap();

        let err = store.submit(&key(), edit()).unwrap_err();
        assert_eq!(
            err,
            DbError::DuplicateOp {
                src: "s1".into(),
                seq: 1
            }
        );
        assert_eq!(store.fetch(&key()).data(), Some(&json!("a")));
    }

    #[test]
    fn test_engine_errors_pass_through() {
        let store = store();
        let err = store
            .submit(&key(), Request::edit(PlainText::insert(0, "a")))
            .unwrap_err();
        assert_eq!(err, DbError::Ot(OtError::DocumentMissing));

        let err = store
            .submit_value(&key(), &json!({"create": {"type": "nope"}}))
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown type");

        let err = store.submit_str(&key(), "{").unwrap_err();
        assert!(matches!(err, DbError::Serialization(_)));
    }

    #[test]
    fn test_presence_catches_up() {
        let store = store();
        create_text(&store, "hello");
        let cursor = PresenceOp::set(
            PresencePath::Field("alice".into(), otds_core::CURSOR_KEY.into()),
            json!(5),
        );
        store
            .submit(&key(), Request::edit(PlainText::insert(0, "> ")).from_session("bob", 1))
            .unwrap();

        // Authored before bob's edit landed.
        let applied = store.submit_presence(&key(), 1, cursor).unwrap();
        assert_eq!(applied.val, json!(7));
        assert_eq!(store.presence(&key()).cursor("alice"), Some(&json!(7)));

        store
            .submit(&key(), Request::edit(PlainText::insert(0, "#")).from_session("bob", 2))
            .unwrap();
        assert_eq!(store.presence(&key()).cursor("alice"), Some(&json!(8)));

        store.submit(&key(), Request::delete()).unwrap();
        assert_eq!(store.presence(&key()).cursor("alice"), None);
    }

    #[test]
    fn test_export() {
        let store = store();
        create_text(&store, "x");
        let exported: Value = serde_json::from_str(&store.export(&key()).unwrap()).unwrap();
        assert_eq!(exported["snapshot"]["data"], json!("x"));
        assert_eq!(exported["ops"].as_array().map(Vec::len), Some(1));
    }
}
