//! Presence engine.
//!
//! Presence is ephemeral per-session state stored beside a document. Ops
//! write at most two levels deep: a whole session value, or one field of
//! it. Cursors live in the reserved `_cursor` field and are moved across
//! document edits through the type provider's cursor transform.

use crate::{provider_failure, OtEngine};
use otds_core::{
    Action, PresenceOp, PresencePath, PresenceStore, Request, ReservedKeyRule, Result, CURSOR_KEY,
};
use serde_json::{Map, Value};
use tracing::trace;

/// Field names a presence op may use to carry a cursor.
const CURSOR_OP_FIELDS: [&str; 2] = ["cursor", CURSOR_KEY];

/// Apply a presence op to a store in place.
///
/// A null value deletes the addressed entry. Deleting a field of a session
/// that has no value is a no-op; deleting at the root empties the store.
pub fn apply_presence(store: &mut PresenceStore, op: &PresenceOp) -> Result<()> {
    let rule = ReservedKeyRule::DEFAULT;
    match &op.path {
        PresencePath::Root => {
            store.data = if op.is_delete() {
                Value::Object(Map::new())
            } else {
                op.val.clone()
            };
        }
        PresencePath::Session(sid) => {
            rule.check_value(&op.val)?;
            if op.is_delete() {
                if let Some(sessions) = store.data.as_object_mut() {
                    sessions.remove(sid);
                }
            } else {
                ensure_object(&mut store.data);
                store.data[sid.as_str()] = op.val.clone();
            }
        }
        PresencePath::Field(sid, field) => {
            rule.check_key(field)?;
            if op.is_delete() {
                if let Some(session) = store.data.get_mut(sid.as_str()).and_then(Value::as_object_mut) {
                    session.remove(field);
                }
            } else {
                ensure_object(&mut store.data);
                let session = &mut store.data[sid.as_str()];
                ensure_object(session);
                session[field.as_str()] = op.val.clone();
            }
        }
    }
    Ok(())
}

/// Replace anything that is not an object with an empty one.
fn ensure_object(value: &mut Value) {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
}

impl OtEngine {
    /// Apply a presence op; see [`apply_presence`].
    pub fn apply_presence(&self, store: &mut PresenceStore, op: &PresenceOp) -> Result<()> {
        apply_presence(store, op)
    }

    /// Move the cursor carried by a presence op across a document request
    /// committed after the presence op was authored.
    ///
    /// Only ops addressing `[session, "cursor"]` (or `_cursor`) against an
    /// edit are touched, and only when the type can transform cursors.
    /// The document's presence store is taken for context but not read:
    /// the new cursor depends only on `op` and `request`.
    pub fn transform_presence(
        &self,
        type_id: Option<&str>,
        _presence: &PresenceStore,
        op: &mut PresenceOp,
        request: &Request,
    ) -> Result<()> {
        let PresencePath::Field(sid, field) = &op.path else {
            return Ok(());
        };
        if !CURSOR_OP_FIELDS.contains(&field.as_str()) || op.is_delete() {
            return Ok(());
        }
        let Some(doc_op) = request.op() else {
            return Ok(());
        };
        let provider = self.resolve(type_id)?;
        if !provider.supports_cursor() {
            return Ok(());
        }

        let is_own_op = request.src.as_deref() == Some(sid.as_str());
        let cursor = provider
            .transform_cursor(&op.val, doc_op, is_own_op)
            .map_err(|err| provider_failure(provider.as_ref(), "transform_cursor", err))?;
        trace!(session = %sid, from = %op.val, to = %cursor, "presence cursor transformed");
        op.val = cursor;
        Ok(())
    }

    /// After a request commits, bring every stored cursor up to date.
    ///
    /// Edits move cursors through the type provider (skipped entirely when
    /// the type cannot transform cursors), deletes drop them, creates leave
    /// them alone.
    pub fn update_presence(
        &self,
        type_id: Option<&str>,
        store: &mut PresenceStore,
        request: &Request,
    ) -> Result<()> {
        let Some(sessions) = store.data.as_object_mut() else {
            return Ok(());
        };
        match &request.action {
            Action::Create { .. } => Ok(()),
            Action::Delete => {
                for value in sessions.values_mut() {
                    if let Some(session) = value.as_object_mut() {
                        session.remove(CURSOR_KEY);
                    }
                }
                Ok(())
            }
            Action::Edit { op } => {
                let provider = self.resolve(type_id)?;
                if !provider.supports_cursor() {
                    return Ok(());
                }
                for (sid, value) in sessions.iter_mut() {
                    let Some(cursor) = value.get_mut(CURSOR_KEY) else {
                        continue;
                    };
                    if cursor.is_null() {
                        continue;
                    }
                    let is_own_op = request.src.as_deref() == Some(sid.as_str());
                    *cursor = provider
                        .transform_cursor(cursor, op, is_own_op)
                        .map_err(|err| provider_failure(provider.as_ref(), "transform_cursor", err))?;
                }
                Ok(())
            }
        }
    }
}
