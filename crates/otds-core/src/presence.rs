//! Presence model: per-session ephemeral state kept next to a document.
//!
//! The store maps session ids to arbitrary values. Presence ops address the
//! store root, one session, or one field of a session; a null value deletes
//! the addressed entry.

use crate::error::{OtError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field inside a session's value holding its type-specific cursor.
pub const CURSOR_KEY: &str = "_cursor";

/// Keys under a reserved prefix may only be written if they are the one
/// allowed exception.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReservedKeyRule {
    pub prefix: &'static str,
    pub allowed: &'static str,
}

impl ReservedKeyRule {
    pub const DEFAULT: ReservedKeyRule = ReservedKeyRule {
        prefix: "_",
        allowed: CURSOR_KEY,
    };

    pub fn is_reserved(&self, key: &str) -> bool {
        key.starts_with(self.prefix) && key != self.allowed
    }

    /// Reject a single addressed key.
    pub fn check_key(&self, key: &str) -> Result<()> {
        if self.is_reserved(key) {
            Err(OtError::ReservedValue)
        } else {
            Ok(())
        }
    }

    /// Reject any reserved top-level key of a value being written.
    pub fn check_value(&self, value: &Value) -> Result<()> {
        match value.as_object() {
            Some(obj) => obj.keys().try_for_each(|key| self.check_key(key)),
            None => Ok(()),
        }
    }
}

impl Default for ReservedKeyRule {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Where a presence op writes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresencePath {
    /// The whole store. Unchecked; meant for privileged callers.
    Root,
    /// All of one session's value.
    Session(String),
    /// One field of a session's value.
    Field(String, String),
}

impl PresencePath {
    fn from_value(raw: Option<&Value>) -> Result<Self> {
        let segments = match raw {
            None | Some(Value::Null) => return Ok(PresencePath::Root),
            Some(Value::Array(segments)) => segments,
            Some(_) => return Err(OtError::PathNotArray),
        };
        if segments.len() > 2 {
            return Err(OtError::PathTooDeep);
        }
        let keys = segments
            .iter()
            .map(|segment| segment.as_str().map(str::to_string).ok_or(OtError::NonStringKey))
            .collect::<Result<Vec<_>>>()?;
        let mut keys = keys.into_iter();
        Ok(match (keys.next(), keys.next()) {
            (None, _) => PresencePath::Root,
            (Some(sid), None) => PresencePath::Session(sid),
            (Some(sid), Some(field)) => PresencePath::Field(sid, field),
        })
    }

    fn to_value(&self) -> Value {
        match self {
            PresencePath::Root => Value::Array(Vec::new()),
            PresencePath::Session(sid) => Value::Array(vec![sid.as_str().into()]),
            PresencePath::Field(sid, field) => {
                Value::Array(vec![sid.as_str().into(), field.as_str().into()])
            }
        }
    }
}

/// A set or delete against a presence store.
#[derive(Clone, Debug, PartialEq)]
pub struct PresenceOp {
    pub path: PresencePath,
    /// New value; null deletes.
    pub val: Value,
}

impl PresenceOp {
    pub fn set(path: PresencePath, val: Value) -> Self {
        Self { path, val }
    }

    pub fn remove(path: PresencePath) -> Self {
        Self {
            path,
            val: Value::Null,
        }
    }

    pub fn is_delete(&self) -> bool {
        self.val.is_null()
    }

    /// Parse `{p, val}`.
    pub fn from_value(raw: &Value) -> Result<Self> {
        let obj = raw.as_object().ok_or(OtError::MissingRequest)?;
        Ok(Self {
            path: PresencePath::from_value(obj.get("p"))?,
            val: obj.get("val").cloned().unwrap_or(Value::Null),
        })
    }

    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("p".into(), self.path.to_value());
        obj.insert("val".into(), self.val.clone());
        Value::Object(obj)
    }
}

/// Presence for one document. The store object itself always exists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PresenceStore {
    pub data: Value,
}

impl PresenceStore {
    pub fn new() -> Self {
        Self {
            data: Value::Object(Map::new()),
        }
    }

    pub fn session(&self, sid: &str) -> Option<&Value> {
        self.data.get(sid)
    }

    pub fn cursor(&self, sid: &str) -> Option<&Value> {
        self.session(sid).and_then(|value| value.get(CURSOR_KEY))
    }

    pub fn sessions(&self) -> impl Iterator<Item = (&String, &Value)> + '_ {
        self.data.as_object().into_iter().flat_map(|obj| obj.iter())
    }

    pub fn len(&self) -> usize {
        self.data.as_object().map(Map::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PresenceStore {
    fn default() -> Self {
        Self::new()
    }
}
