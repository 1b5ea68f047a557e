//! Operation requests.
//!
//! A request carries exactly one action (create, edit or delete) plus the
//! optional submission fields `v`, `src`, `seq` and `m`. Requests arrive in
//! the wire shape `{create:{type,data}} | {op} | {del:true}`;
//! [`Request::from_value`] checks that shape and builds the typed form.

use crate::error::{OtError, Result};
use crate::snapshot::{Content, Snapshot};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Caller-supplied validation hook. Returning `Err` rejects the request with
/// the given message.
pub type Hook = Arc<dyn Fn(&Request, &Snapshot) -> std::result::Result<(), String> + Send + Sync>;

/// The action a request performs on a document.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Create the document with a type and optional initial data.
    Create { type_id: String, data: Option<Value> },
    /// Apply a type-specific op to an existing document.
    Edit { op: Value },
    /// Remove the document.
    Delete,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Create { .. } => "create",
            Action::Edit { .. } => "edit",
            Action::Delete => "delete",
        }
    }
}

/// An operation request submitted against a document.
#[derive(Clone)]
pub struct Request {
    pub action: Action,
    /// Version of the document the request was authored against.
    pub v: Option<u64>,
    /// Submitting session.
    pub src: Option<String>,
    /// Per-session sequence number; set together with `src`.
    pub seq: Option<u64>,
    /// Free-form metadata; `m.ts` is stamped on normalization.
    pub m: Option<Map<String, Value>>,
    /// Content removed by a delete, filled in when the delete is applied.
    pub prev: Option<Content>,
    pub pre_validate: Option<Hook>,
    pub validate: Option<Hook>,
}

impl Request {
    fn with_action(action: Action) -> Self {
        Self {
            action,
            v: None,
            src: None,
            seq: None,
            m: None,
            prev: None,
            pre_validate: None,
            validate: None,
        }
    }

    pub fn create(type_id: impl Into<String>, data: Option<Value>) -> Self {
        Self::with_action(Action::Create {
            type_id: type_id.into(),
            data,
        })
    }

    pub fn edit(op: Value) -> Self {
        Self::with_action(Action::Edit { op })
    }

    pub fn delete() -> Self {
        Self::with_action(Action::Delete)
    }

    pub fn at_version(mut self, v: u64) -> Self {
        self.v = Some(v);
        self
    }

    pub fn from_session(mut self, src: impl Into<String>, seq: u64) -> Self {
        self.src = Some(src.into());
        self.seq = Some(seq);
        self
    }

    pub fn with_meta(mut self, m: Map<String, Value>) -> Self {
        self.m = Some(m);
        self
    }

    pub fn with_pre_validate<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Request, &Snapshot) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.pre_validate = Some(Arc::new(hook));
        self
    }

    pub fn with_validate<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Request, &Snapshot) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(hook));
        self
    }

    pub fn is_create(&self) -> bool {
        matches!(self.action, Action::Create { .. })
    }

    pub fn is_edit(&self) -> bool {
        matches!(self.action, Action::Edit { .. })
    }

    pub fn is_delete(&self) -> bool {
        matches!(self.action, Action::Delete)
    }

    /// The edit payload, if this is an edit.
    pub fn op(&self) -> Option<&Value> {
        match &self.action {
            Action::Edit { op } => Some(op),
            _ => None,
        }
    }

    /// Run the `preValidate` hook, if any.
    pub fn run_pre_validate(&self, snapshot: &Snapshot) -> Result<()> {
        match &self.pre_validate {
            Some(hook) => hook(self, snapshot).map_err(OtError::Rejected),
            None => Ok(()),
        }
    }

    /// Run the `validate` hook, if any.
    pub fn run_validate(&self, snapshot: &Snapshot) -> Result<()> {
        match &self.validate {
            Some(hook) => hook(self, snapshot).map_err(OtError::Rejected),
            None => Ok(()),
        }
    }

    /// Copy of this request without its hooks, as recorded in an op log.
    pub fn detached(&self) -> Self {
        Self {
            pre_validate: None,
            validate: None,
            ..self.clone()
        }
    }

    /// Parse the wire form, rejecting structurally unsound requests.
    ///
    /// Type names are not resolved here; that needs a registry.
    pub fn from_value(raw: &Value) -> Result<Self> {
        let obj = raw.as_object().ok_or(OtError::MissingRequest)?;

        let action = if let Some(create) = present(obj, "create") {
            let create = create.as_object().ok_or(OtError::MissingAction)?;
            let type_id = create
                .get("type")
                .and_then(Value::as_str)
                .ok_or(OtError::MissingCreateType)?;
            Action::Create {
                type_id: type_id.to_string(),
                data: present(create, "data").cloned(),
            }
        } else if let Some(del) = present(obj, "del") {
            if del != &Value::Bool(true) {
                return Err(OtError::InvalidDelete);
            }
            Action::Delete
        } else if let Some(op) = present(obj, "op") {
            Action::Edit { op: op.clone() }
        } else {
            return Err(OtError::MissingAction);
        };

        let src = match present(obj, "src") {
            Some(src) => Some(src.as_str().ok_or(OtError::InvalidSrc)?.to_string()),
            None => None,
        };
        let seq = match present(obj, "seq") {
            Some(seq) => Some(seq.as_u64().ok_or(OtError::InvalidSeq)?),
            None => None,
        };
        if src.is_some() != seq.is_some() {
            return Err(OtError::SeqWithoutSrc);
        }
        let m = match present(obj, "m") {
            Some(m) => Some(m.as_object().ok_or(OtError::InvalidMetadata)?.clone()),
            None => None,
        };
        let v = match present(obj, "v") {
            Some(v) => Some(v.as_u64().ok_or(OtError::InvalidVersion)?),
            None => None,
        };
        let prev = match present(obj, "prev") {
            Some(prev) => {
                Some(serde_json::from_value(prev.clone()).map_err(|_| OtError::InvalidPrev)?)
            }
            None => None,
        };

        Ok(Self {
            action,
            v,
            src,
            seq,
            m,
            prev,
            pre_validate: None,
            validate: None,
        })
    }

    /// Emit the wire form.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        match &self.action {
            Action::Create { type_id, data } => {
                let mut create = Map::new();
                create.insert("type".into(), Value::String(type_id.clone()));
                if let Some(data) = data {
                    create.insert("data".into(), data.clone());
                }
                obj.insert("create".into(), Value::Object(create));
            }
            Action::Edit { op } => {
                obj.insert("op".into(), op.clone());
            }
            Action::Delete => {
                obj.insert("del".into(), Value::Bool(true));
            }
        }
        if let Some(v) = self.v {
            obj.insert("v".into(), v.into());
        }
        if let Some(src) = &self.src {
            obj.insert("src".into(), Value::String(src.clone()));
        }
        if let Some(seq) = self.seq {
            obj.insert("seq".into(), seq.into());
        }
        if let Some(m) = &self.m {
            obj.insert("m".into(), Value::Object(m.clone()));
        }
        if let Some(prev) = &self.prev {
            if let Ok(prev) = serde_json::to_value(prev) {
                obj.insert("prev".into(), prev);
            }
        }
        Value::Object(obj)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("action", &self.action)
            .field("v", &self.v)
            .field("src", &self.src)
            .field("seq", &self.seq)
            .field("m", &self.m)
            .field("prev", &self.prev)
            .field("pre_validate", &self.pre_validate.is_some())
            .field("validate", &self.validate.is_some())
            .finish()
    }
}

/// A field counts as present when it is set to anything but null.
fn present<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|value| !value.is_null())
}
