//! Committed operations, as kept in a document's log.

use otds_core::{Action, Content, Request};
use serde_json::{Map, Value};

/// One op as it was committed: already transformed to the head it was
/// applied at, with hooks stripped.
#[derive(Clone, Debug, PartialEq)]
pub struct CommittedOp {
    /// Version the op applied to; the document moved to `v + 1`.
    pub v: u64,
    pub src: Option<String>,
    pub seq: Option<u64>,
    pub action: Action,
    pub m: Option<Map<String, Value>>,
    /// Content removed by a delete.
    pub prev: Option<Content>,
}

impl CommittedOp {
    pub fn from_request(v: u64, request: &Request) -> Self {
        Self {
            v,
            src: request.src.clone(),
            seq: request.seq,
            action: request.action.clone(),
            m: request.m.clone(),
            prev: request.prev.clone(),
        }
    }

    /// The request form used when transforming later submissions.
    pub fn to_request(&self) -> Request {
        let mut request = match &self.action {
            Action::Create { type_id, data } => Request::create(type_id.clone(), data.clone()),
            Action::Edit { op } => Request::edit(op.clone()),
            Action::Delete => Request::delete(),
        }
        .at_version(self.v);
        request.src = self.src.clone();
        request.seq = self.seq;
        request.m = self.m.clone();
        request.prev = self.prev.clone();
        request
    }

    pub fn to_value(&self) -> Value {
        self.to_request().to_value()
    }

    pub fn is_from(&self, src: &str) -> bool {
        self.src.as_deref() == Some(src)
    }
}
