//! Request validation.
//!
//! [`OtEngine::check_request`] is a pre-filter over the wire form: anything
//! it refuses, [`OtEngine::apply`] refuses as well.

use crate::OtEngine;
use otds_core::{Action, OtError, Request, Result};
use serde_json::Value;

impl OtEngine {
    /// Check a wire-form request without touching any state.
    pub fn check_request(&self, raw: &Value) -> Result<()> {
        self.parse_request(raw).map(|_| ())
    }

    /// Check a wire-form request and build its typed form.
    pub fn parse_request(&self, raw: &Value) -> Result<Request> {
        let request = Request::from_value(raw)?;
        self.check_typed(&request)?;
        Ok(request)
    }

    /// The checks that still apply once a request is typed: the create type
    /// must resolve, and `src`/`seq` must be set together.
    pub fn check_typed(&self, request: &Request) -> Result<()> {
        if let Action::Create { type_id, .. } = &request.action {
            if type_id.is_empty() {
                return Err(OtError::MissingCreateType);
            }
            if !self.registry().contains(type_id) {
                return Err(OtError::UnknownType);
            }
        }
        check_fields(request)
    }
}

/// Field checks run by `apply` itself. Type resolution is left to the
/// applier, which reports its own error for an unknown type.
pub(crate) fn check_fields(request: &Request) -> Result<()> {
    if let Action::Create { type_id, .. } = &request.action {
        if type_id.is_empty() {
            return Err(OtError::MissingCreateType);
        }
    }
    if request.src.is_some() != request.seq.is_some() {
        return Err(OtError::SeqWithoutSrc);
    }
    Ok(())
}
