//! Request normalization.

use crate::OtEngine;
use otds_core::{Action, Request};
use serde_json::{Map, Value};

impl OtEngine {
    /// Canonicalize a request in place.
    ///
    /// A create's type name is rewritten to the type's canonical URI, and
    /// `m.ts` is stamped with the current time, replacing any earlier stamp.
    pub fn normalize(&self, request: &mut Request) {
        if let Action::Create { type_id, .. } = &mut request.action {
            if let Some(uri) = self.registry().canonical_uri(type_id) {
                if uri != type_id.as_str() {
                    *type_id = uri.to_string();
                }
            }
        }
        let now = self.now();
        request
            .m
            .get_or_insert_with(Map::new)
            .insert("ts".to_string(), Value::from(now));
    }
}
