//! Rebasing a pending request past an already committed one.
//!
//! Decision order:
//! 1. differing base versions fail;
//! 2. after a committed delete only another delete survives;
//! 3. a create on either side fails;
//! 4. two edits go through the type provider with the pending op on the
//!    `Left` side.
//!
//! A request that is more than one op behind must be transformed once per
//! committed op, in commit order.

use crate::{provider_failure, OtEngine};
use otds_core::{Action, OtError, Request, Result, Side};
use tracing::trace;

impl OtEngine {
    /// Rewrite `request` so it applies after `applied`.
    ///
    /// `type_id` names the document's type; it is only resolved when both
    /// requests are edits. On success a set `request.v` advances by one.
    pub fn transform(&self, type_id: Option<&str>, request: &mut Request, applied: &Request) -> Result<()> {
        if let (Some(v), Some(applied_v)) = (request.v, applied.v) {
            if v != applied_v {
                return Err(OtError::VersionMismatch);
            }
        }

        match (&applied.action, &mut request.action) {
            (Action::Delete, Action::Delete) => {
                trace!("both requests delete");
            }
            (Action::Delete, _) => return Err(OtError::DocumentDeleted),
            (Action::Create { .. }, _) | (_, Action::Create { .. }) => {
                return Err(OtError::DocumentCreatedRemotely)
            }
            (Action::Edit { op: applied_op }, Action::Edit { op }) => {
                let provider = self.resolve(type_id)?;
                let rewritten = provider
                    .transform(op, applied_op, Side::Left)
                    .map_err(|err| provider_failure(provider.as_ref(), "transform", err))?;
                trace!(from = %op, to = %rewritten, "op transformed");
                *op = rewritten;
            }
            (Action::Edit { .. }, Action::Delete) => {}
        }

        if let Some(v) = request.v.as_mut() {
            *v += 1;
        }
        Ok(())
    }
}
