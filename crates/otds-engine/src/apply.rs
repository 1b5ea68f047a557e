//! The document applier.
//!
//! ```text
//!   (absent) --create--> (exists) --edit--> (exists)
//!       ^                    |
//!       +------delete--------+
//! ```
//!
//! Every successful transition bumps `v` by one. Version and state conflicts
//! are detected before anything changes. The `validate` hook runs after the
//! create or delete has landed, so its rejection is reported but does not
//! undo the change.

use crate::config::EditCommitPolicy;
use crate::validate::check_fields;
use crate::{provider_failure, OtEngine};
use otds_core::{Action, Content, Metadata, OtError, Request, Result, Snapshot, TypeProvider};
use serde_json::Value;
use tracing::{debug, trace};

impl OtEngine {
    /// Apply one request to a document in place.
    pub fn apply(&self, snapshot: &mut Snapshot, request: &mut Request) -> Result<()> {
        if let Some(v) = request.v {
            if v != snapshot.v {
                return Err(OtError::VersionMismatch);
            }
        }
        if self.config().check_requests_on_apply {
            check_fields(request)?;
        }

        if let Action::Create { type_id, data } = &request.action {
            return self.apply_create(snapshot, request, type_id, data.as_ref());
        }
        if request.is_delete() {
            return self.apply_delete(snapshot, request);
        }
        self.apply_edit(snapshot, request)
    }

    /// Apply requests in order, stopping at the first failure. Requests
    /// applied before the failing one stay applied.
    pub fn apply_all(&self, snapshot: &mut Snapshot, requests: &mut [Request]) -> Result<()> {
        for (index, request) in requests.iter_mut().enumerate() {
            if let Err(err) = self.apply(snapshot, request) {
                debug!(index, error = %err, "batch stopped");
                return Err(err);
            }
        }
        Ok(())
    }

    fn apply_create(
        &self,
        snapshot: &mut Snapshot,
        request: &Request,
        type_id: &str,
        data: Option<&Value>,
    ) -> Result<()> {
        if snapshot.exists() {
            return Err(OtError::DocumentExists);
        }
        let provider = self.resolve(Some(type_id))?;
        request.run_pre_validate(snapshot)?;

        let data = provider
            .create(data)
            .map_err(|err| provider_failure(provider.as_ref(), "create", err))?;
        snapshot.content = Some(Content::new(provider.uri(), data));
        snapshot.v += 1;
        let now = self.now();
        let meta = snapshot.m.get_or_insert_with(Metadata::default);
        meta.ctime = Some(now);
        meta.mtime = Some(now);
        debug!(v = snapshot.v, type_uri = provider.uri(), "document created");

        request.run_validate(snapshot)
    }

    fn apply_delete(&self, snapshot: &mut Snapshot, request: &mut Request) -> Result<()> {
        request.run_pre_validate(snapshot)?;

        request.prev = snapshot.content.take();
        // A deleted document keeps no timestamps.
        snapshot.m = None;
        snapshot.v += 1;
        debug!(v = snapshot.v, "document deleted");

        request.run_validate(snapshot)
    }

    fn apply_edit(&self, snapshot: &mut Snapshot, request: &mut Request) -> Result<()> {
        let provider = self.resolve(Some(
            snapshot.type_uri().ok_or(OtError::DocumentMissing)?,
        ))?;

        let mut guard = OpRestore::take(request).ok_or(OtError::MissingAction)?;
        let atoms = provider
            .decompose(guard.original())
            .unwrap_or_else(|| vec![guard.original().clone()]);

        match self.config().edit_commit {
            EditCommitPolicy::Incremental => {
                apply_atoms(provider.as_ref(), snapshot, &mut guard, atoms)?;
            }
            EditCommitPolicy::Atomic => {
                let mut scratch = snapshot.clone();
                apply_atoms(provider.as_ref(), &mut scratch, &mut guard, atoms)?;
                snapshot.content = scratch.content;
            }
        }
        drop(guard);

        snapshot.m.get_or_insert_with(Metadata::default).mtime = Some(self.now());
        snapshot.v += 1;
        debug!(v = snapshot.v, "edit applied");
        Ok(())
    }
}

/// Run each atom through the hooks and the provider, in order.
fn apply_atoms(
    provider: &dyn TypeProvider,
    target: &mut Snapshot,
    guard: &mut OpRestore<'_>,
    atoms: Vec<Value>,
) -> Result<()> {
    let count = atoms.len();
    for (index, atom) in atoms.into_iter().enumerate() {
        guard.install(atom);
        let request = guard.request();
        request.run_pre_validate(target)?;

        let content = target.content.as_mut().ok_or(OtError::DocumentMissing)?;
        let atom = request.op().ok_or(OtError::MissingAction)?;
        content.data = provider
            .apply(&content.data, atom)
            .map_err(|err| provider_failure(provider, "apply", err))?;
        trace!(index, count, "atom applied");

        request.run_validate(target)?;
    }
    Ok(())
}

/// Holds a request's composite op while its atoms are swapped in, and puts
/// it back when dropped, whichever way the edit exits.
struct OpRestore<'a> {
    request: &'a mut Request,
    original: Option<Value>,
}

impl<'a> OpRestore<'a> {
    fn take(request: &'a mut Request) -> Option<Self> {
        let original = match &mut request.action {
            Action::Edit { op } => std::mem::take(op),
            _ => return None,
        };
        Some(Self {
            request,
            original: Some(original),
        })
    }

    fn original(&self) -> &Value {
        self.original.as_ref().unwrap_or(&Value::Null)
    }

    fn install(&mut self, atom: Value) {
        if let Action::Edit { op } = &mut self.request.action {
            *op = atom;
        }
    }

    fn request(&self) -> &Request {
        &*self.request
    }
}

impl Drop for OpRestore<'_> {
    fn drop(&mut self) {
        if let (Some(original), Action::Edit { op }) =
            (self.original.take(), &mut self.request.action)
        {
            *op = original;
        }
    }
}
