//! The type provider contract.
//!
//! A type provider owns the editing semantics of one document type: how a
//! snapshot is created, how an op changes it, and how two concurrent ops are
//! reconciled. The core never inspects snapshots or ops itself; it only
//! routes them through this trait.

use crate::error::ProviderError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tie-break side for [`TypeProvider::transform`].
///
/// `Left` marks the op being rewritten as the one that defers: the other op
/// is treated as having committed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn flip(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Capability object for one document type.
pub trait TypeProvider: Send + Sync {
    /// Short name, e.g. `"json0"`.
    fn name(&self) -> &str;

    /// Canonical URI stored on snapshots.
    fn uri(&self) -> &str;

    /// Build the initial snapshot data.
    fn create(&self, initial: Option<&Value>) -> ProviderResult<Value>;

    /// Apply `op` to `snapshot`, returning the new snapshot data.
    fn apply(&self, snapshot: &Value, op: &Value) -> ProviderResult<Value>;

    /// Rewrite `op` so it applies after `other`.
    fn transform(&self, op: &Value, other: &Value, side: Side) -> ProviderResult<Value>;

    /// Split a composite op into atoms applied one at a time. `None` means
    /// the op is applied as a single atom.
    fn decompose(&self, _op: &Value) -> Option<Vec<Value>> {
        None
    }

    /// Whether [`TypeProvider::transform_cursor`] is implemented.
    fn supports_cursor(&self) -> bool {
        false
    }

    /// Move a cursor across `op`. `is_own_op` is true when the cursor's
    /// session authored the op.
    fn transform_cursor(&self, cursor: &Value, _op: &Value, _is_own_op: bool) -> ProviderResult<Value> {
        Ok(cursor.clone())
    }
}
