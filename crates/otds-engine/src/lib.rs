//! OTDS Engine - applying and transforming operations
//!
//! This crate holds the consistency core of the document store:
//! - Request validation and normalization
//! - The document applier (create, edit, delete) and its batch form
//! - The transformer that rebases a pending request past a committed one
//! - The presence engine keeping cursors in step with document ops
//!
//! Every entry point mutates caller-owned state in place and reports failure
//! through [`OtError`]. Nothing here locks, blocks or performs I/O; callers
//! must serialize access to any one document.
//!
//! # Catching up a stale request
//!
//! ```text
//! for committed in ops_since(request.v):
//!     engine.transform(doc.type, &mut request, &committed)?   // one op at a time
//! engine.apply(&mut doc, &mut request)?
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use otds_core::{fixtures, Request, Snapshot};
//! use otds_engine::OtEngine;
//!
//! let engine = OtEngine::new(fixtures::registry());
//! let mut doc = Snapshot::new();
//! let mut create = Request::create("json0", Some(serde_json::json!({"a": 1})));
//! engine.normalize(&mut create);
//! engine.apply(&mut doc, &mut create).unwrap();
//! assert_eq!(doc.v, 1);
//! ```

pub mod apply;
pub mod config;
pub mod normalize;
pub mod presence;
pub mod transform;
pub mod validate;

pub use config::{EditCommitPolicy, EngineConfig, EngineConfigBuilder};
pub use otds_core::{OtError, Result};
pub use presence::apply_presence;

use otds_core::{Clock, ProviderError, SystemClock, TypeProvider, TypeRegistry};
use std::fmt;
use std::sync::Arc;

/// Entry point for every core operation.
///
/// Holds the frozen type registry, the clock used for metadata stamps and
/// the engine configuration. Cheap to share behind an `Arc`.
pub struct OtEngine {
    registry: Arc<TypeRegistry>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl OtEngine {
    pub fn new(registry: impl Into<Arc<TypeRegistry>>) -> Self {
        Self {
            registry: registry.into(),
            clock: Arc::new(SystemClock),
            config: EngineConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    pub(crate) fn resolve(&self, type_id: Option<&str>) -> Result<Arc<dyn TypeProvider>> {
        type_id
            .and_then(|id| self.registry.resolve(id))
            .ok_or(OtError::TypeNotFound)
    }
}

impl fmt::Debug for OtEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtEngine")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

/// Log a provider failure and fold it into the common error channel.
pub(crate) fn provider_failure(provider: &dyn TypeProvider, stage: &str, err: ProviderError) -> OtError {
    tracing::warn!(type_name = provider.name(), stage, error = %err, "type provider failed");
    err.into()
}
