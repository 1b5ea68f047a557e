//! Engine configuration.

use serde::{Deserialize, Serialize};

/// What happens to a composite edit when one of its atoms fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditCommitPolicy {
    /// Atoms applied before the failing one stay on the document, and each
    /// atom is visible to the validation hooks as it lands.
    #[default]
    Incremental,
    /// Atoms are applied to a scratch copy; the document only changes when
    /// every atom succeeds.
    Atomic,
}

/// Configuration for [`crate::OtEngine`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub edit_commit: EditCommitPolicy,
    /// Run the structural request checks inside `apply`, so requests that
    /// bypassed `check_request` are still refused.
    pub check_requests_on_apply: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            edit_commit: EditCommitPolicy::Incremental,
            check_requests_on_apply: true,
        }
    }
}

/// Builder for engine configuration.
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    pub fn edit_commit(mut self, policy: EditCommitPolicy) -> Self {
        self.config.edit_commit = policy;
        self
    }

    pub fn check_requests_on_apply(mut self, enabled: bool) -> Self {
        self.config.check_requests_on_apply = enabled;
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
