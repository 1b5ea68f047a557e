//! Store configuration.

use serde::{Deserialize, Serialize};

/// Configuration for [`crate::DocumentStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// How many committed ops a submission may be behind the head.
    pub max_op_lag: u64,
    /// Move stored cursors after every committed op.
    pub track_presence: bool,
    /// Refuse a `(src, seq)` pair at or below the last one committed.
    pub reject_duplicate_submits: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_op_lag: 1000,
            track_presence: true,
            reject_duplicate_submits: true,
        }
    }
}

/// Builder for store configuration.
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: StoreConfig::default(),
        }
    }

    pub fn max_op_lag(mut self, lag: u64) -> Self {
        self.config.max_op_lag = lag;
        self
    }

    pub fn track_presence(mut self, enabled: bool) -> Self {
        self.config.track_presence = enabled;
        self
    }

    pub fn reject_duplicate_submits(mut self, enabled: bool) -> Self {
        self.config.reject_duplicate_submits = enabled;
        self
    }

    pub fn build(self) -> StoreConfig {
        self.config
    }
}

impl Default for StoreConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
