//! Follower configuration.

/// Configuration for follower behavior.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    /// Maximum number of events applied by one pull.
    pub max_batch_size: usize,
    /// Summarize an emptied leader as a single `Clear` in the initial
    /// catch-up. When false, every stale replica item gets its own delete.
    pub clear_on_empty: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            clear_on_empty: true,
        }
    }
}

/// Builder for follower configuration.
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SyncConfig::default(),
        }
    }

    /// Values below 1 are raised to 1 so a pull always makes progress.
    pub fn max_batch_size(mut self, size: usize) -> Self {
        self.config.max_batch_size = size.max(1);
        self
    }

    pub fn clear_on_empty(mut self, enabled: bool) -> Self {
        self.config.clear_on_empty = enabled;
        self
    }

    pub fn build(self) -> SyncConfig {
        self.config
    }
}

impl Default for SyncConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
