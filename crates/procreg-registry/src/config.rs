use serde::{Deserialize, Serialize};

/// Tuning for registry batch operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Exported documents between progress signals.
    pub progress_interval: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            progress_interval: 100,
        }
    }
}

impl RegistryConfig {
    #[must_use]
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }
}
