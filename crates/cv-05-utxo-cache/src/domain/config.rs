//! Cache configuration.

use serde::{Deserialize, Serialize};
use shared_types::WalletError;

/// Bounds for the snapshot cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoCacheConfig {
    /// Age in seconds after which a snapshot is reported stale.
    pub max_age_secs: u64,
    /// Address groups held before the least recently used is evicted.
    pub max_groups: usize,
}

impl Default for UtxoCacheConfig {
    fn default() -> Self {
        Self {
            max_age_secs: 600,
            max_groups: 32,
        }
    }
}

impl UtxoCacheConfig {
    /// Tiny cache for eviction tests.
    pub fn for_testing() -> Self {
        Self {
            max_age_secs: 60,
            max_groups: 2,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), WalletError> {
        if self.max_groups == 0 {
            return Err(WalletError::InvalidConfig(
                "max_groups must be at least 1".to_string(),
            ));
        }
        if self.max_age_secs == 0 {
            return Err(WalletError::InvalidConfig(
                "max_age_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
