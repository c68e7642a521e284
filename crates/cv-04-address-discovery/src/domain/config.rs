//! Discovery configuration.

use serde::{Deserialize, Serialize};
use shared_types::{Network, WalletError};
use std::time::Duration;

/// Default targeted probe set: indices wallets most commonly hand out.
pub const DEFAULT_PROBE_INDICES: [u32; 8] = [0, 1, 2, 5, 10, 20, 50, 100];

/// Tunables for the discovery engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Indices checked by a targeted probe, in order.
    pub probe_indices: Vec<u32>,
    /// Consecutive empty addresses that end a range scan.
    pub gap_limit: u32,
    /// Highest index any scan may probe.
    pub max_index: u32,
    /// Range width per continuous-scan round.
    pub batch_size: u32,
    /// Pause between continuous-scan rounds.
    pub batch_delay_ms: u64,
    /// Network balances are looked up on.
    pub network: Network,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            probe_indices: DEFAULT_PROBE_INDICES.to_vec(),
            gap_limit: 20,
            max_index: 10_000,
            batch_size: 20,
            batch_delay_ms: 500,
            network: Network::Mainnet,
        }
    }
}

impl DiscoveryConfig {
    /// No inter-round delay and a low ceiling.
    pub fn for_testing() -> Self {
        Self {
            max_index: 1_000,
            batch_delay_ms: 0,
            network: Network::Regtest,
            ..Default::default()
        }
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), WalletError> {
        if self.gap_limit == 0 {
            return Err(WalletError::InvalidConfig("gap_limit must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(WalletError::InvalidConfig("batch_size must be at least 1".into()));
        }
        if self.probe_indices.is_empty() {
            return Err(WalletError::InvalidConfig("probe_indices must not be empty".into()));
        }
        if let Some(index) = self.probe_indices.iter().find(|i| **i > self.max_index) {
            return Err(WalletError::InvalidConfig(format!(
                "probe index {index} exceeds max_index {}",
                self.max_index
            )));
        }
        Ok(())
    }
}
