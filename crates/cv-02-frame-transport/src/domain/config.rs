//! Transport configuration.

use serde::{Deserialize, Serialize};
use shared_types::WalletError;

use super::FRAME_HEADER_OVERHEAD;

/// Frame sizing for a physical transport.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Upper bound on one frame's wire text, header included.
    pub max_frame_bytes: usize,
    /// Version stamped on outgoing envelopes.
    pub envelope_version: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: 1200, // dense barcode at medium error correction
            envelope_version: 1,
        }
    }
}

impl TransportConfig {
    /// Small frames so tests exercise multi-part paths.
    pub fn for_testing() -> Self {
        Self {
            max_frame_bytes: FRAME_HEADER_OVERHEAD + 64,
            envelope_version: 1,
        }
    }

    /// Escaped chunk bytes available per frame for the built-in tags.
    pub fn chunk_capacity(&self) -> usize {
        self.max_frame_bytes.saturating_sub(FRAME_HEADER_OVERHEAD)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), WalletError> {
        if self.max_frame_bytes <= FRAME_HEADER_OVERHEAD {
            return Err(WalletError::InvalidConfig(format!(
                "max_frame_bytes must exceed the {FRAME_HEADER_OVERHEAD}-byte frame header"
            )));
        }
        if self.envelope_version == 0 {
            return Err(WalletError::InvalidConfig(
                "envelope_version must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
