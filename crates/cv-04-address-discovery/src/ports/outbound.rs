//! Outbound (Driven) ports for address discovery.
//!
//! Key derivation and address encoding live outside this crate. The engine
//! only chooses which indices to derive and interprets balances.

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use shared_types::{
    ChainKind, DerivationPath, DerivedKey, KeyHandle, KeySource, RemoteService, WalletError,
};

/// HD key derivation service - driven port.
#[async_trait]
pub trait KeyDerivationService: Send + Sync {
    /// Derive the address at `path` below `source`.
    async fn derive_address(
        &self,
        source: &KeySource,
        path: &DerivationPath,
    ) -> Result<DerivedKey, WalletError>;
}

// =============================================================================
// Mock Implementation for Testing
// =============================================================================

/// Deterministic derivation: the address is a hash of source, chain and index.
///
/// Seed sources also get a key handle; watch-only sources do not.
#[derive(Default)]
pub struct MockKeyDerivation {
    calls: Mutex<Vec<DerivationPath>>,
    fail_at: Mutex<Option<DerivationPath>>,
}

impl MockKeyDerivation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Address the mock derives for `(source, chain, index)`.
    pub fn address_for(source: &KeySource, chain: ChainKind, index: u32) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.fingerprint().as_bytes());
        hasher.update(chain.chain_index().to_be_bytes());
        hasher.update(index.to_be_bytes());
        format!("mock1{}", hex::encode(&hasher.finalize()[..20]))
    }

    /// Fail derivation of one path.
    pub fn fail_at(&self, chain: ChainKind, index: u32) {
        *self.fail_at.lock() = Some(DerivationPath::new(chain, index));
    }

    /// Every path derived, in call order.
    pub fn calls(&self) -> Vec<DerivationPath> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl KeyDerivationService for MockKeyDerivation {
    async fn derive_address(
        &self,
        source: &KeySource,
        path: &DerivationPath,
    ) -> Result<DerivedKey, WalletError> {
        self.calls.lock().push(*path);
        if *self.fail_at.lock() == Some(*path) {
            return Err(WalletError::remote(
                RemoteService::KeyDerivation,
                format!("Mock derivation failure at {path}"),
            ));
        }

        let key_handle = match source {
            KeySource::Seed(_) => Some(KeyHandle::new(format!("{}/{}", source.fingerprint(), path))),
            KeySource::ExtendedPublicKey(_) => None,
        };
        Ok(DerivedKey {
            address: Self::address_for(source, path.chain, path.index),
            key_handle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_is_deterministic_per_chain() {
        let keys = MockKeyDerivation::new();
        let source = KeySource::ExtendedPublicKey("xpub-test".into());

        let a = keys
            .derive_address(&source, &DerivationPath::new(ChainKind::Receive, 3))
            .await
            .unwrap();
        let b = keys
            .derive_address(&source, &DerivationPath::new(ChainKind::Change, 3))
            .await
            .unwrap();

        assert_eq!(a.address, MockKeyDerivation::address_for(&source, ChainKind::Receive, 3));
        assert_ne!(a.address, b.address);
        assert!(a.key_handle.is_none());
        assert_eq!(keys.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let keys = MockKeyDerivation::new();
        keys.fail_at(ChainKind::Receive, 1);
        let source = KeySource::Seed(vec![7; 32]);
        let err = keys
            .derive_address(&source, &DerivationPath::new(ChainKind::Receive, 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WalletError::RemoteService {
                service: RemoteService::KeyDerivation,
                ..
            }
        ));
    }
}
