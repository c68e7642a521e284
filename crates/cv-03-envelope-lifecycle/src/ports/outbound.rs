//! Outbound (Driven) ports for the envelope lifecycle.
//!
//! Signing happens on the air-gapped device and broadcast on the watching
//! device; this crate only hands them canonical envelopes and reads back
//! the results.

use async_trait::async_trait;
use cv_02_frame_transport::WireEnvelope;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use shared_types::{KeyHandle, Network, RemoteService, WalletError};
use std::collections::BTreeMap;

/// Signatures produced for one envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureMaterial {
    /// One signature per input key.
    pub signatures: Vec<String>,
    /// Canonical serialized signed result (raw transaction or message signature).
    pub signed_payload: String,
}

/// Key-holding signer - driven port.
#[async_trait]
pub trait SigningService: Send + Sync {
    /// Sign `envelope` with the keys mapped from each input address.
    async fn sign(
        &self,
        envelope: &WireEnvelope,
        keys: &BTreeMap<String, KeyHandle>,
    ) -> Result<SignatureMaterial, WalletError>;
}

/// Network submission service - driven port.
#[async_trait]
pub trait BroadcastService: Send + Sync {
    /// Submit a signed envelope; returns the network-assigned identifier.
    async fn broadcast(&self, envelope: &WireEnvelope, network: Network)
        -> Result<String, WalletError>;
}

fn digest_hex(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Deterministic signer. Signatures are hashes of the envelope and key handle.
#[derive(Default)]
pub struct MockSigner {
    requests: Mutex<Vec<BTreeMap<String, KeyHandle>>>,
    fail: Mutex<bool>,
}

impl MockSigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call fail.
    pub fn set_unavailable(&self) {
        *self.fail.lock() = true;
    }

    /// Key maps received, in call order.
    pub fn requests(&self) -> Vec<BTreeMap<String, KeyHandle>> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl SigningService for MockSigner {
    async fn sign(
        &self,
        envelope: &WireEnvelope,
        keys: &BTreeMap<String, KeyHandle>,
    ) -> Result<SignatureMaterial, WalletError> {
        self.requests.lock().push(keys.clone());
        if *self.fail.lock() {
            return Err(WalletError::remote(RemoteService::Signing, "Mock signer unavailable"));
        }

        let canonical = envelope.to_canonical_string();
        let signatures = keys
            .values()
            .map(|handle| digest_hex(&[&canonical, handle.as_str()]))
            .collect::<Vec<_>>();
        let signed_payload = digest_hex(&[&canonical, &signatures.concat()]);
        Ok(SignatureMaterial {
            signatures,
            signed_payload,
        })
    }
}

/// Broadcaster returning the hash of the submitted envelope as its id.
#[derive(Default)]
pub struct MockBroadcaster {
    submitted: Mutex<Vec<(String, Network)>>,
    fail: Mutex<bool>,
}

impl MockBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call fail.
    pub fn set_unavailable(&self) {
        *self.fail.lock() = true;
    }

    /// (type tag, network) of every broadcast.
    pub fn submitted(&self) -> Vec<(String, Network)> {
        self.submitted.lock().clone()
    }
}

#[async_trait]
impl BroadcastService for MockBroadcaster {
    async fn broadcast(
        &self,
        envelope: &WireEnvelope,
        network: Network,
    ) -> Result<String, WalletError> {
        if *self.fail.lock() {
            return Err(WalletError::remote(RemoteService::Broadcast, "Mock node rejected transaction"));
        }
        self.submitted
            .lock()
            .push((envelope.type_tag.clone(), network));
        Ok(digest_hex(&[&envelope.to_canonical_string()]))
    }
}
