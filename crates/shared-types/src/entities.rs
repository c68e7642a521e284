//! # Core Domain Entities
//!
//! Wallet-side entities exchanged between the discovery engine, the envelope
//! lifecycle and the UTXO cache.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::errors::WalletError;

// Re-export U256 from primitive-types for use across all subsystems
pub use primitive_types::U256;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Current unix time in seconds.
pub fn unix_now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

// =============================================================================
// NETWORK & DERIVATION
// =============================================================================

/// Network a wallet operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Production network.
    #[default]
    Mainnet,
    /// Public test network.
    Testnet,
    /// Local regression-test network.
    Regtest,
}

impl Network {
    /// Lowercase network tag used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "regtest" => Ok(Network::Regtest),
            other => Err(WalletError::validation(format!("unknown network tag {other:?}"))),
        }
    }
}

/// HD chain an address belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainKind {
    /// External chain (addresses handed out to payers).
    Receive,
    /// Internal chain (change outputs).
    Change,
}

impl ChainKind {
    /// BIP32 chain component (0 = external, 1 = internal).
    pub fn chain_index(&self) -> u32 {
        match self {
            ChainKind::Receive => 0,
            ChainKind::Change => 1,
        }
    }
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainKind::Receive => f.write_str("receive"),
            ChainKind::Change => f.write_str("change"),
        }
    }
}

/// Path of an address relative to the account key: `m/<chain>/<index>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DerivationPath {
    /// Chain component.
    pub chain: ChainKind,
    /// Address index within the chain.
    pub index: u32,
}

impl DerivationPath {
    /// Create a new relative derivation path.
    pub fn new(chain: ChainKind, index: u32) -> Self {
        Self { chain, index }
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m/{}/{}", self.chain.chain_index(), self.index)
    }
}

/// Opaque reference to signing key material held by the key service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyHandle(String);

impl KeyHandle {
    /// Wrap a handle issued by the key service.
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// Handle that lets the signing device re-derive the key from its path.
    pub fn for_path(path: &DerivationPath) -> Self {
        Self(format!("path:{path}"))
    }

    /// Raw handle string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Root a wallet's addresses are derived from.
#[derive(Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Extended public key (watch-only derivation).
    ExtendedPublicKey(String),
    /// Raw seed bytes (signing device only).
    Seed(Vec<u8>),
}

impl KeySource {
    /// Short, non-secret identifier of the source for logs.
    pub fn fingerprint(&self) -> String {
        let digest = match self {
            KeySource::ExtendedPublicKey(xpub) => Sha256::digest(xpub.as_bytes()),
            KeySource::Seed(seed) => Sha256::digest(seed),
        };
        hex::encode(&digest[..4])
    }

    /// True if the source can only derive public keys.
    pub fn is_watch_only(&self) -> bool {
        matches!(self, KeySource::ExtendedPublicKey(_))
    }
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::ExtendedPublicKey(_) => {
                write!(f, "ExtendedPublicKey({})", self.fingerprint())
            }
            KeySource::Seed(_) => write!(f, "Seed(<redacted {}>)", self.fingerprint()),
        }
    }
}

/// Output of a single derivation by the key service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedKey {
    /// Encoded address string.
    pub address: String,
    /// Handle for signing with this key, if the service issues one.
    pub key_handle: Option<KeyHandle>,
}

// =============================================================================
// ADDRESSES & OUTPUTS
// =============================================================================

/// An address the wallet knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedAddress {
    /// Index within its chain.
    pub index: u32,
    /// Receive or change chain.
    pub chain: ChainKind,
    /// Encoded address.
    pub address: String,
    /// Last known balance in base units.
    pub balance: U256,
    /// Whether the address has ever appeared in a transaction.
    pub used: bool,
    /// Signing key handle, when known.
    pub key_handle: Option<KeyHandle>,
}

impl DerivedAddress {
    /// Create an address entry with zero balance.
    pub fn new(chain: ChainKind, index: u32, key: DerivedKey) -> Self {
        Self {
            index,
            chain,
            address: key.address,
            balance: U256::zero(),
            used: false,
            key_handle: key.key_handle,
        }
    }

    /// Relative derivation path of this address.
    pub fn path(&self) -> DerivationPath {
        DerivationPath::new(self.chain, self.index)
    }

    /// Key handle to hand to the signer, falling back to the derivation path.
    pub fn signing_handle(&self) -> KeyHandle {
        self.key_handle
            .clone()
            .unwrap_or_else(|| KeyHandle::for_path(&self.path()))
    }

    /// True if the address carries a nonzero balance.
    pub fn is_funded(&self) -> bool {
        !self.balance.is_zero()
    }
}

/// An unspent output reported by the balance lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    /// Funding transaction id.
    pub txid: String,
    /// Output index within the funding transaction.
    pub vout: u32,
    /// Address owning the output.
    pub address: String,
    /// Value in base units.
    pub value: U256,
    /// Confirmations at lookup time.
    pub confirmations: u32,
}
