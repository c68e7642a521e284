//! # Error Types
//!
//! The wallet error taxonomy shared by all subsystems.
//!
//! Transport and classification errors are raised at the import boundary;
//! discovery returns "found nothing" as a result value, so only structural
//! failures (ceiling, concurrent run, remote faults) appear here.

use std::fmt;
use thiserror::Error;

/// Remote collaborator that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteService {
    /// Key derivation service.
    KeyDerivation,
    /// Transaction/message signing service.
    Signing,
    /// Balance and UTXO lookup service.
    BalanceLookup,
    /// Network submission service.
    Broadcast,
}

impl fmt::Display for RemoteService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemoteService::KeyDerivation => "key-derivation",
            RemoteService::Signing => "signing",
            RemoteService::BalanceLookup => "balance-lookup",
            RemoteService::Broadcast => "broadcast",
        };
        f.write_str(name)
    }
}

/// Errors returned across the Cold-Vault subsystems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    /// Unclassifiable or internally inconsistent envelope/frame metadata.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Join attempted before all parts were collected.
    #[error("Incomplete transport for {data_id}: missing parts {missing:?} of {total}")]
    IncompleteTransport {
        /// Shared identifier of the frame group.
        data_id: String,
        /// 1-based part indices not yet received.
        missing: Vec<u32>,
        /// Total parts announced by the frames.
        total: u32,
    },

    /// Transition requested from the wrong state.
    #[error("Invalid state transition: cannot {attempted} a {from} envelope")]
    StateTransition {
        /// Type tag of the envelope the transition was applied to.
        from: String,
        /// Name of the attempted transition.
        attempted: String,
    },

    /// Scan ceiling reached before the gap-limit rule was satisfied.
    #[error(
        "Discovery exhausted: ceiling {ceiling} reached (run started at {first_index}, last scanned {last_scanned:?})"
    )]
    DiscoveryExhausted {
        /// First index of the run.
        first_index: u32,
        /// Highest index probed, if any.
        last_scanned: Option<u32>,
        /// Configured hard index ceiling.
        ceiling: u32,
    },

    /// Failure reported by a remote collaborator. Never retried automatically.
    #[error("Remote service {service} failed: {message}")]
    RemoteService {
        /// Which collaborator failed.
        service: RemoteService,
        /// Collaborator-provided detail.
        message: String,
    },

    /// A discovery run is already active on this session.
    #[error("A discovery scan is already active for this session")]
    ScanInProgress,

    /// Configuration rejected by validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl WalletError {
    /// Shorthand for [`WalletError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        WalletError::Validation(message.into())
    }

    /// Shorthand for [`WalletError::RemoteService`].
    pub fn remote(service: RemoteService, message: impl Into<String>) -> Self {
        WalletError::RemoteService {
            service,
            message: message.into(),
        }
    }

    /// True for errors the user resolves by rescanning or reselecting input.
    pub fn is_retryable_by_user(&self) -> bool {
        matches!(
            self,
            WalletError::Validation(_)
                | WalletError::IncompleteTransport { .. }
                | WalletError::DiscoveryExhausted { .. }
        )
    }
}
