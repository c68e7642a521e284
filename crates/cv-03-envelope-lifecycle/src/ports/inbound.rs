//! Inbound (Driving) port: the lifecycle transitions.

use async_trait::async_trait;
use shared_types::{AddressBook, AddressRegistry, Network, WalletError};

use crate::domain::Envelope;

/// Envelope lifecycle API.
///
/// Each transition returns a new envelope; the input is never modified.
#[async_trait]
pub trait EnvelopeLifecycleApi: Send + Sync {
    /// `Unsigned -> Signed` for transactions and messages.
    ///
    /// # Errors
    ///
    /// - `StateTransition` unless the envelope is unsigned
    /// - `Validation` when no signing key can be resolved
    /// - `RemoteService` when the signer fails
    async fn sign(&self, envelope: &Envelope, book: &AddressBook) -> Result<Envelope, WalletError>;

    /// `Signed -> Submitted` for transactions. Marks input and change
    /// addresses used in `registry`, the live book that next-address
    /// rotation reads.
    ///
    /// # Errors
    ///
    /// - `StateTransition` unless the envelope is a signed transaction
    /// - `RemoteService` when the broadcast fails
    async fn submit(
        &self,
        envelope: &Envelope,
        registry: &dyn AddressRegistry,
        network: Network,
    ) -> Result<Envelope, WalletError>;
}
