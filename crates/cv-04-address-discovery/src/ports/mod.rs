//! Ports layer for address discovery.

pub mod outbound;

pub use outbound::{KeyDerivationService, MockKeyDerivation};
