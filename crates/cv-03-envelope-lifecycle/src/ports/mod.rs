//! Ports (hexagonal boundaries).

pub mod inbound;
pub mod outbound;

pub use inbound::EnvelopeLifecycleApi;
pub use outbound::{BroadcastService, MockBroadcaster, MockSigner, SignatureMaterial, SigningService};
