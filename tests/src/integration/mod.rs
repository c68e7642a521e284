//! Cross-subsystem integration scenarios.

pub mod transport_flows;
pub mod wallet_flows;
