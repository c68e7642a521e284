//! # Shared Types Crate
//!
//! Domain entities shared by every Cold-Vault subsystem.
//!
//! ## Contents
//!
//! - **Entities**: `Network`, `ChainKind`, `DerivationPath`, `KeySource`,
//!   `KeyHandle`, `DerivedAddress`, `Utxo`
//! - **Address book**: the dense per-chain table of known addresses and the
//!   `AddressRegistry` seam that writes `used` flags into the live copy
//! - **Errors**: the `WalletError` taxonomy returned across crate boundaries
//! - **Collaborators**: the balance/UTXO lookup port and its in-memory mock
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: cross-subsystem types are defined here.
//! - **Ownership of math stays outside**: nothing in this crate derives keys
//!   or encodes addresses; those are external collaborators.

pub mod address_book;
pub mod collaborators;
pub mod entities;
pub mod errors;

pub use address_book::{AddressBook, AddressRegistry};
pub use collaborators::{BalanceLookup, BalanceReport, MockBalanceOracle};
pub use entities::*;
pub use errors::*;
