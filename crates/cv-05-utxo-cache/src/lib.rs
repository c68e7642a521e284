//! # CV-05 UTXO Snapshot Cache
//!
//! Most recently fetched unspent-output set per address group, with
//! staleness reporting.
//!
//! **Subsystem ID:** 5
//!
//! ## Invariants
//!
//! - `UtxoSnapshot::count() == utxos().len()`, checked again on every
//!   deserialization and payload import.
//! - A refresh replaces the group's snapshot wholesale; outputs are never
//!   merged in place.
//!
//! ## Module Structure
//!
//! ```text
//! cv-05-utxo-cache/
//! ├── domain/
//! │   ├── snapshot.rs    # UtxoSnapshot + envelope payload form
//! │   └── config.rs      # UtxoCacheConfig
//! └── cache.rs           # UtxoSnapshotCache (LRU over address groups)
//! ```

pub mod cache;
pub mod domain;

pub use cache::{AddressGroup, Staleness, UtxoSnapshotCache};
pub use domain::{UtxoCacheConfig, UtxoSnapshot, UTXO_SNAPSHOT_TAG};
