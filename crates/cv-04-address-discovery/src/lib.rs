//! # CV-04 Address Discovery
//!
//! Finds which addresses of an HD wallet hold funds without scanning an
//! unbounded index space.
//!
//! **Subsystem ID:** 4
//!
//! ## Scan Modes
//!
//! | Mode | Indices probed | Stops when |
//! |------|----------------|------------|
//! | Targeted | The probe set `{0,1,2,5,10,20,50,100}` (or any list) | List exhausted |
//! | Range | `start, start+1, ...` | `gap_limit` empties in a row, or `max_index` |
//! | Continuous | Rounds of `batch_size` from `start` | A round finds funds, cancel, or ceiling |
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): `DiscoveryConfig`, `DiscoverySession`,
//!   `ScanResult`, scan events
//! - **Ports Layer** (`ports/`): `KeyDerivationService` (driven, with mock);
//!   balances come from `shared_types::BalanceLookup`
//! - **Engine** (`engine.rs`): `DiscoveryEngine` and its event streams
//!
//! ## Invariants
//!
//! - One scan per session at a time (`ScanInProgress` otherwise).
//! - Cancellation takes effect between continuous-scan rounds only.
//! - Recorded chains stay dense: skipped lower indices are derived first.
//! - "First funded" means lowest index.

pub mod domain;
pub mod engine;
pub mod ports;

pub use domain::{
    BatchEvent, CancelHandle, ContinuousOutcome, ContinuousStatus, DiscoveryConfig,
    DiscoverySession, ScanEvent, ScanGuard, ScanProgress, ScanRange, ScanResult, Termination,
    DEFAULT_PROBE_INDICES,
};
pub use engine::{collect_batches, collect_scan, BatchStream, DiscoveryEngine, ScanStream};
pub use ports::{KeyDerivationService, MockKeyDerivation};
