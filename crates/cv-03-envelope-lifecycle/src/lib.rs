//! # CV-03 Envelope Lifecycle
//!
//! Classifies imported payloads and enforces one-directional transitions.
//!
//! **Subsystem ID:** 3
//!
//! ## State Machine
//!
//! ```text
//! Transactions:  [Unsigned] --sign--> [Signed] --submit--> [Submitted]
//! Messages:      [Unsigned] --sign--> [Signed]
//! Snapshots:     [UtxoSnapshot]                 (no lifecycle)
//! ```
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): `EnvelopeKind`, ordered classification
//!   rules, `Envelope`, `ImportSession`
//! - **Ports Layer** (`ports/`): `EnvelopeLifecycleApi` (driving),
//!   `SigningService` / `BroadcastService` (driven, with mocks)
//! - **Service Layer** (`service.rs`): `EnvelopeService`
//!
//! ## Invariants
//!
//! - An envelope's classification is never mutated; transitions return a new
//!   envelope classified by `ClassificationRule::Transition`.
//! - Importing into a session slot discards the previous occupant.

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{
    classify, Classification, ClassificationRule, Envelope, EnvelopeKind, Evidence, Family,
    ImportProgress, ImportSession, Stage, DEFAULT_ENVELOPE_VERSION, RULES,
};
pub use ports::{
    BroadcastService, EnvelopeLifecycleApi, MockBroadcaster, MockSigner, SignatureMaterial,
    SigningService,
};
pub use service::{change_output_addresses, input_addresses, resolve_signing_keys, EnvelopeService};
