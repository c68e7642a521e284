//! # Domain Module
//!
//! Envelope kinds, the classification rule table, the classified envelope
//! and the import slot.

pub mod classification;
pub mod envelope;
pub mod kind;
pub mod session;

pub use classification::{classify, Classification, ClassificationRule, Evidence, RULES};
pub use envelope::{Envelope, DEFAULT_ENVELOPE_VERSION};
pub use kind::{EnvelopeKind, Family, Stage};
pub use session::{ImportProgress, ImportSession};
