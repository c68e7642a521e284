//! # CV-01 Numeric Codec
//!
//! Precision-preserving conversion of monetary values across the text
//! interchange boundary (barcodes, files, manual entry).
//!
//! **Subsystem ID:** 1
//! **Architecture:** Domain types + pure codec functions
//!
//! ## Purpose
//!
//! Native amounts are unsigned integers in the indivisible base unit and
//! routinely exceed the range a JSON number survives intact. On the way out
//! every [`PayloadValue::Amount`] is written as a canonical decimal string;
//! on the way in, digit-only strings under an allowlisted key become amounts
//! again.
//!
//! ## Known Limitation
//!
//! A digit-only string stored under an allowlisted key (e.g. a `value` field
//! that is really a label) is decoded as an amount. The allowlist is a
//! naming heuristic; keep non-amount fields off it.
//!
//! ## Module Structure
//!
//! ```text
//! cv-01-numeric-codec/
//! ├── domain/          # PayloadValue tree, FieldAllowlist
//! └── codec.rs         # encode / decode / canonical string helpers
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod domain;

pub use codec::{decode, encode, from_canonical_str, to_canonical_string};
pub use domain::{FieldAllowlist, PayloadRecord, PayloadValue, DEFAULT_AMOUNT_FIELDS};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
