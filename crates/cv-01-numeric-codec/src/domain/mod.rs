//! # Domain Module
//!
//! Value tree and allowlist used by the codec.

pub mod allowlist;
pub mod value;

pub use allowlist::*;
pub use value::*;
