//! # Domain Module
//!
//! Frames, the wire envelope they carry, and per-group part bookkeeping.

pub mod config;
pub mod envelope;
pub mod frame;
pub mod group;

pub use config::*;
pub use envelope::*;
pub use frame::*;
pub use group::*;
