//! # Domain Module
//!
//! Snapshot value object and cache configuration.

pub mod config;
pub mod snapshot;

pub use config::*;
pub use snapshot::*;
