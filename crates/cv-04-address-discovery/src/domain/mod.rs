//! Domain layer for address discovery.

pub mod config;
pub mod scan;
pub mod session;

pub use config::*;
pub use scan::*;
pub use session::*;
