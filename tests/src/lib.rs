//! # Cold-Vault Test Suite
//!
//! Cross-subsystem scenarios. Unit tests live next to the code in each
//! crate; this crate only wires subsystems together.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── transport_flows.rs   # split/join, import slot, snapshots over the air gap
//!     └── wallet_flows.rs      # discovery feeding the sign/submit lifecycle
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p cv-tests
//! cargo test -p cv-tests integration::wallet_flows
//! ```

pub mod integration;
