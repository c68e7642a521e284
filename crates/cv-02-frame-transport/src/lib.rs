//! # CV-02 Frame Transport
//!
//! Multi-part transport of serialized envelopes across bounded-capacity
//! transfer units (barcode images, files).
//!
//! **Subsystem ID:** 2
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): `WireEnvelope`, `Frame`, `FrameGroup`,
//!   `TransportConfig`
//! - **Transport** (`transport.rs`): stateless `split` / `join`
//! - **Assembler** (`assembler.rs`): incremental, session-scoped join
//!
//! ## Invariants
//!
//! - All frames sharing a `dataId` agree on type, version and `totalParts`.
//! - A join with any part missing returns `IncompleteTransport`, never a
//!   truncated envelope.
//! - Two frames with the same `dataId`/`partIndex` but different chunks fail
//!   closed. Only [`FrameAssembler::correct`] overwrites a held part.
//!
//! ## Usage Example
//!
//! ```ignore
//! use cv_02_frame_transport::{join, split, WireEnvelope};
//!
//! let frames = split(&envelope, 1200)?;
//! let wire: Vec<String> = frames.iter().map(|f| f.to_wire()).collect();
//! // ... physical transfer ...
//! let restored = join(&frames)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assembler;
pub mod domain;
pub mod transport;

pub use assembler::{FrameAssembler, FrameProgress, PendingTransport};
pub use domain::{
    Frame, FrameGroup, PartOutcome, TransportConfig, WireEnvelope, FRAME_HEADER_OVERHEAD,
    MULTIPART_SUFFIX,
};
pub use transport::{join, join_with, split};
