//! # Import Session
//!
//! One envelope slot plus the partial frame state of the current import.
//! Importing always replaces the slot; envelopes never merge.

use cv_01_numeric_codec::FieldAllowlist;
use cv_02_frame_transport::{Frame, FrameAssembler, FrameProgress, PendingTransport, WireEnvelope};
use shared_types::WalletError;
use tracing::{info, warn};

use super::Envelope;

/// Result of feeding one frame to the session.
#[derive(Clone, Debug, PartialEq)]
pub enum ImportProgress {
    /// A complete envelope now occupies the slot.
    Imported(Envelope),
    /// More frames are needed.
    Pending(PendingTransport),
    /// Frame was already held.
    Duplicate,
}

/// Import slot for one wallet session.
#[derive(Debug, Default)]
pub struct ImportSession {
    slot: Option<Envelope>,
    assembler: FrameAssembler,
    allowlist: FieldAllowlist,
}

impl ImportSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session decoding amounts with a custom allowlist.
    pub fn with_allowlist(allowlist: FieldAllowlist) -> Self {
        Self {
            slot: None,
            assembler: FrameAssembler::with_allowlist(allowlist.clone()),
            allowlist,
        }
    }

    /// Feed one scanned frame.
    ///
    /// The joined envelope is classified before its frames are released, so
    /// an unclassifiable set stays held (see [`ImportSession::pending`]) and a
    /// misread part can still go through [`ImportSession::correct_frame`].
    pub fn import_frame(&mut self, frame: Frame) -> Result<ImportProgress, WalletError> {
        let mut classified = None;
        let progress = self
            .assembler
            .accept_with(frame, |wire| classify_into(&mut classified, wire))?;
        self.apply(progress, classified)
    }

    /// Parse a frame from its wire text and feed it.
    pub fn import_frame_text(&mut self, text: &str) -> Result<ImportProgress, WalletError> {
        self.import_frame(Frame::from_wire(text)?)
    }

    /// Re-scan of a part the operator confirmed was misread.
    pub fn correct_frame(&mut self, frame: Frame) -> Result<ImportProgress, WalletError> {
        let mut classified = None;
        let progress = self
            .assembler
            .correct_with(frame, |wire| classify_into(&mut classified, wire))?;
        self.apply(progress, classified)
    }

    /// Import from file contents or manual entry.
    pub fn import_text(&mut self, text: &str) -> Result<&Envelope, WalletError> {
        let envelope = Envelope::import(text, &self.allowlist)?;
        Ok(self.place(envelope))
    }

    fn apply(
        &mut self,
        progress: FrameProgress,
        classified: Option<Envelope>,
    ) -> Result<ImportProgress, WalletError> {
        match progress {
            FrameProgress::Complete(wire) => {
                let envelope = match classified {
                    Some(envelope) => envelope,
                    None => Envelope::classify(wire)?,
                };
                Ok(ImportProgress::Imported(self.place(envelope).clone()))
            }
            FrameProgress::Pending(pending) => Ok(ImportProgress::Pending(pending)),
            FrameProgress::Duplicate => Ok(ImportProgress::Duplicate),
        }
    }

    /// Put an envelope in the slot, discarding any previous occupant.
    pub fn place(&mut self, envelope: Envelope) -> &Envelope {
        if let Some(previous) = &self.slot {
            warn!(
                previous = %previous.kind(),
                replacement = %envelope.kind(),
                "Discarding envelope in session slot"
            );
        }
        info!(kind = %envelope.kind(), "Envelope imported");
        self.slot.insert(envelope)
    }

    pub fn current(&self) -> Option<&Envelope> {
        self.slot.as_ref()
    }

    /// Remove and return the slot's envelope.
    pub fn take(&mut self) -> Option<Envelope> {
        self.slot.take()
    }

    /// Incomplete frame groups of this session.
    pub fn pending(&self) -> Vec<PendingTransport> {
        self.assembler.pending_groups()
    }

    /// Drop the slot and every partial frame group.
    pub fn reset(&mut self) {
        self.slot = None;
        self.assembler.reset();
    }
}

fn classify_into(slot: &mut Option<Envelope>, wire: &WireEnvelope) -> Result<(), WalletError> {
    *slot = Some(Envelope::classify(wire.clone())?);
    Ok(())
}
