//! # Frame Assembler
//!
//! Incremental join for an import session: frames arrive one scan at a time
//! and the assembler reports what is still missing. State lives only as long
//! as the assembler and is dropped by [`FrameAssembler::reset`].

use cv_01_numeric_codec::FieldAllowlist;
use shared_types::WalletError;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::domain::{check_joined_header, Frame, FrameGroup, PartOutcome, WireEnvelope};

/// Progress report for a group that is not yet complete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingTransport {
    /// Group identifier.
    pub data_id: String,
    /// Distinct parts received.
    pub received: u32,
    /// Announced part count.
    pub total: u32,
    /// 1-based indices still to scan.
    pub missing: Vec<u32>,
}

/// Outcome of handing one frame to the assembler.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameProgress {
    /// The frame completed an envelope; its group state is released.
    Complete(WireEnvelope),
    /// More parts are needed.
    Pending(PendingTransport),
    /// The identical frame was already held.
    Duplicate,
}

/// Session-scoped collector of partial frame groups.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    groups: HashMap<String, FrameGroup>,
    allowlist: FieldAllowlist,
}

impl FrameAssembler {
    /// Assembler decoding with the default amount allowlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assembler decoding with a custom allowlist.
    pub fn with_allowlist(allowlist: FieldAllowlist) -> Self {
        Self {
            groups: HashMap::new(),
            allowlist,
        }
    }

    /// Accept a scanned frame.
    ///
    /// A frame conflicting with a held part fails closed and leaves the group
    /// unchanged; use [`FrameAssembler::correct`] to overwrite deliberately.
    pub fn accept(&mut self, frame: Frame) -> Result<FrameProgress, WalletError> {
        self.accept_with(frame, |_| Ok(()))
    }

    /// [`FrameAssembler::accept`], running `check` on a completed envelope
    /// before its group is released. On failure every part stays held.
    pub fn accept_with<F>(&mut self, frame: Frame, check: F) -> Result<FrameProgress, WalletError>
    where
        F: FnOnce(&WireEnvelope) -> Result<(), WalletError>,
    {
        frame.validate()?;
        if !frame.is_multi_part() {
            let envelope = WireEnvelope::from_canonical_str(&frame.payload, &self.allowlist)?;
            check_joined_header(&envelope, &frame.type_tag, frame.version)?;
            check(&envelope)?;
            info!(tag = %envelope.type_tag, "Single-frame envelope received");
            return Ok(FrameProgress::Complete(envelope));
        }

        let data_id = frame.data_id.clone().unwrap_or_default();
        let group = self
            .groups
            .entry(data_id.clone())
            .or_insert_with(|| FrameGroup::for_frame(&frame));

        match group.insert(&frame)? {
            PartOutcome::Duplicate => Ok(FrameProgress::Duplicate),
            _ => self.progress(&data_id, check),
        }
    }

    /// Accept a frame that replaces whatever part is held at its index.
    pub fn correct(&mut self, frame: Frame) -> Result<FrameProgress, WalletError> {
        self.correct_with(frame, |_| Ok(()))
    }

    /// [`FrameAssembler::correct`] with a completion check, as in
    /// [`FrameAssembler::accept_with`].
    pub fn correct_with<F>(&mut self, frame: Frame, check: F) -> Result<FrameProgress, WalletError>
    where
        F: FnOnce(&WireEnvelope) -> Result<(), WalletError>,
    {
        frame.validate()?;
        let Some(group) = frame
            .data_id
            .as_ref()
            .and_then(|id| self.groups.get_mut(id))
        else {
            return self.accept_with(frame, check);
        };
        let data_id = group.data_id().to_string();
        match group.replace(&frame)? {
            PartOutcome::Duplicate => Ok(FrameProgress::Duplicate),
            _ => self.progress(&data_id, check),
        }
    }

    fn progress<F>(&mut self, data_id: &str, check: F) -> Result<FrameProgress, WalletError>
    where
        F: FnOnce(&WireEnvelope) -> Result<(), WalletError>,
    {
        let Some(group) = self.groups.get(data_id) else {
            return Err(WalletError::validation(format!("unknown frame group {data_id}")));
        };

        if !group.is_complete() {
            debug!(
                data_id,
                received = group.received(),
                total = group.total(),
                "Awaiting more frames"
            );
            return Ok(FrameProgress::Pending(pending_of(group)));
        }

        // Group stays held on decode or check failure so a bad part can be
        // corrected.
        let envelope = group.assemble(&self.allowlist)?;
        check(&envelope)?;
        info!(data_id, parts = group.total(), tag = %envelope.type_tag, "Frames joined");
        self.groups.remove(data_id);
        Ok(FrameProgress::Complete(envelope))
    }

    /// Missing part indices of a held group.
    pub fn missing(&self, data_id: &str) -> Option<Vec<u32>> {
        self.groups.get(data_id).map(FrameGroup::missing)
    }

    /// Every incomplete group, ordered by `dataId`.
    pub fn pending_groups(&self) -> Vec<PendingTransport> {
        let mut pending: Vec<PendingTransport> = self.groups.values().map(pending_of).collect();
        pending.sort_by(|a, b| a.data_id.cmp(&b.data_id));
        pending
    }

    /// Discard all partial state.
    pub fn reset(&mut self) {
        if !self.groups.is_empty() {
            debug!(groups = self.groups.len(), "Discarding partial frame groups");
        }
        self.groups.clear();
    }
}

fn pending_of(group: &FrameGroup) -> PendingTransport {
    PendingTransport {
        data_id: group.data_id().to_string(),
        received: group.received(),
        total: group.total(),
        missing: group.missing(),
    }
}
