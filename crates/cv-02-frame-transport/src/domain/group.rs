//! Collected parts of one multi-part envelope.

use cv_01_numeric_codec::FieldAllowlist;
use shared_types::WalletError;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::{Frame, WireEnvelope};

/// Result of offering a part to a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartOutcome {
    /// Part was new.
    Added,
    /// Identical part already present.
    Duplicate,
    /// A differing part was overwritten (explicit correction only).
    Replaced,
}

/// Parts received so far for one `dataId`.
#[derive(Clone, Debug)]
pub struct FrameGroup {
    data_id: String,
    type_tag: String,
    version: u32,
    total: u32,
    parts: BTreeMap<u32, String>,
}

impl FrameGroup {
    /// Empty group keyed on the header of `first`. The frame itself is not inserted.
    pub fn for_frame(first: &Frame) -> Self {
        Self {
            data_id: first.data_id.clone().unwrap_or_default(),
            type_tag: first.type_tag.clone(),
            version: first.version,
            total: first.total_parts,
            parts: BTreeMap::new(),
        }
    }

    /// Shared group identifier.
    pub fn data_id(&self) -> &str {
        &self.data_id
    }

    /// Announced part count.
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Number of distinct parts held.
    pub fn received(&self) -> u32 {
        self.parts.len() as u32
    }

    /// 1-based indices not yet received, ascending.
    pub fn missing(&self) -> Vec<u32> {
        (1..=self.total)
            .filter(|index| !self.parts.contains_key(index))
            .collect()
    }

    /// True once every part `1..=total` is present.
    pub fn is_complete(&self) -> bool {
        self.received() == self.total
    }

    /// Reject frames whose header disagrees with the group.
    pub fn check_consistent(&self, frame: &Frame) -> Result<(), WalletError> {
        if frame.data_id.as_deref() != Some(self.data_id.as_str()) {
            return Err(WalletError::validation(format!(
                "frame belongs to a different envelope than {}",
                self.data_id
            )));
        }
        if frame.type_tag != self.type_tag {
            return Err(WalletError::validation(format!(
                "frames of {} disagree on type: '{}' vs '{}'",
                self.data_id, self.type_tag, frame.type_tag
            )));
        }
        if frame.total_parts != self.total {
            return Err(WalletError::validation(format!(
                "frames of {} disagree on totalParts: {} vs {}",
                self.data_id, self.total, frame.total_parts
            )));
        }
        if frame.version != self.version {
            return Err(WalletError::validation(format!(
                "frames of {} disagree on version: {} vs {}",
                self.data_id, self.version, frame.version
            )));
        }
        Ok(())
    }

    /// Add a part. A differing part at an occupied index fails closed.
    pub fn insert(&mut self, frame: &Frame) -> Result<PartOutcome, WalletError> {
        self.check_consistent(frame)?;
        match self.parts.get(&frame.part_index) {
            Some(existing) if *existing == frame.payload => {
                debug!(data_id = %self.data_id, part = frame.part_index, "Duplicate frame ignored");
                Ok(PartOutcome::Duplicate)
            }
            Some(_) => {
                warn!(
                    data_id = %self.data_id,
                    part = frame.part_index,
                    "Conflicting duplicate frame rejected"
                );
                Err(WalletError::validation(format!(
                    "part {} of {} was received twice with different content",
                    frame.part_index, self.data_id
                )))
            }
            None => {
                self.parts.insert(frame.part_index, frame.payload.clone());
                debug!(
                    data_id = %self.data_id,
                    part = frame.part_index,
                    total = self.total,
                    "Frame accepted"
                );
                Ok(PartOutcome::Added)
            }
        }
    }

    /// Add or overwrite a part.
    pub fn replace(&mut self, frame: &Frame) -> Result<PartOutcome, WalletError> {
        self.check_consistent(frame)?;
        match self.parts.insert(frame.part_index, frame.payload.clone()) {
            None => Ok(PartOutcome::Added),
            Some(previous) if previous == frame.payload => Ok(PartOutcome::Duplicate),
            Some(_) => {
                warn!(data_id = %self.data_id, part = frame.part_index, "Frame part corrected");
                Ok(PartOutcome::Replaced)
            }
        }
    }

    /// Concatenate all parts in order and decode the envelope.
    pub fn assemble(&self, allowlist: &FieldAllowlist) -> Result<WireEnvelope, WalletError> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(WalletError::IncompleteTransport {
                data_id: self.data_id.clone(),
                missing,
                total: self.total,
            });
        }
        let text: String = self.parts.values().map(String::as_str).collect();
        let envelope = WireEnvelope::from_canonical_str(&text, allowlist)?;
        check_joined_header(&envelope, &self.type_tag, self.version)?;
        Ok(envelope)
    }
}

/// The joined envelope must carry the tag and version announced by its frames.
pub(crate) fn check_joined_header(
    envelope: &WireEnvelope,
    frame_tag: &str,
    frame_version: u32,
) -> Result<(), WalletError> {
    let expected = frame_tag
        .strip_suffix(super::MULTIPART_SUFFIX)
        .unwrap_or(frame_tag);
    if envelope.type_tag != expected {
        return Err(WalletError::validation(format!(
            "joined envelope type '{}' does not match frame type '{}'",
            envelope.type_tag, frame_tag
        )));
    }
    if envelope.version != frame_version {
        return Err(WalletError::validation(format!(
            "joined envelope version {} does not match frame version {}",
            envelope.version, frame_version
        )));
    }
    Ok(())
}
