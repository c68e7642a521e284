//! # Frame
//!
//! One bounded-size transport unit. The wire shape is camelCase JSON:
//!
//! ```text
//! { "type", "version", "dataId"?, "partIndex", "totalParts", "isMultiPart", "payload" }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared_types::WalletError;

/// Suffix appended to the envelope tag on every frame of a multi-part group.
pub const MULTIPART_SUFFIX: &str = "-multipart";

/// Minimum bytes reserved for the frame header when computing chunk
/// capacity.
///
/// Covers `submitted-transaction-multipart`, a UUID `dataId`, `u32` part
/// counters and version, and one escaped character overshooting the chunk.
/// Longer custom tags reserve more.
pub const FRAME_HEADER_OVERHEAD: usize = 200;

/// A transport frame carrying one chunk of a serialized envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Envelope tag, suffixed with `-multipart` for multi-part groups.
    #[serde(rename = "type")]
    pub type_tag: String,
    /// Envelope format version.
    pub version: u32,
    /// Group identifier; present iff the frame is multi-part.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_id: Option<String>,
    /// 1-based position in the group.
    pub part_index: u32,
    /// Number of frames in the group.
    pub total_parts: u32,
    /// Redundant multi-part flag carried on the wire.
    pub is_multi_part: bool,
    /// Chunk of the serialized envelope.
    pub payload: String,
}

impl Frame {
    /// Frame carrying a whole serialized envelope.
    pub fn single(type_tag: impl Into<String>, version: u32, payload: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            version,
            data_id: None,
            part_index: 1,
            total_parts: 1,
            is_multi_part: false,
            payload: payload.into(),
        }
    }

    /// One part of a multi-part group. `envelope_tag` is the unsuffixed tag.
    pub fn part(
        envelope_tag: &str,
        version: u32,
        data_id: impl Into<String>,
        part_index: u32,
        total_parts: u32,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            type_tag: format!("{envelope_tag}{MULTIPART_SUFFIX}"),
            version,
            data_id: Some(data_id.into()),
            part_index,
            total_parts,
            is_multi_part: true,
            payload: payload.into(),
        }
    }

    /// True if the frame belongs to a multi-part group.
    pub fn is_multi_part(&self) -> bool {
        self.total_parts > 1
    }

    /// Tag of the envelope this frame carries, without the multi-part suffix.
    pub fn envelope_tag(&self) -> &str {
        self.type_tag
            .strip_suffix(MULTIPART_SUFFIX)
            .unwrap_or(&self.type_tag)
    }

    /// Check header consistency.
    pub fn validate(&self) -> Result<(), WalletError> {
        if self.total_parts == 0 {
            return Err(WalletError::validation("frame declares zero total parts"));
        }
        if self.part_index == 0 || self.part_index > self.total_parts {
            return Err(WalletError::validation(format!(
                "frame part {} is outside 1..={}",
                self.part_index, self.total_parts
            )));
        }
        let multi = self.is_multi_part();
        if self.is_multi_part != multi {
            return Err(WalletError::validation(
                "frame isMultiPart flag disagrees with totalParts",
            ));
        }
        match (&self.data_id, multi) {
            (Some(id), true) if id.is_empty() => {
                return Err(WalletError::validation("multi-part frame has an empty dataId"));
            }
            (None, true) => {
                return Err(WalletError::validation("multi-part frame is missing its dataId"));
            }
            (Some(_), false) => {
                return Err(WalletError::validation("single frame must not carry a dataId"));
            }
            _ => {}
        }
        if self.type_tag.ends_with(MULTIPART_SUFFIX) != multi {
            return Err(WalletError::validation(format!(
                "frame type '{}' does not match its part count",
                self.type_tag
            )));
        }
        if self.envelope_tag().is_empty() {
            return Err(WalletError::validation("frame has an empty type tag"));
        }
        Ok(())
    }

    /// Serialize to the wire shape.
    pub fn to_wire(&self) -> String {
        let mut value = json!({
            "type": self.type_tag,
            "version": self.version,
            "partIndex": self.part_index,
            "totalParts": self.total_parts,
            "isMultiPart": self.is_multi_part,
            "payload": self.payload,
        });
        if let (Some(id), Value::Object(map)) = (&self.data_id, &mut value) {
            map.insert("dataId".to_string(), Value::String(id.clone()));
        }
        value.to_string()
    }

    /// Parse and validate a frame scanned from a transfer unit.
    pub fn from_wire(text: &str) -> Result<Self, WalletError> {
        let frame: Frame = serde_json::from_str(text)
            .map_err(|e| WalletError::validation(format!("unreadable frame: {e}")))?;
        frame.validate()?;
        Ok(frame)
    }
}
