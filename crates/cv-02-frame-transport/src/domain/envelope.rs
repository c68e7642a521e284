//! Untyped envelope carrier as it crosses the physical transport.

use cv_01_numeric_codec::{decode, encode, FieldAllowlist, PayloadValue};
use serde_json::{Map, Value};
use shared_types::WalletError;

/// Envelope as serialized for transport: tag, version and encoded payload.
///
/// Canonical text form is `{"data":<payload>,"type":<tag>,"version":<n>}`
/// with sorted keys and no whitespace.
#[derive(Clone, Debug, PartialEq)]
pub struct WireEnvelope {
    /// Envelope type tag, e.g. `unsigned-transaction`.
    pub type_tag: String,
    /// Envelope format version.
    pub version: u32,
    /// Logical payload.
    pub payload: PayloadValue,
}

impl WireEnvelope {
    /// Create a wire envelope.
    pub fn new(type_tag: impl Into<String>, version: u32, payload: PayloadValue) -> Self {
        Self {
            type_tag: type_tag.into(),
            version,
            payload,
        }
    }

    /// JSON form with amounts encoded as decimal strings.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("data".to_string(), encode(&self.payload));
        map.insert("type".to_string(), Value::String(self.type_tag.clone()));
        map.insert("version".to_string(), Value::from(self.version));
        Value::Object(map)
    }

    /// Canonical compact string.
    pub fn to_canonical_string(&self) -> String {
        self.to_json().to_string()
    }

    /// Read a wire envelope from a JSON object with `type`, `version` and `data`.
    pub fn from_json(value: &Value, allowlist: &FieldAllowlist) -> Result<Self, WalletError> {
        let object = value
            .as_object()
            .ok_or_else(|| WalletError::validation("envelope must be a JSON object"))?;

        let type_tag = object
            .get("type")
            .and_then(Value::as_str)
            .filter(|tag| !tag.is_empty())
            .ok_or_else(|| WalletError::validation("envelope is missing a type tag"))?;

        let version = object
            .get("version")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| WalletError::validation("envelope is missing a valid version"))?;

        let data = object
            .get("data")
            .ok_or_else(|| WalletError::validation("envelope is missing its data field"))?;

        Ok(Self::new(type_tag, version, decode(data, allowlist)))
    }

    /// Parse canonical text.
    pub fn from_canonical_str(text: &str, allowlist: &FieldAllowlist) -> Result<Self, WalletError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| WalletError::validation(format!("envelope is not valid JSON: {e}")))?;
        Self::from_json(&value, allowlist)
    }
}
