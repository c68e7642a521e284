//! # Envelope
//!
//! A classified transaction, message or snapshot payload. Envelopes are
//! immutable: every transition builds a new value with a fresh
//! classification whose rule records the source kind.

use cv_01_numeric_codec::{decode, FieldAllowlist, PayloadValue};
use cv_02_frame_transport::{split, Frame, WireEnvelope};
use cv_05_utxo_cache::UtxoSnapshot;
use serde_json::Value;
use shared_types::{unix_now, Timestamp, WalletError};
use tracing::info;

use super::classification::{classify, Classification, ClassificationRule, Evidence};
use super::EnvelopeKind;

/// Version stamped on envelopes created from bare payloads.
pub const DEFAULT_ENVELOPE_VERSION: u32 = 1;

/// A classified envelope.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    version: u32,
    payload: PayloadValue,
    classification: Classification,
}

impl Envelope {
    /// Classify a joined wire envelope.
    pub fn classify(wire: WireEnvelope) -> Result<Self, WalletError> {
        Self::classify_at(wire, unix_now())
    }

    /// Classify with an explicit clock reading.
    pub fn classify_at(wire: WireEnvelope, now: Timestamp) -> Result<Self, WalletError> {
        let classification = classify(
            &Evidence {
                type_tag: Some(&wire.type_tag),
                payload: &wire.payload,
            },
            now,
        )?;
        Ok(Self {
            version: wire.version,
            payload: wire.payload,
            classification,
        })
    }

    /// Import text from a file or manual entry.
    ///
    /// Accepts a full wire envelope (`type`, `version`, `data`) or a bare
    /// payload object with an optional `type` key.
    pub fn import(text: &str, allowlist: &FieldAllowlist) -> Result<Self, WalletError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| WalletError::validation(format!("import is not valid JSON: {e}")))?;
        let object = value
            .as_object()
            .ok_or_else(|| WalletError::validation("import must be a JSON object"))?;

        if object.contains_key("data") && object.contains_key("version") {
            return Self::classify(WireEnvelope::from_json(&value, allowlist)?);
        }

        let mut payload = decode(&value, allowlist);
        let type_tag = payload
            .as_record_mut()
            .and_then(|fields| fields.remove("type"))
            .and_then(|tag| tag.as_str().map(str::to_string));

        let classification = classify(
            &Evidence {
                type_tag: type_tag.as_deref(),
                payload: &payload,
            },
            unix_now(),
        )?;
        info!(kind = %classification.kind(), "Bare payload imported");
        Ok(Self {
            version: DEFAULT_ENVELOPE_VERSION,
            payload,
            classification,
        })
    }

    /// Wrap a UTXO snapshot for transport.
    pub fn from_utxo_snapshot(snapshot: &UtxoSnapshot) -> Self {
        Self {
            version: DEFAULT_ENVELOPE_VERSION,
            payload: snapshot.to_payload(),
            classification: Classification::new(
                EnvelopeKind::UtxoSnapshot,
                ClassificationRule::CoreFields,
                unix_now(),
            ),
        }
    }

    /// Read the snapshot back out of a `utxo-data` envelope.
    pub fn to_utxo_snapshot(&self) -> Result<UtxoSnapshot, WalletError> {
        if self.kind() != EnvelopeKind::UtxoSnapshot {
            return Err(WalletError::validation(format!(
                "{} envelope does not carry a UTXO snapshot",
                self.kind()
            )));
        }
        UtxoSnapshot::from_payload(&self.payload)
    }

    /// Successor envelope produced by a lifecycle transition.
    pub(crate) fn transition(&self, kind: EnvelopeKind, payload: PayloadValue) -> Self {
        Self {
            version: self.version,
            payload,
            classification: Classification::new(
                kind,
                ClassificationRule::Transition { from: self.kind() },
                unix_now(),
            ),
        }
    }

    pub fn kind(&self) -> EnvelopeKind {
        self.classification.kind()
    }

    /// Wire type tag of the classified kind.
    pub fn type_tag(&self) -> &'static str {
        self.kind().tag()
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn payload(&self) -> &PayloadValue {
        &self.payload
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    /// Transport form, tagged with the classified kind.
    pub fn to_wire(&self) -> WireEnvelope {
        WireEnvelope::new(self.type_tag(), self.version, self.payload.clone())
    }

    /// Split for a physical transport.
    pub fn to_frames(&self, max_frame_bytes: usize) -> Result<Vec<Frame>, WalletError> {
        split(&self.to_wire(), max_frame_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Network, Utxo, U256};

    #[test]
    fn test_import_full_wire_envelope() {
        let text = r#"{"data":{"inputs":[],"outputs":[],"fee":"1000"},"type":"unsigned-transaction","version":2}"#;
        let envelope = Envelope::import(text, &FieldAllowlist::default()).unwrap();
        assert_eq!(envelope.kind(), EnvelopeKind::UnsignedTransaction);
        assert_eq!(envelope.version(), 2);
        assert_eq!(
            envelope.payload().get("fee").unwrap().as_amount(),
            Some(U256::from(1000u64))
        );
    }

    #[test]
    fn test_import_bare_payload_strips_type_key() {
        let text = r#"{"type":"signed-message","message":"hi","signature":"sig"}"#;
        let envelope = Envelope::import(text, &FieldAllowlist::default()).unwrap();
        assert_eq!(envelope.kind(), EnvelopeKind::SignedMessage);
        assert_eq!(envelope.classification().rule(), ClassificationRule::SignatureMaterial);
        assert!(envelope.payload().get("type").is_none());
        assert_eq!(envelope.version(), DEFAULT_ENVELOPE_VERSION);
    }

    #[test]
    fn test_import_rejects_unclassifiable() {
        let err = Envelope::import(r#"{"hello":"world"}"#, &FieldAllowlist::default()).unwrap_err();
        assert!(matches!(err, WalletError::Validation(_)));
        let err = Envelope::import("[]", &FieldAllowlist::default()).unwrap_err();
        assert!(matches!(err, WalletError::Validation(_)));
    }

    #[test]
    fn test_to_wire_uses_classified_tag() {
        let wire = WireEnvelope::new(
            "unsigned-transaction",
            1,
            PayloadValue::record().with_field("signedTransaction", "ff"),
        );
        let envelope = Envelope::classify(wire).unwrap();
        assert_eq!(envelope.to_wire().type_tag, "signed-transaction");
    }

    #[test]
    fn test_snapshot_bridge() {
        let snapshot = UtxoSnapshot::new(
            vec![Utxo {
                txid: "t".into(),
                vout: 0,
                address: "a".into(),
                value: U256::from(u64::MAX) * U256::from(3u64),
                confirmations: 1,
            }],
            ["a".to_string()],
            Network::Mainnet,
            1_700_000_000,
        );
        let envelope = Envelope::from_utxo_snapshot(&snapshot);
        assert_eq!(envelope.type_tag(), "utxo-data");

        // Across the wire and back.
        let text = envelope.to_wire().to_canonical_string();
        let imported = Envelope::import(&text, &FieldAllowlist::default()).unwrap();
        assert_eq!(imported.kind(), EnvelopeKind::UtxoSnapshot);
        assert_eq!(imported.to_utxo_snapshot().unwrap(), snapshot);
    }

    #[test]
    fn test_non_snapshot_envelope_has_no_snapshot() {
        let text = r#"{"message":"hi"}"#;
        let envelope = Envelope::import(text, &FieldAllowlist::default()).unwrap();
        assert!(envelope.to_utxo_snapshot().is_err());
    }
}
