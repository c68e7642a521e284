//! # Envelope Classification
//!
//! Ordered rule table evaluated against an imported payload. The first rule
//! that recognizes a stage wins; the family comes from the type tag when one
//! is present, otherwise from the payload shape.
//!
//! | # | Rule | Signal |
//! |---|------|--------|
//! | 1 | `StatusTag` | top-level `status` of `unsigned`/`signed`/`submitted` |
//! | 2 | `SignatureMaterial` | non-empty `signatures`, `signature` or `signedTransaction` |
//! | 3 | `NetworkIdentifier` | non-empty `txid` / `txId` |
//! | 4 | `CoreFields` | `inputs` + `outputs` lists or `message` text; `utxos` list |
//! | 5 | `TypeTag` | substring of the type tag |

use cv_01_numeric_codec::PayloadValue;
use serde::{Deserialize, Serialize};
use shared_types::{Timestamp, WalletError};
use tracing::debug;

use super::{EnvelopeKind, Family, Stage};

/// Which rule produced a classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassificationRule {
    StatusTag,
    SignatureMaterial,
    NetworkIdentifier,
    CoreFields,
    TypeTag,
    /// Produced by a lifecycle transition rather than import.
    Transition { from: EnvelopeKind },
}

/// Immutable record of how an envelope got its kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    kind: EnvelopeKind,
    rule: ClassificationRule,
    classified_at: Timestamp,
}

impl Classification {
    pub(crate) fn new(kind: EnvelopeKind, rule: ClassificationRule, classified_at: Timestamp) -> Self {
        Self {
            kind,
            rule,
            classified_at,
        }
    }

    pub fn kind(&self) -> EnvelopeKind {
        self.kind
    }

    pub fn rule(&self) -> ClassificationRule {
        self.rule
    }

    pub fn classified_at(&self) -> Timestamp {
        self.classified_at
    }
}

/// What the rules look at.
#[derive(Clone, Copy, Debug)]
pub struct Evidence<'a> {
    /// Type tag, absent for bare payloads typed in by hand.
    pub type_tag: Option<&'a str>,
    /// Decoded payload.
    pub payload: &'a PayloadValue,
}

type StageRule = fn(&Evidence<'_>) -> Option<Stage>;

/// Rules in priority order.
pub const RULES: [(ClassificationRule, StageRule); 5] = [
    (ClassificationRule::StatusTag, status_tag),
    (ClassificationRule::SignatureMaterial, signature_material),
    (ClassificationRule::NetworkIdentifier, network_identifier),
    (ClassificationRule::CoreFields, core_fields),
    (ClassificationRule::TypeTag, type_tag),
];

/// Rule 1: explicit `status` field.
pub fn status_tag(evidence: &Evidence<'_>) -> Option<Stage> {
    match evidence.payload.get("status")?.as_str()? {
        "unsigned" => Some(Stage::Unsigned),
        "signed" => Some(Stage::Signed),
        "submitted" => Some(Stage::Submitted),
        _ => None,
    }
}

/// Rule 2: signatures are present.
pub fn signature_material(evidence: &Evidence<'_>) -> Option<Stage> {
    let payload = evidence.payload;
    let has_signature_list = payload
        .get("signatures")
        .and_then(PayloadValue::as_list)
        .is_some_and(|list| !list.is_empty());
    let has_signature_text = payload.non_empty_text("signature").is_some()
        || payload.non_empty_text("signedTransaction").is_some();
    (has_signature_list || has_signature_text).then_some(Stage::Signed)
}

/// Rule 3: the network has assigned an identifier.
pub fn network_identifier(evidence: &Evidence<'_>) -> Option<Stage> {
    let payload = evidence.payload;
    (payload.non_empty_text("txid").is_some() || payload.non_empty_text("txId").is_some())
        .then_some(Stage::Submitted)
}

/// Rule 4: fields an unsigned request or a snapshot cannot do without.
pub fn core_fields(evidence: &Evidence<'_>) -> Option<Stage> {
    let payload = evidence.payload;
    let is_list = |key: &str| payload.get(key).and_then(PayloadValue::as_list).is_some();
    if (is_list("inputs") && is_list("outputs")) || payload.non_empty_text("message").is_some() {
        Some(Stage::Unsigned)
    } else if is_list("utxos") {
        Some(Stage::Snapshot)
    } else {
        None
    }
}

/// Rule 5: last resort on the tag text. `unsigned` is tested before
/// `signed`, which it contains.
pub fn type_tag(evidence: &Evidence<'_>) -> Option<Stage> {
    let tag = evidence.type_tag?;
    if tag.contains("unsigned") {
        Some(Stage::Unsigned)
    } else if tag.contains("submitted") {
        Some(Stage::Submitted)
    } else if tag.contains("signed") {
        Some(Stage::Signed)
    } else if tag.contains("utxo") {
        Some(Stage::Snapshot)
    } else {
        None
    }
}

/// Family from the tag, else from payload fields.
pub fn family_of(evidence: &Evidence<'_>) -> Option<Family> {
    if let Some(tag) = evidence.type_tag {
        if tag.contains("utxo") {
            return Some(Family::Utxo);
        }
        if tag.contains("message") {
            return Some(Family::Message);
        }
        if tag.contains("transaction") {
            return Some(Family::Transaction);
        }
    }
    let payload = evidence.payload;
    if payload.get("utxos").and_then(PayloadValue::as_list).is_some() {
        Some(Family::Utxo)
    } else if payload.non_empty_text("message").is_some() {
        Some(Family::Message)
    } else if ["inputs", "outputs", "signedTransaction", "txid", "txId"]
        .iter()
        .any(|key| payload.get(key).is_some())
    {
        Some(Family::Transaction)
    } else {
        None
    }
}

/// Run the rule table.
///
/// # Errors
///
/// `Validation` if no rule matches or the matched stage does not exist for
/// the envelope's family (e.g. a submitted message).
pub fn classify(evidence: &Evidence<'_>, now: Timestamp) -> Result<Classification, WalletError> {
    let (rule, stage) = RULES
        .iter()
        .find_map(|(rule, check)| check(evidence).map(|stage| (*rule, stage)))
        .ok_or_else(|| {
            WalletError::validation(format!(
                "unrecognized envelope (type {:?})",
                evidence.type_tag.unwrap_or("none")
            ))
        })?;

    let family = family_of(evidence).unwrap_or(match stage {
        Stage::Snapshot => Family::Utxo,
        _ => Family::Transaction,
    });

    let kind = EnvelopeKind::from_parts(family, stage).ok_or_else(|| {
        WalletError::validation(format!(
            "no {} stage exists for a {:?} envelope",
            stage.as_str(),
            family
        ))
    })?;

    debug!(%kind, ?rule, "Envelope classified");
    Ok(Classification::new(kind, rule, now))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence<'a>(tag: Option<&'a str>, payload: &'a PayloadValue) -> Evidence<'a> {
        Evidence {
            type_tag: tag,
            payload,
        }
    }

    fn unsigned_tx() -> PayloadValue {
        PayloadValue::record()
            .with_field("inputs", vec![PayloadValue::record().with_field("address", "a")])
            .with_field("outputs", Vec::<PayloadValue>::new())
    }

    #[test]
    fn test_status_tag_rule() {
        let payload = PayloadValue::record().with_field("status", "submitted");
        assert_eq!(status_tag(&evidence(None, &payload)), Some(Stage::Submitted));

        let unknown = PayloadValue::record().with_field("status", "pending");
        assert_eq!(status_tag(&evidence(None, &unknown)), None);
    }

    #[test]
    fn test_signature_material_rule() {
        let list = PayloadValue::record().with_field("signatures", vec![PayloadValue::from("s")]);
        let empty_list = PayloadValue::record().with_field("signatures", Vec::<PayloadValue>::new());
        let text = PayloadValue::record().with_field("signedTransaction", "00ff");
        let empty_text = PayloadValue::record().with_field("signature", "");

        assert_eq!(signature_material(&evidence(None, &list)), Some(Stage::Signed));
        assert_eq!(signature_material(&evidence(None, &text)), Some(Stage::Signed));
        assert_eq!(signature_material(&evidence(None, &empty_list)), None);
        assert_eq!(signature_material(&evidence(None, &empty_text)), None);
    }

    #[test]
    fn test_network_identifier_rule() {
        let lower = PayloadValue::record().with_field("txid", "abc");
        let camel = PayloadValue::record().with_field("txId", "abc");
        assert_eq!(network_identifier(&evidence(None, &lower)), Some(Stage::Submitted));
        assert_eq!(network_identifier(&evidence(None, &camel)), Some(Stage::Submitted));
        assert_eq!(network_identifier(&evidence(None, &unsigned_tx())), None);
    }

    #[test]
    fn test_core_fields_rule() {
        let message = PayloadValue::record().with_field("message", "hello");
        let utxos = PayloadValue::record().with_field("utxos", Vec::<PayloadValue>::new());
        let inputs_only = PayloadValue::record().with_field("inputs", Vec::<PayloadValue>::new());

        assert_eq!(core_fields(&evidence(None, &unsigned_tx())), Some(Stage::Unsigned));
        assert_eq!(core_fields(&evidence(None, &message)), Some(Stage::Unsigned));
        assert_eq!(core_fields(&evidence(None, &utxos)), Some(Stage::Snapshot));
        assert_eq!(core_fields(&evidence(None, &inputs_only)), None);
    }

    #[test]
    fn test_type_tag_rule_order() {
        let payload = PayloadValue::record();
        let stage = |tag: &str| type_tag(&evidence(Some(tag), &payload));
        assert_eq!(stage("unsigned-transaction"), Some(Stage::Unsigned));
        assert_eq!(stage("submitted-transaction"), Some(Stage::Submitted));
        assert_eq!(stage("signed-message"), Some(Stage::Signed));
        assert_eq!(stage("utxo-data"), Some(Stage::Snapshot));
        assert_eq!(stage("mystery"), None);
        assert_eq!(type_tag(&evidence(None, &payload)), None);
    }

    #[test]
    fn test_status_outranks_signature_material() {
        let payload = PayloadValue::record()
            .with_field("status", "submitted")
            .with_field("signatures", vec![PayloadValue::from("s")])
            .with_field("txid", "t");
        let c = classify(&evidence(Some("signed-transaction"), &payload), 7).unwrap();
        assert_eq!(c.kind(), EnvelopeKind::SubmittedTransaction);
        assert_eq!(c.rule(), ClassificationRule::StatusTag);
        assert_eq!(c.classified_at(), 7);
    }

    #[test]
    fn test_signature_outranks_tag() {
        let payload = unsigned_with_signature();
        let c = classify(&evidence(Some("unsigned-transaction"), &payload), 0).unwrap();
        assert_eq!(c.kind(), EnvelopeKind::SignedTransaction);
        assert_eq!(c.rule(), ClassificationRule::SignatureMaterial);
    }

    fn unsigned_with_signature() -> PayloadValue {
        unsigned_tx().with_field("signedTransaction", "deadbeef")
    }

    #[test]
    fn test_family_from_payload_without_tag() {
        let message = PayloadValue::record().with_field("message", "hi");
        let c = classify(&evidence(None, &message), 0).unwrap();
        assert_eq!(c.kind(), EnvelopeKind::UnsignedMessage);

        let snapshot = PayloadValue::record().with_field("utxos", Vec::<PayloadValue>::new());
        let c = classify(&evidence(None, &snapshot), 0).unwrap();
        assert_eq!(c.kind(), EnvelopeKind::UtxoSnapshot);
    }

    #[test]
    fn test_submitted_message_rejected() {
        let payload = PayloadValue::record()
            .with_field("message", "hi")
            .with_field("txid", "abc");
        let err = classify(&evidence(Some("signed-message"), &payload), 0).unwrap_err();
        assert!(matches!(err, WalletError::Validation(_)));
    }

    #[test]
    fn test_unrecognized_rejected() {
        let payload = PayloadValue::record().with_field("note", "?");
        assert!(matches!(
            classify(&evidence(None, &payload), 0),
            Err(WalletError::Validation(_))
        ));
    }
}
