//! Envelope kinds and the two axes they are built from.

use cv_02_frame_transport::MULTIPART_SUFFIX;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What an envelope carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Transaction,
    Message,
    Utxo,
}

/// Where an envelope is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Unsigned,
    Signed,
    Submitted,
    /// Balance data; has no lifecycle.
    Snapshot,
}

impl Stage {
    /// Value of the payload `status` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Unsigned => "unsigned",
            Stage::Signed => "signed",
            Stage::Submitted => "submitted",
            Stage::Snapshot => "snapshot",
        }
    }
}

/// Classified envelope type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvelopeKind {
    UnsignedTransaction,
    SignedTransaction,
    SubmittedTransaction,
    UtxoSnapshot,
    UnsignedMessage,
    SignedMessage,
}

impl EnvelopeKind {
    /// All kinds, in lifecycle order per family.
    pub const ALL: [EnvelopeKind; 6] = [
        EnvelopeKind::UnsignedTransaction,
        EnvelopeKind::SignedTransaction,
        EnvelopeKind::SubmittedTransaction,
        EnvelopeKind::UtxoSnapshot,
        EnvelopeKind::UnsignedMessage,
        EnvelopeKind::SignedMessage,
    ];

    /// Wire type tag.
    pub fn tag(&self) -> &'static str {
        match self {
            EnvelopeKind::UnsignedTransaction => "unsigned-transaction",
            EnvelopeKind::SignedTransaction => "signed-transaction",
            EnvelopeKind::SubmittedTransaction => "submitted-transaction",
            EnvelopeKind::UtxoSnapshot => "utxo-data",
            EnvelopeKind::UnsignedMessage => "unsigned-message",
            EnvelopeKind::SignedMessage => "signed-message",
        }
    }

    /// Exact tag lookup; a `-multipart` suffix is ignored.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.strip_suffix(MULTIPART_SUFFIX).unwrap_or(tag);
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Combine family and stage; `None` for combinations that do not exist.
    pub fn from_parts(family: Family, stage: Stage) -> Option<Self> {
        match (family, stage) {
            (Family::Transaction, Stage::Unsigned) => Some(EnvelopeKind::UnsignedTransaction),
            (Family::Transaction, Stage::Signed) => Some(EnvelopeKind::SignedTransaction),
            (Family::Transaction, Stage::Submitted) => Some(EnvelopeKind::SubmittedTransaction),
            (Family::Message, Stage::Unsigned) => Some(EnvelopeKind::UnsignedMessage),
            (Family::Message, Stage::Signed) => Some(EnvelopeKind::SignedMessage),
            (Family::Utxo, Stage::Snapshot) => Some(EnvelopeKind::UtxoSnapshot),
            _ => None,
        }
    }

    pub fn family(&self) -> Family {
        match self {
            EnvelopeKind::UnsignedTransaction
            | EnvelopeKind::SignedTransaction
            | EnvelopeKind::SubmittedTransaction => Family::Transaction,
            EnvelopeKind::UnsignedMessage | EnvelopeKind::SignedMessage => Family::Message,
            EnvelopeKind::UtxoSnapshot => Family::Utxo,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            EnvelopeKind::UnsignedTransaction | EnvelopeKind::UnsignedMessage => Stage::Unsigned,
            EnvelopeKind::SignedTransaction | EnvelopeKind::SignedMessage => Stage::Signed,
            EnvelopeKind::SubmittedTransaction => Stage::Submitted,
            EnvelopeKind::UtxoSnapshot => Stage::Snapshot,
        }
    }
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
