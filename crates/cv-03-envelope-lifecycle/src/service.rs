//! # Envelope Service
//!
//! Drives `Unsigned -> Signed -> Submitted` through the signing and
//! broadcast ports, resolving keys against the wallet's address book.

use async_trait::async_trait;
use cv_01_numeric_codec::{PayloadRecord, PayloadValue};
use shared_types::{
    unix_now, AddressBook, AddressRegistry, ChainKind, KeyHandle, Network, RemoteService,
    WalletError,
};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::domain::{Envelope, EnvelopeKind, Family, Stage};
use crate::ports::{BroadcastService, EnvelopeLifecycleApi, SigningService};

/// Lifecycle service over a signer and a broadcaster.
pub struct EnvelopeService<S, B> {
    signer: S,
    broadcaster: B,
}

impl<S, B> EnvelopeService<S, B>
where
    S: SigningService,
    B: BroadcastService,
{
    pub fn new(signer: S, broadcaster: B) -> Self {
        Self {
            signer,
            broadcaster,
        }
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    pub fn broadcaster(&self) -> &B {
        &self.broadcaster
    }
}

/// Addresses whose keys an envelope spends from.
pub fn input_addresses(envelope: &Envelope) -> Vec<String> {
    let payload = envelope.payload();
    match envelope.kind().family() {
        Family::Message => payload
            .non_empty_text("address")
            .map(|a| vec![a.to_string()])
            .unwrap_or_default(),
        _ => payload
            .get("inputs")
            .and_then(PayloadValue::as_list)
            .unwrap_or_default()
            .iter()
            .filter_map(|input| input.non_empty_text("address"))
            .map(str::to_string)
            .collect(),
    }
}

/// Map input addresses to key handles.
///
/// If any input is unknown to `book` (the envelope came from another
/// session), every funded book address becomes a candidate instead.
pub fn resolve_signing_keys(
    inputs: &[String],
    book: &AddressBook,
) -> Result<BTreeMap<String, KeyHandle>, WalletError> {
    let unknown = inputs.iter().filter(|a| !book.contains(a)).count();

    let keys: BTreeMap<String, KeyHandle> = if !inputs.is_empty() && unknown == 0 {
        inputs
            .iter()
            .filter_map(|address| book.get(address))
            .map(|entry| (entry.address.clone(), entry.signing_handle()))
            .collect()
    } else {
        warn!(
            inputs = inputs.len(),
            unknown,
            "Inputs not resolvable from address book, using funded addresses"
        );
        book.funded()
            .map(|entry| (entry.address.clone(), entry.signing_handle()))
            .collect()
    };

    if keys.is_empty() {
        return Err(WalletError::validation(
            "no signing keys available for this envelope",
        ));
    }
    Ok(keys)
}

/// Outputs flagged `change: true` or paying a change-chain book address.
pub fn change_output_addresses(envelope: &Envelope, registry: &dyn AddressRegistry) -> Vec<String> {
    envelope
        .payload()
        .get("outputs")
        .and_then(PayloadValue::as_list)
        .unwrap_or_default()
        .iter()
        .filter_map(|output| {
            let address = output.non_empty_text("address")?;
            let flagged = output
                .get("change")
                .and_then(PayloadValue::as_bool)
                .unwrap_or(false);
            let on_change_chain = registry.chain_of(address) == Some(ChainKind::Change);
            (flagged || on_change_chain).then(|| address.to_string())
        })
        .collect()
}

fn record_of(envelope: &Envelope) -> Result<PayloadRecord, WalletError> {
    envelope
        .payload()
        .as_record()
        .cloned()
        .ok_or_else(|| WalletError::validation("envelope payload must be a record"))
}

fn wrong_state(envelope: &Envelope, attempted: &str) -> WalletError {
    WalletError::StateTransition {
        from: envelope.type_tag().to_string(),
        attempted: attempted.to_string(),
    }
}

#[async_trait]
impl<S, B> EnvelopeLifecycleApi for EnvelopeService<S, B>
where
    S: SigningService,
    B: BroadcastService,
{
    async fn sign(&self, envelope: &Envelope, book: &AddressBook) -> Result<Envelope, WalletError> {
        let signed_kind = match envelope.kind() {
            EnvelopeKind::UnsignedTransaction => EnvelopeKind::SignedTransaction,
            EnvelopeKind::UnsignedMessage => EnvelopeKind::SignedMessage,
            _ => return Err(wrong_state(envelope, "sign")),
        };

        let inputs = input_addresses(envelope);
        let keys = resolve_signing_keys(&inputs, book)?;
        let material = self.signer.sign(&envelope.to_wire(), &keys).await?;

        let mut fields = record_of(envelope)?;
        fields.insert(
            "signatures".to_string(),
            PayloadValue::List(material.signatures.into_iter().map(PayloadValue::Text).collect()),
        );
        let signed_field = match signed_kind.family() {
            Family::Message => "signature",
            _ => "signedTransaction",
        };
        fields.insert(signed_field.to_string(), PayloadValue::Text(material.signed_payload));
        fields.insert("status".to_string(), Stage::Signed.as_str().into());

        info!(kind = %signed_kind, keys = keys.len(), "Envelope signed");
        Ok(envelope.transition(signed_kind, PayloadValue::Record(fields)))
    }

    async fn submit(
        &self,
        envelope: &Envelope,
        registry: &dyn AddressRegistry,
        network: Network,
    ) -> Result<Envelope, WalletError> {
        if envelope.kind() != EnvelopeKind::SignedTransaction {
            return Err(wrong_state(envelope, "submit"));
        }

        let txid = self.broadcaster.broadcast(&envelope.to_wire(), network).await?;
        if txid.is_empty() {
            return Err(WalletError::remote(
                RemoteService::Broadcast,
                "broadcast returned an empty network identifier",
            ));
        }

        let mut fields = record_of(envelope)?;
        fields.insert("txid".to_string(), txid.as_str().into());
        fields.insert("submittedAt".to_string(), unix_now().into());
        fields.insert("status".to_string(), Stage::Submitted.as_str().into());

        let mut touched = input_addresses(envelope);
        touched.extend(change_output_addresses(envelope, registry));
        let marked = touched.iter().filter(|a| registry.mark_used(a)).count();

        info!(%txid, %network, marked_used = marked, "Transaction submitted");
        Ok(envelope.transition(EnvelopeKind::SubmittedTransaction, PayloadValue::Record(fields)))
    }
}
