//! # UTXO Snapshot
//!
//! The unspent-output set of one address group at one point in time.
//! `count` always equals the number of outputs; a snapshot is never merged,
//! only replaced.

use cv_01_numeric_codec::{PayloadRecord, PayloadValue};
use serde::{Deserialize, Serialize};
use shared_types::{Network, Timestamp, Utxo, WalletError, U256};
use std::collections::BTreeSet;

/// Envelope tag under which snapshots cross the air gap.
pub const UTXO_SNAPSHOT_TAG: &str = "utxo-data";

/// Point-in-time UTXO set for an address group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SnapshotRecord")]
pub struct UtxoSnapshot {
    utxos: Vec<Utxo>,
    addresses: BTreeSet<String>,
    network: Network,
    timestamp: Timestamp,
    count: usize,
}

#[derive(Deserialize)]
struct SnapshotRecord {
    utxos: Vec<Utxo>,
    addresses: BTreeSet<String>,
    network: Network,
    timestamp: Timestamp,
    count: usize,
}

impl TryFrom<SnapshotRecord> for UtxoSnapshot {
    type Error = WalletError;

    fn try_from(record: SnapshotRecord) -> Result<Self, Self::Error> {
        check_count(record.count, record.utxos.len())?;
        Ok(Self {
            utxos: record.utxos,
            addresses: record.addresses,
            network: record.network,
            timestamp: record.timestamp,
            count: record.count,
        })
    }
}

fn check_count(count: usize, actual: usize) -> Result<(), WalletError> {
    if count != actual {
        return Err(WalletError::validation(format!(
            "snapshot count {count} does not match {actual} outputs"
        )));
    }
    Ok(())
}

impl UtxoSnapshot {
    /// Build a snapshot; `count` is derived from `utxos`.
    pub fn new(
        utxos: Vec<Utxo>,
        addresses: impl IntoIterator<Item = String>,
        network: Network,
        timestamp: Timestamp,
    ) -> Self {
        let count = utxos.len();
        Self {
            utxos,
            addresses: addresses.into_iter().collect(),
            network,
            timestamp,
            count,
        }
    }

    pub fn utxos(&self) -> &[Utxo] {
        &self.utxos
    }

    pub fn addresses(&self) -> &BTreeSet<String> {
        &self.addresses
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Sum of output values.
    pub fn total_value(&self) -> U256 {
        self.utxos
            .iter()
            .fold(U256::zero(), |acc, utxo| acc.saturating_add(utxo.value))
    }

    /// Envelope payload form. Output values are amounts.
    pub fn to_payload(&self) -> PayloadValue {
        let utxos = self
            .utxos
            .iter()
            .map(|utxo| {
                PayloadValue::record()
                    .with_field("txid", utxo.txid.as_str())
                    .with_field("vout", utxo.vout)
                    .with_field("address", utxo.address.as_str())
                    .with_field("value", utxo.value)
                    .with_field("confirmations", utxo.confirmations)
            })
            .collect::<Vec<_>>();
        let addresses = self
            .addresses
            .iter()
            .map(|a| PayloadValue::from(a.as_str()))
            .collect::<Vec<_>>();

        PayloadValue::record()
            .with_field("utxos", utxos)
            .with_field("addresses", addresses)
            .with_field("network", self.network.as_str())
            .with_field("timestamp", self.timestamp)
            .with_field("count", u64::try_from(self.count).unwrap_or(u64::MAX))
    }

    /// Read a snapshot from an envelope payload.
    ///
    /// # Errors
    ///
    /// `Validation` for missing fields or a count that disagrees with the outputs.
    pub fn from_payload(payload: &PayloadValue) -> Result<Self, WalletError> {
        let record = payload
            .as_record()
            .ok_or_else(|| WalletError::validation("snapshot payload must be a record"))?;

        let utxos = list_field(record, "utxos")?
            .iter()
            .map(utxo_from_payload)
            .collect::<Result<Vec<_>, _>>()?;

        let addresses = list_field(record, "addresses")?
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| WalletError::validation("snapshot address must be text"))
            })
            .collect::<Result<BTreeSet<_>, _>>()?;

        let network = record
            .get("network")
            .and_then(PayloadValue::as_str)
            .ok_or_else(|| WalletError::validation("snapshot is missing its network"))?
            .parse::<Network>()?;

        let timestamp = number_field(record, "timestamp")?;
        let count = usize::try_from(number_field(record, "count")?)
            .map_err(|_| WalletError::validation("snapshot count out of range"))?;
        check_count(count, utxos.len())?;

        Ok(Self {
            utxos,
            addresses,
            network,
            timestamp,
            count,
        })
    }
}

fn list_field<'a>(record: &'a PayloadRecord, key: &str) -> Result<&'a [PayloadValue], WalletError> {
    record
        .get(key)
        .and_then(PayloadValue::as_list)
        .ok_or_else(|| WalletError::validation(format!("snapshot field '{key}' must be a list")))
}

fn number_field(record: &PayloadRecord, key: &str) -> Result<u64, WalletError> {
    record
        .get(key)
        .and_then(PayloadValue::as_u64)
        .ok_or_else(|| WalletError::validation(format!("snapshot field '{key}' must be a number")))
}

fn utxo_from_payload(item: &PayloadValue) -> Result<Utxo, WalletError> {
    let record = item
        .as_record()
        .ok_or_else(|| WalletError::validation("snapshot output must be a record"))?;
    let text = |key: &str| {
        record
            .get(key)
            .and_then(PayloadValue::as_str)
            .map(str::to_string)
            .ok_or_else(|| WalletError::validation(format!("snapshot output is missing '{key}'")))
    };
    // Small values may have been written as plain JSON numbers.
    let value = match record.get("value") {
        Some(PayloadValue::Amount(amount)) => *amount,
        Some(PayloadValue::Number(n)) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| WalletError::validation("snapshot output value must be unsigned"))?,
        _ => return Err(WalletError::validation("snapshot output is missing 'value'")),
    };
    let vout = u32::try_from(number_field(record, "vout")?)
        .map_err(|_| WalletError::validation("snapshot output vout out of range"))?;
    let confirmations = u32::try_from(number_field(record, "confirmations")?)
        .map_err(|_| WalletError::validation("snapshot output confirmations out of range"))?;

    Ok(Utxo {
        txid: text("txid")?,
        vout,
        address: text("address")?,
        value,
        confirmations,
    })
}
