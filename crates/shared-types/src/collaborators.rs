//! # Balance Lookup Port
//!
//! Outbound port to the balance/UTXO lookup service, consumed by the
//! discovery engine and the UTXO snapshot cache, plus an in-memory mock.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;

use crate::entities::{Network, Utxo, U256};
use crate::errors::{RemoteService, WalletError};

/// Aggregate answer for one lookup call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceReport {
    /// Summed balance of the queried addresses.
    pub balance: U256,
    /// Unspent outputs owned by the queried addresses.
    pub utxos: Vec<Utxo>,
}

/// Balance/UTXO lookup service - outbound port.
#[async_trait]
pub trait BalanceLookup: Send + Sync {
    /// Balance and UTXO set of one or more addresses.
    async fn balance_and_utxos(
        &self,
        addresses: &[String],
        network: Network,
    ) -> Result<BalanceReport, WalletError>;
}

// =============================================================================
// Mock Implementation for Testing
// =============================================================================

/// In-memory balance oracle.
///
/// Unknown addresses report zero. Every call is recorded so tests can assert
/// exactly which addresses were probed.
#[derive(Default)]
pub struct MockBalanceOracle {
    balances: RwLock<HashMap<String, U256>>,
    utxos: RwLock<HashMap<String, Vec<Utxo>>>,
    calls: Mutex<Vec<Vec<String>>>,
    fail_on: RwLock<Option<String>>,
}

impl MockBalanceOracle {
    /// Create an oracle where every address is empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: give `address` a balance.
    pub fn with_balance(self, address: impl Into<String>, balance: U256) -> Self {
        self.set_balance(address, balance);
        self
    }

    /// Builder: add an unspent output (also credited to the balance).
    pub fn with_utxo(self, utxo: Utxo) -> Self {
        {
            let mut balances = self.balances.write();
            let entry = balances.entry(utxo.address.clone()).or_default();
            *entry = entry.saturating_add(utxo.value);
        }
        self.utxos
            .write()
            .entry(utxo.address.clone())
            .or_default()
            .push(utxo);
        self
    }

    /// Overwrite the balance of `address`.
    pub fn set_balance(&self, address: impl Into<String>, balance: U256) {
        self.balances.write().insert(address.into(), balance);
    }

    /// Fail any lookup that includes `address`.
    pub fn fail_on(&self, address: impl Into<String>) {
        *self.fail_on.write() = Some(address.into());
    }

    /// Every address list passed to the oracle, in call order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }

    /// Number of lookups performed.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl BalanceLookup for MockBalanceOracle {
    async fn balance_and_utxos(
        &self,
        addresses: &[String],
        _network: Network,
    ) -> Result<BalanceReport, WalletError> {
        self.calls.lock().push(addresses.to_vec());

        if let Some(bad) = self.fail_on.read().as_ref() {
            if addresses.iter().any(|a| a == bad) {
                return Err(WalletError::remote(
                    RemoteService::BalanceLookup,
                    format!("Mock failure for {bad}"),
                ));
            }
        }

        let balances = self.balances.read();
        let utxos = self.utxos.read();
        let mut report = BalanceReport::default();
        for address in addresses {
            if let Some(balance) = balances.get(address) {
                report.balance = report.balance.saturating_add(*balance);
            }
            if let Some(outputs) = utxos.get(address) {
                report.utxos.extend(outputs.iter().cloned());
            }
        }
        Ok(report)
    }
}
