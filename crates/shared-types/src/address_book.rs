//! # Address Book
//!
//! The wallet's table of known addresses, one dense vector per chain.
//!
//! Entries are only ever appended (at the next free index) and mutated
//! through balance updates and the `used` flag. An index that has not been
//! derived yet is simply absent; there are no holes.

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::entities::{ChainKind, DerivedAddress, U256};
use crate::errors::WalletError;

/// Dense per-chain address table.
#[derive(Debug, Clone, Default)]
pub struct AddressBook {
    receive: Vec<DerivedAddress>,
    change: Vec<DerivedAddress>,
    /// address -> (chain, index)
    by_address: HashMap<String, (ChainKind, u32)>,
}

impl AddressBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries of one chain in index order.
    pub fn chain(&self, chain: ChainKind) -> &[DerivedAddress] {
        match chain {
            ChainKind::Receive => &self.receive,
            ChainKind::Change => &self.change,
        }
    }

    fn chain_mut(&mut self, chain: ChainKind) -> &mut Vec<DerivedAddress> {
        match chain {
            ChainKind::Receive => &mut self.receive,
            ChainKind::Change => &mut self.change,
        }
    }

    /// Next index that may be appended to `chain`.
    pub fn next_index(&self, chain: ChainKind) -> u32 {
        u32::try_from(self.chain(chain).len()).unwrap_or(u32::MAX)
    }

    /// Total number of known addresses.
    pub fn len(&self) -> usize {
        self.receive.len() + self.change.len()
    }

    /// True if no address is known.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append an entry at the next free index of its chain.
    ///
    /// # Errors
    ///
    /// `Validation` if the index is not the next free one or the address is
    /// already known.
    pub fn append(&mut self, entry: DerivedAddress) -> Result<(), WalletError> {
        let expected = u32::try_from(self.chain(entry.chain).len())
            .map_err(|_| WalletError::validation(format!("{} chain is full", entry.chain)))?;
        if entry.index != expected {
            return Err(WalletError::validation(format!(
                "{} chain expects index {}, got {}",
                entry.chain, expected, entry.index
            )));
        }
        if self.by_address.contains_key(&entry.address) {
            return Err(WalletError::validation(format!(
                "address {} already present",
                entry.address
            )));
        }

        self.by_address
            .insert(entry.address.clone(), (entry.chain, entry.index));
        self.chain_mut(entry.chain).push(entry);
        Ok(())
    }

    /// Look up an entry by address.
    pub fn get(&self, address: &str) -> Option<&DerivedAddress> {
        let (chain, index) = *self.by_address.get(address)?;
        self.chain(chain).get(index as usize)
    }

    /// Look up an entry by chain and index.
    pub fn get_by_index(&self, chain: ChainKind, index: u32) -> Option<&DerivedAddress> {
        self.chain(chain).get(index as usize)
    }

    /// True if the address is known.
    pub fn contains(&self, address: &str) -> bool {
        self.by_address.contains_key(address)
    }

    fn entry_mut(&mut self, address: &str) -> Option<&mut DerivedAddress> {
        let (chain, index) = *self.by_address.get(address)?;
        self.chain_mut(chain).get_mut(index as usize)
    }

    /// Record a fresh balance. Returns false if the address is unknown.
    ///
    /// A nonzero balance also marks the address used.
    pub fn set_balance(&mut self, address: &str, balance: U256) -> bool {
        match self.entry_mut(address) {
            Some(entry) => {
                entry.balance = balance;
                if !balance.is_zero() {
                    entry.used = true;
                }
                true
            }
            None => false,
        }
    }

    /// Set the `used` flag. Returns false if the address is unknown.
    pub fn mark_used(&mut self, address: &str) -> bool {
        match self.entry_mut(address) {
            Some(entry) => {
                entry.used = true;
                true
            }
            None => false,
        }
    }

    /// Entries with a nonzero balance, receive chain first, by index.
    pub fn funded(&self) -> impl Iterator<Item = &DerivedAddress> {
        self.receive
            .iter()
            .chain(self.change.iter())
            .filter(|entry| entry.is_funded())
    }

    /// Lowest-index entry of `chain` that has never been used.
    pub fn first_unused(&self, chain: ChainKind) -> Option<&DerivedAddress> {
        self.chain(chain).iter().find(|entry| !entry.used)
    }

    /// Sum of all known balances (saturating).
    pub fn total_balance(&self) -> U256 {
        self.receive
            .iter()
            .chain(self.change.iter())
            .fold(U256::zero(), |acc, entry| acc.saturating_add(entry.balance))
    }
}

/// Live address table that a broadcast transaction marks addresses used in.
///
/// Implemented by whatever owns the wallet's book, so the flag lands where
/// next-address rotation reads it.
pub trait AddressRegistry: Send + Sync {
    /// Chain of a known address.
    fn chain_of(&self, address: &str) -> Option<ChainKind>;

    /// Set the `used` flag. Returns false if the address is unknown.
    fn mark_used(&self, address: &str) -> bool;
}

impl AddressRegistry for RwLock<AddressBook> {
    fn chain_of(&self, address: &str) -> Option<ChainKind> {
        self.read().get(address).map(|entry| entry.chain)
    }

    fn mark_used(&self, address: &str) -> bool {
        self.write().mark_used(address)
    }
}
