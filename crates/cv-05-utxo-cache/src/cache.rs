//! # Snapshot Cache
//!
//! Bounded LRU of the latest snapshot per address group. A refresh fetches
//! the whole set from the balance lookup service and replaces the entry.

use lru::LruCache;
use parking_lot::Mutex;
use shared_types::{BalanceLookup, Network, Timestamp, WalletError};
use std::num::NonZeroUsize;
use tracing::{debug, info};

use crate::domain::{UtxoCacheConfig, UtxoSnapshot};

/// Sorted, de-duplicated set of addresses identifying one cache entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AddressGroup(Vec<String>);

impl AddressGroup {
    /// Normalize an address list into a group key.
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut members: Vec<String> = addresses.into_iter().map(Into::into).collect();
        members.sort();
        members.dedup();
        Self(members)
    }

    pub fn members(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Freshness of the cached snapshot for a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Staleness {
    /// Nothing cached.
    Missing,
    /// Younger than `max_age_secs`.
    Fresh { age_secs: u64 },
    /// Older than `max_age_secs`; refresh before relying on it.
    Stale { age_secs: u64 },
}

/// Latest-snapshot cache keyed by address group.
pub struct UtxoSnapshotCache {
    entries: Mutex<LruCache<AddressGroup, UtxoSnapshot>>,
    config: UtxoCacheConfig,
}

impl UtxoSnapshotCache {
    /// Create a cache, rejecting invalid bounds.
    pub fn new(config: UtxoCacheConfig) -> Result<Self, WalletError> {
        config.validate()?;
        let capacity = NonZeroUsize::new(config.max_groups).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            entries: Mutex::new(LruCache::new(capacity)),
            config,
        })
    }

    pub fn config(&self) -> &UtxoCacheConfig {
        &self.config
    }

    /// Fetch the current UTXO set for `addresses` and replace the cached entry.
    ///
    /// On lookup failure the previous entry is left untouched.
    pub async fn refresh<L>(
        &self,
        lookup: &L,
        addresses: &[String],
        network: Network,
        now: Timestamp,
    ) -> Result<UtxoSnapshot, WalletError>
    where
        L: BalanceLookup + ?Sized,
    {
        let group = AddressGroup::new(addresses.iter().cloned());
        if group.is_empty() {
            return Err(WalletError::validation("cannot snapshot an empty address group"));
        }

        let report = lookup.balance_and_utxos(group.members(), network).await?;
        let snapshot = UtxoSnapshot::new(report.utxos, group.members().to_vec(), network, now);

        info!(
            addresses = group.members().len(),
            utxos = snapshot.count(),
            %network,
            "UTXO snapshot refreshed"
        );
        self.entries.lock().put(group, snapshot.clone());
        Ok(snapshot)
    }

    /// Store a snapshot received from elsewhere (e.g. imported across the air gap).
    ///
    /// An older snapshot never overwrites a newer one for the same group.
    pub fn store(&self, snapshot: UtxoSnapshot) -> bool {
        let group = AddressGroup::new(snapshot.addresses().iter().cloned());
        let mut entries = self.entries.lock();
        if let Some(current) = entries.peek(&group) {
            if current.timestamp() > snapshot.timestamp() {
                debug!(
                    current = current.timestamp(),
                    offered = snapshot.timestamp(),
                    "Ignoring older snapshot"
                );
                return false;
            }
        }
        entries.put(group, snapshot);
        true
    }

    /// Latest snapshot for the group, marking it recently used.
    pub fn latest(&self, addresses: &[String]) -> Option<UtxoSnapshot> {
        let group = AddressGroup::new(addresses.iter().cloned());
        self.entries.lock().get(&group).cloned()
    }

    /// Age of the cached snapshot relative to `now`.
    pub fn staleness(&self, addresses: &[String], now: Timestamp) -> Staleness {
        let group = AddressGroup::new(addresses.iter().cloned());
        match self.entries.lock().peek(&group) {
            None => Staleness::Missing,
            Some(snapshot) => {
                let age_secs = now.saturating_sub(snapshot.timestamp());
                if age_secs > self.config.max_age_secs {
                    Staleness::Stale { age_secs }
                } else {
                    Staleness::Fresh { age_secs }
                }
            }
        }
    }

    /// Drop the cached snapshot for the group.
    pub fn invalidate(&self, addresses: &[String]) -> bool {
        let group = AddressGroup::new(addresses.iter().cloned());
        self.entries.lock().pop(&group).is_some()
    }

    /// Number of cached groups.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
