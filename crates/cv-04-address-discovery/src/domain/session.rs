//! # Discovery Session
//!
//! Caller-owned scan state: the address book being filled, the index a
//! continuous scan should resume from, and the single-run lock.
//!
//! Clones share state, so a clone (or a [`CancelHandle`]) can be moved into
//! another task while the scan runs.

use parking_lot::RwLock;
use shared_types::{AddressBook, AddressRegistry, ChainKind, WalletError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct SessionState {
    book: AddressBook,
    resume_index: Option<u32>,
}

#[derive(Debug, Default)]
struct Shared {
    state: RwLock<SessionState>,
    active: AtomicBool,
    cancel: Arc<AtomicBool>,
}

/// Scan state owned by the caller, one per wallet view.
#[derive(Clone, Debug, Default)]
pub struct DiscoverySession {
    shared: Arc<Shared>,
}

impl DiscoverySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already-known book.
    pub fn with_book(book: AddressBook) -> Self {
        let session = Self::default();
        session.shared.state.write().book = book;
        session
    }

    /// Claim the session for one run.
    ///
    /// Clears any cancellation left over from a previous run.
    ///
    /// # Errors
    ///
    /// `ScanInProgress` if another run holds the session.
    pub fn begin(&self) -> Result<ScanGuard, WalletError> {
        if self
            .shared
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(WalletError::ScanInProgress);
        }
        self.shared.cancel.store(false, Ordering::Release);
        Ok(ScanGuard {
            shared: Arc::clone(&self.shared),
        })
    }

    /// True while a run holds the session.
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            flag: Arc::clone(&self.shared.cancel),
        }
    }

    /// Snapshot of the address book.
    pub fn book(&self) -> AddressBook {
        self.shared.state.read().book.clone()
    }

    /// Where the next continuous scan should start, if a previous one set it.
    pub fn resume_index(&self) -> Option<u32> {
        self.shared.state.read().resume_index
    }

    pub(crate) fn set_resume_index(&self, index: u32) {
        self.shared.state.write().resume_index = Some(index);
    }

    /// Mutate the book under the write lock. Never held across an await.
    pub(crate) fn update_book<R>(&self, f: impl FnOnce(&mut AddressBook) -> R) -> R {
        f(&mut self.shared.state.write().book)
    }

    pub(crate) fn read_book<R>(&self, f: impl FnOnce(&AddressBook) -> R) -> R {
        f(&self.shared.state.read().book)
    }
}

/// Submitted transactions mark their addresses used in the live book, so
/// `next_address` stops handing out spent change.
impl AddressRegistry for DiscoverySession {
    fn chain_of(&self, address: &str) -> Option<ChainKind> {
        self.read_book(|book| book.get(address).map(|entry| entry.chain))
    }

    fn mark_used(&self, address: &str) -> bool {
        self.update_book(|book| book.mark_used(address))
    }
}

/// Held for the lifetime of one scan stream; releases the session on drop.
#[derive(Debug)]
pub struct ScanGuard {
    shared: Arc<Shared>,
}

impl ScanGuard {
    pub(crate) fn is_cancelled(&self) -> bool {
        self.shared.cancel.load(Ordering::Acquire)
    }
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        self.shared.active.store(false, Ordering::Release);
    }
}

/// Requests that a continuous scan stop at its next round boundary.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
