//! # Discovery Engine
//!
//! Chooses which HD indices to derive, asks the balance service about each
//! one and records what it learns into the caller's [`DiscoverySession`].
//!
//! Every scan is a pulled stream. The session is claimed when the stream is
//! created and released when it is dropped, so a second scan on the same
//! session fails immediately with `ScanInProgress`.

use futures::stream::{self, BoxStream, StreamExt};
use shared_types::{
    BalanceLookup, ChainKind, DerivationPath, DerivedAddress, KeySource, WalletError,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::{
    BatchEvent, ContinuousOutcome, ContinuousStatus, DiscoveryConfig, DiscoverySession,
    ScanEvent, ScanGuard, ScanProgress, ScanRange, ScanResult, Termination,
};
use crate::ports::KeyDerivationService;

/// Stream of range or targeted scan events.
pub type ScanStream<'a> = BoxStream<'a, Result<ScanEvent, WalletError>>;
/// Stream of continuous scan events.
pub type BatchStream<'a> = BoxStream<'a, Result<BatchEvent, WalletError>>;

enum Step<E> {
    More(E),
    Last(E),
}

/// Address discovery over a key-derivation and a balance-lookup service.
pub struct DiscoveryEngine<K, B> {
    keys: Arc<K>,
    balances: Arc<B>,
    config: DiscoveryConfig,
}

impl<K, B> DiscoveryEngine<K, B>
where
    K: KeyDerivationService,
    B: BalanceLookup,
{
    /// # Errors
    ///
    /// `InvalidConfig` if `config` does not validate.
    pub fn new(keys: Arc<K>, balances: Arc<B>, config: DiscoveryConfig) -> Result<Self, WalletError> {
        config.validate()?;
        Ok(Self {
            keys,
            balances,
            config,
        })
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Derive one address without looking up its balance.
    pub async fn derive_one(
        &self,
        source: &KeySource,
        chain: ChainKind,
        index: u32,
    ) -> Result<DerivedAddress, WalletError> {
        let path = DerivationPath::new(chain, index);
        let key = self.keys.derive_address(source, &path).await?;
        Ok(DerivedAddress::new(chain, index, key))
    }

    async fn probe(
        &self,
        source: &KeySource,
        chain: ChainKind,
        index: u32,
    ) -> Result<DerivedAddress, WalletError> {
        let mut entry = self.derive_one(source, chain, index).await?;
        let report = self
            .balances
            .balance_and_utxos(std::slice::from_ref(&entry.address), self.config.network)
            .await?;
        entry.balance = report.balance;
        entry.used = entry.is_funded();
        debug!(
            chain = %chain,
            index,
            address = %entry.address,
            balance = %entry.balance,
            "Probed address"
        );
        Ok(entry)
    }

    /// Write probed entries into the session book, deriving any missing
    /// lower indices first so the chain stays dense.
    async fn record(
        &self,
        session: &DiscoverySession,
        source: &KeySource,
        chain: ChainKind,
        mut entries: Vec<DerivedAddress>,
    ) -> Result<(), WalletError> {
        entries.sort_by_key(|e| e.index);
        let Some(highest) = entries.last().map(|e| e.index) else {
            return Ok(());
        };

        let next = session.read_book(|book| book.next_index(chain));
        let mut known = Vec::new();
        let mut fresh = Vec::new();
        let mut pending = entries.into_iter().peekable();
        while let Some(entry) = pending.next_if(|e| e.index < next) {
            known.push(entry);
        }
        if next <= highest {
            for index in next..=highest {
                match pending.next_if(|e| e.index == index) {
                    Some(entry) => fresh.push(entry),
                    None => fresh.push(self.derive_one(source, chain, index).await?),
                }
            }
        }

        session.update_book(|book| {
            for entry in &known {
                book.set_balance(&entry.address, entry.balance);
            }
            fresh.into_iter().try_for_each(|entry| book.append(entry))
        })
    }

    /// Probe exactly `indices`, in order, skipping repeats.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty list or an index above `max_index`;
    /// `ScanInProgress` if the session is busy.
    pub fn scan_targeted<'a>(
        &'a self,
        session: &DiscoverySession,
        source: &KeySource,
        chain: ChainKind,
        indices: &[u32],
    ) -> Result<ScanStream<'a>, WalletError> {
        let mut unique = Vec::with_capacity(indices.len());
        for index in indices {
            if !unique.contains(index) {
                unique.push(*index);
            }
        }
        if unique.is_empty() {
            return Err(WalletError::validation("targeted scan needs at least one index"));
        }
        if let Some(index) = unique.iter().find(|i| **i > self.config.max_index) {
            return Err(WalletError::validation(format!(
                "index {index} exceeds max_index {}",
                self.config.max_index
            )));
        }

        let state = TargetedScan {
            _guard: session.begin()?,
            session: session.clone(),
            source: source.clone(),
            chain,
            indices: unique,
            position: 0,
            probed: Vec::new(),
        };
        Ok(stream::unfold(Some(state), move |state| async move {
            let Some(mut state) = state else {
                return None;
            };
            let item = state.step(self).await;
            Some(match item {
                Ok(Step::More(event)) => (Ok(event), Some(state)),
                Ok(Step::Last(event)) => (Ok(event), None),
                Err(err) => (Err(err), None),
            })
        })
        .boxed())
    }

    /// Targeted scan over the configured probe indices.
    pub fn scan_probe_set<'a>(
        &'a self,
        session: &DiscoverySession,
        source: &KeySource,
        chain: ChainKind,
    ) -> Result<ScanStream<'a>, WalletError> {
        self.scan_targeted(session, source, chain, &self.config.probe_indices)
    }

    /// Probe consecutive indices from `start` until `gap_limit` empty
    /// addresses in a row or the index ceiling.
    ///
    /// # Errors
    ///
    /// `Validation` for a zero gap limit, `DiscoveryExhausted` when `start`
    /// is already past the ceiling, `ScanInProgress` if the session is busy.
    pub fn scan_range<'a>(
        &'a self,
        session: &DiscoverySession,
        source: &KeySource,
        chain: ChainKind,
        start: u32,
        gap_limit: u32,
    ) -> Result<ScanStream<'a>, WalletError> {
        if gap_limit == 0 {
            return Err(WalletError::validation("gap_limit must be at least 1"));
        }
        if start > self.config.max_index {
            return Err(WalletError::DiscoveryExhausted {
                first_index: start,
                last_scanned: None,
                ceiling: self.config.max_index,
            });
        }

        let state = RangeScan {
            _guard: session.begin()?,
            session: session.clone(),
            source: source.clone(),
            cursor: RangeCursor::new(chain, start, gap_limit, self.config.max_index),
        };
        Ok(stream::unfold(Some(state), move |state| async move {
            let Some(mut state) = state else {
                return None;
            };
            let item = state.step(self).await;
            Some(match item {
                Ok(Step::More(event)) => (Ok(event), Some(state)),
                Ok(Step::Last(event)) => (Ok(event), None),
                Err(err) => (Err(err), None),
            })
        })
        .boxed())
    }

    /// Repeated range scans of `batch_size` addresses, advancing by
    /// `batch_size`, until one finds funds or the scan is cancelled.
    ///
    /// Cancellation is honoured between rounds only.
    ///
    /// # Errors
    ///
    /// `Validation` for a zero batch size and `ScanInProgress` if the session
    /// is busy. A round that would start past the ceiling ends the stream
    /// with a `DiscoveryExhausted` item.
    pub fn scan_continuous_batches<'a>(
        &'a self,
        session: &DiscoverySession,
        source: &KeySource,
        chain: ChainKind,
        batch_size: u32,
        start: u32,
    ) -> Result<BatchStream<'a>, WalletError> {
        if batch_size == 0 {
            return Err(WalletError::validation("batch_size must be at least 1"));
        }

        let state = BatchScan {
            guard: session.begin()?,
            session: session.clone(),
            source: source.clone(),
            chain,
            batch_size,
            first_index: start,
            rounds: 0,
            last_scanned: None,
            phase: Phase::Start(u64::from(start)),
        };
        Ok(stream::unfold(Some(state), move |state| async move {
            let Some(mut state) = state else {
                return None;
            };
            let item = state.step(self).await;
            Some(match item {
                Ok(Step::More(event)) => (Ok(event), Some(state)),
                Ok(Step::Last(event)) => (Ok(event), None),
                Err(err) => (Err(err), None),
            })
        })
        .boxed())
    }

    /// Lowest unused address of `chain`, deriving and recording the next
    /// index when every known one is used.
    pub async fn next_address(
        &self,
        session: &DiscoverySession,
        source: &KeySource,
        chain: ChainKind,
    ) -> Result<DerivedAddress, WalletError> {
        let _guard = session.begin()?;
        if let Some(entry) = session.read_book(|book| book.first_unused(chain).cloned()) {
            return Ok(entry);
        }

        let index = session.read_book(|book| book.next_index(chain));
        let entry = self.derive_one(source, chain, index).await?;
        session.update_book(|book| book.append(entry.clone()))?;
        info!(chain = %chain, index, "Derived next address");
        Ok(entry)
    }
}

fn progress_of(entry: &DerivedAddress, consecutive_empty: u32, probed: usize) -> ScanProgress {
    ScanProgress {
        index: entry.index,
        chain: entry.chain,
        address: entry.address.clone(),
        balance: entry.balance,
        funded: entry.is_funded(),
        consecutive_empty,
        probed: u32::try_from(probed).unwrap_or(u32::MAX),
    }
}

fn funded_of(entries: &[DerivedAddress]) -> Vec<DerivedAddress> {
    entries.iter().filter(|e| e.is_funded()).cloned().collect()
}

// =============================================================================
// Scan state machines
// =============================================================================

struct TargetedScan {
    _guard: ScanGuard,
    session: DiscoverySession,
    source: KeySource,
    chain: ChainKind,
    indices: Vec<u32>,
    position: usize,
    probed: Vec<DerivedAddress>,
}

impl TargetedScan {
    async fn step<K, B>(&mut self, engine: &DiscoveryEngine<K, B>) -> Result<Step<ScanEvent>, WalletError>
    where
        K: KeyDerivationService,
        B: BalanceLookup,
    {
        if let Some(index) = self.indices.get(self.position).copied() {
            let entry = engine.probe(&self.source, self.chain, index).await?;
            self.position += 1;
            let progress = progress_of(&entry, 0, self.position);
            self.probed.push(entry);
            return Ok(Step::More(ScanEvent::Progress(progress)));
        }

        let found = funded_of(&self.probed);
        if let Some(highest) = found.iter().map(|e| e.index).max() {
            let keep = self
                .probed
                .iter()
                .filter(|e| e.index <= highest)
                .cloned()
                .collect();
            engine.record(&self.session, &self.source, self.chain, keep).await?;
        }

        let range = ScanRange {
            start: self.indices.iter().copied().min().unwrap_or_default(),
            end: self.indices.iter().copied().max().unwrap_or_default(),
        };
        let result = ScanResult::build(self.chain, found, range, Termination::ProbeListExhausted);
        info!(
            chain = %self.chain,
            probed = self.probed.len(),
            funded = result.addresses_found.len(),
            "Targeted scan complete"
        );
        Ok(Step::Last(ScanEvent::Completed(result)))
    }
}

/// Position within one gap-limited range.
struct RangeCursor {
    chain: ChainKind,
    start: u32,
    /// Next index to probe; u64 so stepping past `u32::MAX` cannot wrap.
    next: u64,
    gap_limit: u32,
    ceiling: u32,
    consecutive_empty: u32,
    last_probed: Option<u32>,
    probed: Vec<DerivedAddress>,
}

impl RangeCursor {
    fn new(chain: ChainKind, start: u32, gap_limit: u32, ceiling: u32) -> Self {
        Self {
            chain,
            start,
            next: u64::from(start),
            gap_limit,
            ceiling,
            consecutive_empty: 0,
            last_probed: None,
            probed: Vec::new(),
        }
    }

    fn finished(&self) -> Option<Termination> {
        if self.consecutive_empty >= self.gap_limit {
            Some(Termination::GapLimitReached)
        } else if self.next > u64::from(self.ceiling) {
            Some(Termination::CeilingReached)
        } else {
            None
        }
    }

    async fn advance<K, B>(
        &mut self,
        engine: &DiscoveryEngine<K, B>,
        source: &KeySource,
    ) -> Result<ScanProgress, WalletError>
    where
        K: KeyDerivationService,
        B: BalanceLookup,
    {
        let index = u32::try_from(self.next)
            .map_err(|_| WalletError::validation("scan index out of range"))?;
        let entry = engine.probe(source, self.chain, index).await?;
        self.next += 1;
        self.last_probed = Some(index);
        if entry.is_funded() {
            self.consecutive_empty = 0;
        } else {
            self.consecutive_empty += 1;
        }
        let progress = progress_of(&entry, self.consecutive_empty, self.probed.len() + 1);
        self.probed.push(entry);
        Ok(progress)
    }

    fn range(&self) -> ScanRange {
        ScanRange {
            start: self.start,
            end: self.last_probed.unwrap_or(self.start),
        }
    }

    /// Record what was probed and build the result.
    async fn finish<K, B>(
        &mut self,
        engine: &DiscoveryEngine<K, B>,
        session: &DiscoverySession,
        source: &KeySource,
        termination: Termination,
    ) -> Result<ScanResult, WalletError>
    where
        K: KeyDerivationService,
        B: BalanceLookup,
    {
        let probed = std::mem::take(&mut self.probed);
        let found = funded_of(&probed);
        engine.record(session, source, self.chain, probed).await?;
        Ok(ScanResult::build(self.chain, found, self.range(), termination))
    }
}

struct RangeScan {
    _guard: ScanGuard,
    session: DiscoverySession,
    source: KeySource,
    cursor: RangeCursor,
}

impl RangeScan {
    async fn step<K, B>(&mut self, engine: &DiscoveryEngine<K, B>) -> Result<Step<ScanEvent>, WalletError>
    where
        K: KeyDerivationService,
        B: BalanceLookup,
    {
        match self.cursor.finished() {
            None => {
                let progress = self.cursor.advance(engine, &self.source).await?;
                Ok(Step::More(ScanEvent::Progress(progress)))
            }
            Some(termination) => {
                let result = self
                    .cursor
                    .finish(engine, &self.session, &self.source, termination)
                    .await?;
                info!(
                    chain = %result.chain,
                    range = %result.range_scanned,
                    funded = result.addresses_found.len(),
                    ?termination,
                    "Range scan complete"
                );
                Ok(Step::Last(ScanEvent::Completed(result)))
            }
        }
    }
}

enum Phase {
    /// About to start a round at this index.
    Start(u64),
    Scanning(RangeCursor),
    /// Round finished without funds; next round starts here after the delay.
    Pause(u64),
    Done(ContinuousOutcome),
}

struct BatchScan {
    guard: ScanGuard,
    session: DiscoverySession,
    source: KeySource,
    chain: ChainKind,
    batch_size: u32,
    first_index: u32,
    rounds: u32,
    last_scanned: Option<u32>,
    phase: Phase,
}

impl BatchScan {
    fn scanned(&self) -> Option<ScanRange> {
        self.last_scanned.map(|end| ScanRange {
            start: self.first_index,
            end,
        })
    }

    async fn step<K, B>(&mut self, engine: &DiscoveryEngine<K, B>) -> Result<Step<BatchEvent>, WalletError>
    where
        K: KeyDerivationService,
        B: BalanceLookup,
    {
        let ceiling = engine.config.max_index;
        loop {
            match &mut self.phase {
                Phase::Pause(next) => {
                    let next = *next;
                    let delay = engine.config.batch_delay();
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    self.phase = Phase::Start(next);
                }
                Phase::Start(start) => {
                    let start = *start;
                    if self.guard.is_cancelled() {
                        let resume_index = u32::try_from(start).unwrap_or(u32::MAX);
                        self.session.set_resume_index(resume_index);
                        info!(chain = %self.chain, resume_index, rounds = self.rounds, "Continuous scan cancelled");
                        return Ok(Step::Last(BatchEvent::Finished(ContinuousOutcome {
                            status: ContinuousStatus::Cancelled,
                            resume_index,
                            rounds: self.rounds,
                            found: Vec::new(),
                            range_scanned: self.scanned(),
                        })));
                    }
                    let round_start = match u32::try_from(start) {
                        Ok(index) if index <= ceiling => index,
                        _ => {
                            warn!(
                                chain = %self.chain,
                                first_index = self.first_index,
                                ceiling,
                                "Continuous scan reached the index ceiling"
                            );
                            return Err(WalletError::DiscoveryExhausted {
                                first_index: self.first_index,
                                last_scanned: self.last_scanned,
                                ceiling,
                            });
                        }
                    };
                    self.rounds += 1;
                    self.phase = Phase::Scanning(RangeCursor::new(
                        self.chain,
                        round_start,
                        self.batch_size,
                        ceiling,
                    ));
                    return Ok(Step::More(BatchEvent::RoundStarted {
                        round: self.rounds,
                        start: round_start,
                    }));
                }
                Phase::Scanning(cursor) => {
                    let Some(termination) = cursor.finished() else {
                        let progress = cursor.advance(engine, &self.source).await?;
                        return Ok(Step::More(BatchEvent::Progress(progress)));
                    };
                    let result = cursor
                        .finish(engine, &self.session, &self.source, termination)
                        .await?;
                    let next_start = u64::from(cursor.start) + u64::from(self.batch_size);
                    self.last_scanned = Some(result.range_scanned.end);
                    debug!(
                        round = self.rounds,
                        range = %result.range_scanned,
                        funded = result.addresses_found.len(),
                        "Round finished"
                    );

                    self.phase = match result.first_funded().map(|e| e.index) {
                        Some(resume_index) => {
                            self.session.set_resume_index(resume_index);
                            info!(chain = %self.chain, resume_index, rounds = self.rounds, "Continuous scan found funds");
                            Phase::Done(ContinuousOutcome {
                                status: ContinuousStatus::FundsFound,
                                resume_index,
                                rounds: self.rounds,
                                found: result.addresses_found.clone(),
                                range_scanned: self.scanned(),
                            })
                        }
                        None => Phase::Pause(next_start),
                    };
                    return Ok(Step::More(BatchEvent::RoundFinished {
                        round: self.rounds,
                        result,
                    }));
                }
                Phase::Done(outcome) => {
                    return Ok(Step::Last(BatchEvent::Finished(outcome.clone())));
                }
            }
        }
    }
}

// =============================================================================
// Collectors
// =============================================================================

/// Drain a scan stream and return its result.
pub async fn collect_scan(mut stream: ScanStream<'_>) -> Result<ScanResult, WalletError> {
    while let Some(event) = stream.next().await {
        if let ScanEvent::Completed(result) = event? {
            return Ok(result);
        }
    }
    Err(WalletError::validation("scan ended without a result"))
}

/// Drain a continuous scan and return its outcome.
pub async fn collect_batches(mut stream: BatchStream<'_>) -> Result<ContinuousOutcome, WalletError> {
    while let Some(event) = stream.next().await {
        if let BatchEvent::Finished(outcome) = event? {
            return Ok(outcome);
        }
    }
    Err(WalletError::validation("continuous scan ended without an outcome"))
}
