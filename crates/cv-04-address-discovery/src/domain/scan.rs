//! # Scan Results and Progress Events
//!
//! Scans produce a finite stream of events that the caller pulls. A range or
//! targeted scan ends with exactly one `Completed`; a continuous scan ends
//! with exactly one `Finished` (or an error item).

use shared_types::{ChainKind, DerivedAddress, U256};
use std::fmt;

/// Inclusive index range actually probed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanRange {
    pub start: u32,
    pub end: u32,
}

impl fmt::Display for ScanRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Why a scan stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// `gap_limit` consecutive empty addresses seen.
    GapLimitReached,
    /// The configured index ceiling was passed.
    CeilingReached,
    /// Every index of a targeted probe was checked.
    ProbeListExhausted,
}

/// Outcome of one scan call. "Nothing found" is `success == false`, not an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanResult {
    /// True if at least one funded address was found.
    pub success: bool,
    /// Funded addresses, lowest index first.
    pub addresses_found: Vec<DerivedAddress>,
    /// Indices probed.
    pub range_scanned: ScanRange,
    /// Human-readable summary suitable for a "scan next range" prompt.
    pub message: String,
    pub termination: Termination,
    pub chain: ChainKind,
}

impl ScanResult {
    /// Lowest-index funded address.
    pub fn first_funded(&self) -> Option<&DerivedAddress> {
        self.addresses_found.first()
    }

    pub fn total_balance(&self) -> U256 {
        self.addresses_found
            .iter()
            .fold(U256::zero(), |acc, a| acc.saturating_add(a.balance))
    }

    pub(crate) fn build(
        chain: ChainKind,
        mut found: Vec<DerivedAddress>,
        range_scanned: ScanRange,
        termination: Termination,
    ) -> Self {
        found.sort_by_key(|a| a.index);
        let message = match found.len() {
            0 => format!("No funded {chain} addresses in indices {range_scanned}"),
            1 => format!(
                "Found 1 funded {chain} address in indices {range_scanned} (index {})",
                found[0].index
            ),
            n => format!(
                "Found {n} funded {chain} addresses in indices {range_scanned} (first at index {})",
                found[0].index
            ),
        };
        Self {
            success: !found.is_empty(),
            addresses_found: found,
            range_scanned,
            message,
            termination,
            chain,
        }
    }
}

/// One probed address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanProgress {
    pub index: u32,
    pub chain: ChainKind,
    pub address: String,
    pub balance: U256,
    pub funded: bool,
    /// Consecutive empty addresses so far (range scans); 0 for targeted probes.
    pub consecutive_empty: u32,
    /// Addresses probed so far in this scan.
    pub probed: u32,
}

/// Event of a range or targeted scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanEvent {
    Progress(ScanProgress),
    Completed(ScanResult),
}

/// How a continuous scan ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContinuousStatus {
    /// A round found funds.
    FundsFound,
    /// Cancelled between rounds.
    Cancelled,
}

/// Terminal report of a continuous scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContinuousOutcome {
    pub status: ContinuousStatus,
    /// Lowest funded index when funds were found, else the next round's start.
    pub resume_index: u32,
    /// Rounds completed.
    pub rounds: u32,
    /// Funded addresses of the final round, lowest index first.
    pub found: Vec<DerivedAddress>,
    /// Indices probed across all rounds, if any round ran.
    pub range_scanned: Option<ScanRange>,
}

/// Event of a continuous batch scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchEvent {
    RoundStarted { round: u32, start: u32 },
    Progress(ScanProgress),
    RoundFinished { round: u32, result: ScanResult },
    Finished(ContinuousOutcome),
}
