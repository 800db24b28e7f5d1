//! Gap interval computation
//!
//! For large candidate ranges the reconciler only probes identifiers that
//! fall between archived runs. Identifiers inside a contiguous archived run
//! are assumed complete and never probed.

use std::collections::BTreeSet;
use std::fmt;

/// Half-open run `[start, end)` of identifiers absent from the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GapInterval {
    pub start: u64,
    pub end: u64,
}

impl GapInterval {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> std::ops::Range<u64> {
        self.start..self.end
    }
}

impl fmt::Display for GapInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end.saturating_sub(1))
    }
}

/// Computes the sorted gap intervals of an archived set against a live maximum
///
/// Interior gaps come from consecutive archived members. The tail interval
/// `[max archived + 1, live_max + 1)` is added when the archive stops short of
/// `live_max`, and the head interval `[1, first)` when the archive does not
/// start at 1. An empty archive yields no intervals.
///
/// # Example
///
/// ```
/// use site_backup::reconcile::{gap_intervals, GapInterval};
/// use std::collections::BTreeSet;
///
/// let archived: BTreeSet<u64> = [1, 2, 5, 100].into_iter().collect();
/// assert_eq!(
///     gap_intervals(&archived, 105),
///     vec![GapInterval::new(3, 5), GapInterval::new(6, 100), GapInterval::new(101, 106)]
/// );
/// ```
pub fn gap_intervals(archived: &BTreeSet<u64>, live_max: u64) -> Vec<GapInterval> {
    let (Some(&first), Some(&last)) = (archived.first(), archived.last()) else {
        return Vec::new();
    };

    let mut gaps: Vec<GapInterval> = archived
        .iter()
        .zip(archived.iter().skip(1))
        .filter(|(low, high)| *high - *low > 1)
        .map(|(low, high)| GapInterval::new(low + 1, *high))
        .collect();

    if last < live_max {
        gaps.push(GapInterval::new(last + 1, live_max.saturating_add(1)));
    }

    if first > 1 {
        gaps.push(GapInterval::new(1, first));
    }

    gaps.sort();
    gaps
}

/// Identifiers the reconciler should probe, and how they were chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidates {
    /// Every identifier in `1..=live_max` missing from the archive
    Exhaustive(Vec<u64>),

    /// Only identifiers inside gap intervals
    GapRestricted(Vec<GapInterval>),
}

impl Candidates {
    /// Chooses the candidate strategy for a live maximum
    ///
    /// Ranges of at most `threshold` identifiers are probed exhaustively.
    pub fn select(archived: &BTreeSet<u64>, live_max: u64, threshold: u64) -> Self {
        if live_max <= threshold {
            Self::Exhaustive(
                (1..=live_max)
                    .filter(|id| !archived.contains(id))
                    .collect(),
            )
        } else {
            Self::GapRestricted(gap_intervals(archived, live_max))
        }
    }

    /// Number of probes this candidate set will issue
    pub fn total(&self) -> u64 {
        match self {
            Self::Exhaustive(ids) => ids.len() as u64,
            Self::GapRestricted(gaps) => gaps.iter().map(GapInterval::len).sum(),
        }
    }
}
