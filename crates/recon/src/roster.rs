//! Roster contiguity: per session and bill prefix, numbers must run 1..=n with
//! no gaps and no duplicates.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::BillKey;
use crate::normalize::BillNumber;

/// Bill numbers above this are treated as scrape defects, not roster members.
pub const DEFAULT_MAX_BILL_NUMBER: u64 = 20_000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RosterLimits {
    pub max_bill_number: u64,
}

impl Default for RosterLimits {
    fn default() -> Self {
        Self { max_bill_number: DEFAULT_MAX_BILL_NUMBER }
    }
}

/// Inclusive run of missing bill numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GapRange {
    pub first: u64,
    pub last: u64,
}

impl GapRange {
    pub fn count(&self) -> u64 {
        self.last - self.first + 1
    }
}

impl fmt::Display for GapRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.first == self.last {
            write!(f, "{}", self.first)
        } else {
            write!(f, "{}-{}", self.first, self.last)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterCheck {
    pub session: String,
    pub prefix: String,
    pub bills: usize,
    /// Highest number within `max_bill_number`.
    pub highest: Option<u64>,
    /// Missing runs between 1 and `highest`.
    pub gaps: Vec<GapRange>,
    /// Count of missing numbers across `gaps`.
    pub missing: u64,
    /// Numbers that appear more than once.
    pub duplicates: Vec<u64>,
    /// Numbers above `max_bill_number`; never gap-filled.
    pub out_of_range: Vec<u64>,
}

impl RosterCheck {
    pub fn passed(&self) -> bool {
        self.gaps.is_empty() && self.duplicates.is_empty() && self.out_of_range.is_empty()
    }
}

/// Missing runs in 1..=max of `seen`, in order. Linear in `seen`.
fn gap_ranges(seen: &BTreeSet<u64>) -> Vec<GapRange> {
    let mut gaps = Vec::new();
    let mut next = 1;
    for &n in seen {
        if n > next {
            gaps.push(GapRange { first: next, last: n - 1 });
        }
        next = n + 1;
    }
    gaps
}

/// Check one chamber prefix in one session. Ids without a number are ignored.
pub fn check_roster<'a>(
    session: &str,
    prefix: &str,
    bill_ids: impl IntoIterator<Item = &'a str>,
    limits: &RosterLimits,
) -> RosterCheck {
    let mut seen: BTreeSet<u64> = BTreeSet::new();
    let mut duplicates: BTreeSet<u64> = BTreeSet::new();
    let mut out_of_range: BTreeSet<u64> = BTreeSet::new();
    let mut bills = 0;

    for id in bill_ids {
        let parsed = BillNumber::parse(id);
        let Some(number) = parsed.number else {
            continue;
        };
        bills += 1;
        if number == 0 || number > limits.max_bill_number {
            out_of_range.insert(number);
            continue;
        }
        if !seen.insert(number) {
            duplicates.insert(number);
        }
    }

    let gaps = gap_ranges(&seen);
    let check = RosterCheck {
        session: session.to_string(),
        prefix: prefix.to_string(),
        bills,
        highest: seen.iter().next_back().copied(),
        missing: gaps.iter().map(GapRange::count).sum(),
        gaps,
        duplicates: duplicates.into_iter().collect(),
        out_of_range: out_of_range.into_iter().collect(),
    };
    if !check.passed() {
        warn!(
            session,
            prefix,
            missing = check.missing,
            duplicates = check.duplicates.len(),
            out_of_range = check.out_of_range.len(),
            "roster is not contiguous"
        );
    }
    check
}

/// Check every (session, prefix) group present in `bills`.
pub fn check_all(bills: &[BillKey], limits: &RosterLimits) -> Vec<RosterCheck> {
    let mut groups: BTreeMap<(String, String), Vec<&str>> = BTreeMap::new();
    for key in bills {
        let prefix = BillNumber::parse(&key.bill_id).prefix;
        groups
            .entry((key.leg_id.clone(), prefix))
            .or_default()
            .push(key.bill_id.as_str());
    }
    groups
        .into_iter()
        .map(|((session, prefix), ids)| check_roster(&session, &prefix, ids, limits))
        .collect()
}

/// The master bill list: every scraped bill plus every missing number from 1
/// to the highest in-range scraped number of its (session, prefix). Sorted by key.
pub fn complete_bill_list(bills: &[BillKey], limits: &RosterLimits) -> Vec<BillKey> {
    let mut out: BTreeSet<BillKey> = bills.iter().cloned().collect();
    let mut present: BTreeMap<(String, String), BTreeSet<u64>> = BTreeMap::new();
    for key in bills {
        let parsed = BillNumber::parse(&key.bill_id);
        match parsed.number {
            Some(n) if n <= limits.max_bill_number => {
                present.entry((key.leg_id.clone(), parsed.prefix)).or_default().insert(n);
            }
            _ => {}
        }
    }

    for ((session, prefix), seen) in present {
        if prefix.is_empty() {
            continue;
        }
        for gap in gap_ranges(&seen) {
            for n in gap.first..=gap.last {
                out.insert(BillKey::new(format!("{prefix}{n}"), session.clone()));
            }
        }
    }
    out.into_iter().collect()
}
