use std::collections::BTreeMap;

use serde::Serialize;

use crate::assemble::BillReport;
use crate::current::KindPresence;
use crate::roster::RosterCheck;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total_bills: usize,
    pub scraped_bills: usize,
    pub gap_filled: usize,
    pub status_counts: BTreeMap<String, usize>,
    pub roster_checks: usize,
    pub roster_failures: usize,
    pub disappeared_rows: usize,
    pub high_water_ties: usize,
}

/// Compute summary statistics from an assembled run.
pub fn compute_summary(
    reports: &[BillReport],
    roster: &[RosterCheck],
    presence: &[KindPresence],
) -> RunSummary {
    let mut status_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut scraped = 0;
    for r in reports {
        *status_counts.entry(r.status.to_string()).or_insert(0) += 1;
        if r.scraped {
            scraped += 1;
        }
    }

    RunSummary {
        total_bills: reports.len(),
        scraped_bills: scraped,
        gap_filled: reports.len() - scraped,
        status_counts,
        roster_checks: roster.len(),
        roster_failures: roster.iter().filter(|c| !c.passed()).count(),
        disappeared_rows: presence.iter().map(|p| p.disappeared).sum(),
        high_water_ties: presence.iter().map(|p| p.ties).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::{check_roster, RosterLimits};

    fn presence(kind: &str, disappeared: usize, ties: usize) -> KindPresence {
        KindPresence {
            kind: kind.into(),
            history_rows: 10,
            current: 5,
            disappeared,
            ties,
        }
    }

    #[test]
    fn summary_counts() {
        let roster = vec![
            check_roster("89R", "HB", ["HB1", "HB2"], &RosterLimits::default()),
            check_roster("89R", "SB", ["SB2"], &RosterLimits::default()),
        ];
        let presence = vec![presence("authors", 2, 1), presence("versions", 1, 0)];
        let summary = compute_summary(&[], &roster, &presence);
        assert_eq!(summary.total_bills, 0);
        assert_eq!(summary.roster_checks, 2);
        assert_eq!(summary.roster_failures, 1);
        assert_eq!(summary.disappeared_rows, 3);
        assert_eq!(summary.high_water_ties, 1);
        assert!(summary.status_counts.is_empty());
    }
}
