//! Three-way differ for kinds re-scraped as a full replacement set.

use std::collections::{HashMap, HashSet};

use tracing::info;

use crate::entity::Entity;
use crate::model::{Snapshot, Timestamp};
use crate::resolve::{collapse_duplicates, interval_presence};

/// Partition of a fresh scrape against the previously stored rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOutput<E> {
    /// Only in the fresh scrape: `first_seen_at = last_seen_at = now`.
    pub new: Vec<Snapshot<E>>,
    /// Identical record in both: original `first_seen_at`, `last_seen_at = now`.
    pub continuing: Vec<Snapshot<E>>,
    /// Only in the stored rows: kept unchanged as tombstones.
    pub removed: Vec<Snapshot<E>>,
}

impl<E: Entity> DiffOutput<E> {
    /// Rows to store after the refresh, stored order first.
    pub fn into_table(self) -> Vec<Snapshot<E>> {
        let mut table = self.continuing;
        table.extend(self.removed);
        table.extend(self.new);
        table
    }

    /// Current state after the refresh.
    pub fn current(&self) -> Vec<Snapshot<E>> {
        let all: Vec<Snapshot<E>> = self
            .continuing
            .iter()
            .chain(&self.removed)
            .chain(&self.new)
            .cloned()
            .collect();
        interval_presence(&all).0
    }
}

/// Merge `fresh` (this cycle's complete scrape) into `existing` using full-record equality.
pub fn diff_snapshot<E: Entity>(
    fresh: &[E],
    existing: &[Snapshot<E>],
    now: Timestamp,
) -> DiffOutput<E> {
    let existing = collapse_duplicates(existing);
    let fresh_set: HashSet<&E> = fresh.iter().collect();
    let stored: HashMap<&E, &Snapshot<E>> =
        existing.iter().map(|row| (&row.record, row)).collect();

    let mut continuing = Vec::new();
    let mut removed = Vec::new();
    for row in &existing {
        if fresh_set.contains(&row.record) {
            continuing.push(Snapshot::new(row.record.clone(), row.first_seen_at, now));
        } else {
            removed.push(row.clone());
        }
    }

    let mut emitted: HashSet<&E> = HashSet::new();
    let mut new = Vec::new();
    for record in fresh {
        if stored.contains_key(record) || !emitted.insert(record) {
            continue;
        }
        new.push(Snapshot::observed(record.clone(), now));
    }

    info!(
        kind = %E::KIND,
        new = new.len(),
        continuing = continuing.len(),
        removed = removed.len(),
        "full-replacement diff"
    );

    DiffOutput { new, continuing, removed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Bill;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn at(day: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap()
    }

    fn bill(id: &str, caption: &str) -> Bill {
        Bill {
            bill_id: id.into(),
            leg_id: "89R".into(),
            caption: Some(caption.into()),
            last_action: None,
            last_action_date: None,
            last_action_chamber: None,
            caption_version: None,
        }
    }

    #[test]
    fn partitions_by_full_record() {
        let existing = vec![
            Snapshot::new(bill("HB1", "Relating to water"), at(1), at(1)),
            Snapshot::new(bill("HB2", "Relating to roads"), at(1), at(1)),
        ];
        let fresh = vec![bill("HB1", "Relating to water"), bill("HB3", "Relating to taxes")];

        let diff = diff_snapshot(&fresh, &existing, at(2));
        assert_eq!(
            diff.continuing,
            vec![Snapshot::new(bill("HB1", "Relating to water"), at(1), at(2))]
        );
        assert_eq!(diff.new, vec![Snapshot::observed(bill("HB3", "Relating to taxes"), at(2))]);
        assert_eq!(diff.removed, vec![Snapshot::new(bill("HB2", "Relating to roads"), at(1), at(1))]);
    }

    #[test]
    fn changed_caption_is_new_and_old_row_is_tombstoned() {
        let existing = vec![Snapshot::observed(bill("HB7", "A"), at(1))];
        let diff = diff_snapshot(&[bill("HB7", "B")], &existing, at(2));

        assert_eq!(diff.new.len(), 1);
        assert_eq!(diff.removed.len(), 1);
        assert!(diff.continuing.is_empty());

        let current = diff.current();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].record.caption.as_deref(), Some("B"));
        assert_eq!(current[0].first_seen_at, at(2));

        let table = diff.into_table();
        assert_eq!(table.len(), 2);
        assert!(table.iter().any(|r| r.record.caption.as_deref() == Some("A")));
    }

    #[test]
    fn every_record_lands_in_exactly_one_partition() {
        let existing = vec![
            Snapshot::observed(bill("HB1", "a"), at(1)),
            Snapshot::observed(bill("HB2", "b"), at(1)),
            Snapshot::observed(bill("HB3", "c"), at(1)),
        ];
        let fresh = vec![bill("HB2", "b"), bill("HB3", "c2"), bill("HB4", "d"), bill("HB4", "d")];
        let diff = diff_snapshot(&fresh, &existing, at(2));

        let mut seen = HashSet::new();
        for row in diff.new.iter().chain(&diff.continuing).chain(&diff.removed) {
            assert!(seen.insert(row.record.clone()), "{:?} in two partitions", row.record);
        }
        let universe: HashSet<Bill> = existing
            .iter()
            .map(|r| r.record.clone())
            .chain(fresh.iter().cloned())
            .collect();
        assert_eq!(seen, universe);
    }

    #[test]
    fn empty_fresh_scrape_tombstones_everything() {
        let existing = vec![Snapshot::observed(bill("HB1", "a"), at(1))];
        let diff = diff_snapshot(&[], &existing, at(2));
        assert_eq!(diff.removed, existing);
        assert!(diff.new.is_empty());
    }
}
