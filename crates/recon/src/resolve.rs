//! Dedup/presence resolver: read-only projections from snapshot history to current state.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::entity::{Entity, Recency, Strategy};
use crate::model::{Snapshot, Timestamp};

/// Current-state view of one entity kind.
#[derive(Debug, Clone)]
pub struct Resolved<E: Entity> {
    /// One row per natural key, ordered by key.
    pub current: Vec<Snapshot<E>>,
    /// Rows examined after raw duplicates were collapsed.
    pub history_rows: usize,
    /// Newest `last_seen_at` anywhere in the table (the latest scrape touching this kind).
    pub latest_scrape: Option<Timestamp>,
    /// Keys whose high-water mark was shared by more than one distinct record.
    pub ties: usize,
}

impl<E: Entity> Resolved<E> {
    /// Current rows the latest scrape did not observe.
    pub fn disappeared(&self) -> impl Iterator<Item = &Snapshot<E>> {
        let latest = self.latest_scrape;
        self.current
            .iter()
            .filter(move |row| latest.is_some_and(|ts| row.last_seen_at < ts))
    }

    /// Current rows the latest scrape did observe.
    pub fn present(&self) -> impl Iterator<Item = &Snapshot<E>> {
        let latest = self.latest_scrape;
        self.current
            .iter()
            .filter(move |row| latest.map_or(true, |ts| row.last_seen_at >= ts))
    }

    pub fn get(&self, key: &E::Key) -> Option<&Snapshot<E>> {
        self.current
            .binary_search_by(|row| row.record.natural_key().cmp(key))
            .ok()
            .map(|idx| &self.current[idx])
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}

/// Resolve one kind with the strategy it declares.
pub fn resolve<E: Entity>(rows: &[Snapshot<E>]) -> Resolved<E> {
    let collapsed = collapse_duplicates(rows);
    let latest_scrape = collapsed.iter().map(|r| r.last_seen_at).max();

    let (current, ties) = match E::KIND.strategy() {
        Strategy::IntervalPresence => interval_presence(&collapsed),
        Strategy::LatestWins(recency) => (latest_wins(&collapsed, recency), 0),
    };

    debug!(
        kind = %E::KIND,
        raw = rows.len(),
        collapsed = collapsed.len(),
        current = current.len(),
        "resolved current state"
    );

    Resolved {
        current,
        history_rows: collapsed.len(),
        latest_scrape,
        ties,
    }
}

/// Fold rows with identical records into one, spanning the widest interval.
/// Output keeps the position of each record's first occurrence.
pub fn collapse_duplicates<E: Entity>(rows: &[Snapshot<E>]) -> Vec<Snapshot<E>> {
    let mut out: Vec<Snapshot<E>> = Vec::with_capacity(rows.len());
    let mut seen: HashMap<&E, usize> = HashMap::with_capacity(rows.len());

    for row in rows {
        match seen.get(&row.record) {
            Some(&idx) => {
                let kept = &mut out[idx];
                kept.first_seen_at = kept.first_seen_at.min(row.first_seen_at);
                kept.last_seen_at = kept.last_seen_at.max(row.last_seen_at);
            }
            None => {
                seen.insert(&row.record, out.len());
                out.push(row.clone());
            }
        }
    }

    out
}

/// Interval-presence over the full natural key. Returns the current rows and the tie count.
pub fn interval_presence<E: Entity>(rows: &[Snapshot<E>]) -> (Vec<Snapshot<E>>, usize) {
    let mut high_water: BTreeMap<E::Key, Timestamp> = BTreeMap::new();
    for row in rows {
        let hwm = high_water
            .entry(row.record.natural_key())
            .or_insert(row.last_seen_at);
        if row.last_seen_at > *hwm {
            *hwm = row.last_seen_at;
        }
    }

    let mut chosen: BTreeMap<E::Key, &Snapshot<E>> = BTreeMap::new();
    let mut ties = 0;
    for row in rows {
        let key = row.record.natural_key();
        if high_water.get(&key) != Some(&row.last_seen_at) {
            continue;
        }
        match chosen.get(&key) {
            None => {
                chosen.insert(key, row);
            }
            Some(existing) => {
                ties += 1;
                warn!(kind = %E::KIND, key = ?key, "two records share a high-water mark");
                // Later-appearing state wins; insertion order settles the rest.
                if row.first_seen_at > existing.first_seen_at {
                    chosen.insert(key, row);
                }
            }
        }
    }

    (chosen.into_values().cloned().collect(), ties)
}

/// Latest-wins: keep the most recent row per natural key. Ties keep the earliest inserted row.
pub fn latest_wins<E: Entity>(rows: &[Snapshot<E>], recency: Recency) -> Vec<Snapshot<E>> {
    let stamp = |row: &Snapshot<E>| match recency {
        Recency::LastSeen => row.last_seen_at,
        Recency::FirstSeen => row.first_seen_at,
    };

    let mut best: BTreeMap<E::Key, &Snapshot<E>> = BTreeMap::new();
    for row in rows {
        let key = row.record.natural_key();
        match best.get(&key) {
            Some(existing) if stamp(existing) >= stamp(row) => {}
            _ => {
                best.insert(key, row);
            }
        }
    }

    best.into_values().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Author, UpcomingMeeting, Version};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn ts(minute: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
            + chrono::Duration::minutes(minute as i64)
    }

    fn author(bill: &str, name: &str, kind: &str) -> Author {
        Author {
            bill_id: bill.into(),
            leg_id: "89R".into(),
            author: name.into(),
            author_type: Some(kind.into()),
        }
    }

    fn version(bill: &str, order: u32, desc: &str) -> Version {
        Version {
            bill_id: bill.into(),
            leg_id: "89R".into(),
            doc_type: "Bill".into(),
            text_order: order,
            description: Some(desc.into()),
            html_url: None,
            pdf_url: None,
            ftp_html_url: None,
            ftp_pdf_url: None,
        }
    }

    #[test]
    fn older_states_are_not_current() {
        let rows = vec![
            Snapshot::new(author("HB1", "Smith", "Coauthor"), ts(0), ts(10)),
            Snapshot::new(author("HB1", "Smith", "Author"), ts(20), ts(30)),
            Snapshot::new(author("HB1", "Jones", "Author"), ts(0), ts(30)),
        ];
        let resolved = resolve(&rows);
        assert_eq!(resolved.len(), 2);
        let smith = resolved
            .current
            .iter()
            .find(|r| r.record.author == "Smith")
            .unwrap();
        assert_eq!(smith.record.author_type.as_deref(), Some("Author"));
        assert_eq!(resolved.latest_scrape, Some(ts(30)));
        assert_eq!(resolved.disappeared().count(), 0);
    }

    #[test]
    fn raw_duplicates_collapse_to_widest_interval() {
        let a = author("HB1", "Smith", "Author");
        let rows = vec![
            Snapshot::new(a.clone(), ts(10), ts(10)),
            Snapshot::new(a.clone(), ts(0), ts(0)),
            Snapshot::new(a.clone(), ts(20), ts(20)),
        ];
        let collapsed = collapse_duplicates(&rows);
        assert_eq!(collapsed, vec![Snapshot::new(a, ts(0), ts(20))]);
    }

    #[test]
    fn dropped_child_is_reported_as_disappeared() {
        let rows = vec![
            Snapshot::new(author("HB1", "Smith", "Author"), ts(0), ts(10)),
            Snapshot::new(author("HB1", "Jones", "Author"), ts(0), ts(20)),
        ];
        let resolved = resolve(&rows);
        assert_eq!(resolved.len(), 2);
        let gone: Vec<_> = resolved.disappeared().map(|r| r.record.author.as_str()).collect();
        assert_eq!(gone, vec!["Smith"]);
        let here: Vec<_> = resolved.present().map(|r| r.record.author.as_str()).collect();
        assert_eq!(here, vec!["Jones"]);
    }

    #[test]
    fn interval_tie_prefers_later_first_seen() {
        let rows = vec![
            Snapshot::new(author("HB1", "Smith", "Coauthor"), ts(0), ts(30)),
            Snapshot::new(author("HB1", "Smith", "Author"), ts(20), ts(30)),
        ];
        let (current, ties) = interval_presence(&rows);
        assert_eq!(ties, 1);
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].record.author_type.as_deref(), Some("Author"));
    }

    #[test]
    fn latest_wins_ties_keep_insertion_order() {
        let rows = vec![
            Snapshot::new(version("HB1", 1, "Introduced"), ts(0), ts(10)),
            Snapshot::new(version("HB1", 1, "Introduced (corrected)"), ts(5), ts(10)),
        ];
        let current = latest_wins(&rows, Recency::LastSeen);
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].record.description.as_deref(), Some("Introduced"));
    }

    #[test]
    fn single_shot_ranks_by_first_seen() {
        let meeting = |location: &str| UpcomingMeeting {
            committee: "State Affairs".into(),
            chamber: Some("H".into()),
            date: "03/10/2025".into(),
            time: Some("8:00 AM".into()),
            location: Some(location.into()),
            chair: None,
            meeting_url: None,
        };
        let rows = vec![
            Snapshot::observed(meeting("E2.010"), ts(0)),
            Snapshot::observed(meeting("JHR 120"), ts(60)),
        ];
        let resolved = resolve(&rows);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved.current[0].record.location.as_deref(), Some("JHR 120"));
    }

    // High-water mark per coarse group (a whole bill) instead of per natural key.
    fn interval_presence_grouped<E, G, F>(rows: &[Snapshot<E>], group: F) -> Vec<Snapshot<E>>
    where
        E: Entity,
        G: Ord,
        F: Fn(&E) -> G,
    {
        let mut high_water: BTreeMap<G, Timestamp> = BTreeMap::new();
        for row in rows {
            let hwm = high_water.entry(group(&row.record)).or_insert(row.last_seen_at);
            if row.last_seen_at > *hwm {
                *hwm = row.last_seen_at;
            }
        }

        let survivors: Vec<Snapshot<E>> = rows
            .iter()
            .filter(|row| high_water.get(&group(&row.record)) == Some(&row.last_seen_at))
            .cloned()
            .collect();

        interval_presence(&survivors).0
    }

    #[test]
    fn coarse_grouping_drops_live_versions() {
        // Version 1 was last re-observed before version 2 first appeared.
        let rows = vec![
            Snapshot::new(version("HB1", 1, "Introduced"), ts(0), ts(10)),
            Snapshot::new(version("HB1", 2, "Engrossed"), ts(20), ts(20)),
        ];
        let per_bill = interval_presence_grouped(&rows, |v: &Version| v.bill_id.clone());
        assert_eq!(per_bill.len(), 1);
        let (per_key, _) = interval_presence(&rows);
        assert_eq!(per_key.len(), 2);
    }

    #[test]
    fn lookup_by_key() {
        let rows = vec![
            Snapshot::new(author("HB2", "Lee", "Author"), ts(0), ts(0)),
            Snapshot::new(author("HB1", "Smith", "Author"), ts(0), ts(0)),
        ];
        let resolved = resolve(&rows);
        let key = author("HB2", "Lee", "Author").natural_key();
        assert_eq!(resolved.get(&key).unwrap().record.author, "Lee");
    }

    fn arb_rows() -> impl proptest::strategy::Strategy<Value = Vec<Snapshot<Author>>> {
        proptest::collection::vec((0..3usize, 0..3usize, 0..2usize, 0..20u32, 0..10u32), 0..40)
            .prop_map(|items| {
                items
                    .into_iter()
                    .map(|(bill, name, kind, start, len)| {
                        let a = author(
                            ["HB1", "HB2", "SB1"][bill],
                            ["Smith", "Jones", "Lee"][name],
                            ["Author", "Coauthor"][kind],
                        );
                        Snapshot::new(a, ts(start), ts(start + len))
                    })
                    .collect()
            })
    }

    proptest! {
        #[test]
        fn resolving_is_idempotent(rows in arb_rows()) {
            let once = resolve(&rows);
            let twice = resolve(&once.current);
            prop_assert_eq!(&once.current, &twice.current);
            let again = resolve(&rows);
            prop_assert_eq!(&once.current, &again.current);
        }

        #[test]
        fn one_current_row_at_the_high_water_mark(rows in arb_rows()) {
            let resolved = resolve(&rows);
            let mut keys = std::collections::BTreeSet::new();
            for row in &resolved.current {
                let key = row.record.natural_key();
                prop_assert!(keys.insert(key.clone()), "duplicate current key {:?}", key);
                let hwm = rows
                    .iter()
                    .filter(|r| r.record.natural_key() == key)
                    .map(|r| r.last_seen_at)
                    .max()
                    .unwrap();
                prop_assert_eq!(row.last_seen_at, hwm);
            }
            let all_keys: std::collections::BTreeSet<_> =
                rows.iter().map(|r| r.record.natural_key()).collect();
            prop_assert_eq!(keys, all_keys);
        }
    }
}
