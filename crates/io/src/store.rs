// Snapshot store using SQLite

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info};

use legtrack_recon::differ::diff_snapshot;
use legtrack_recon::entity::{Entity, Refresh};
use legtrack_recon::model::{format_timestamp, parse_timestamp, Snapshot, SnapshotSet, Timestamp};

use crate::error::IoError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,   -- insertion order, the resolver's tie-break
    entity TEXT NOT NULL,
    record_json TEXT NOT NULL,
    first_seen_at TEXT NOT NULL,            -- %Y-%m-%d %H:%M:%S
    last_seen_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_snapshots_record ON snapshots (entity, record_json);

CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Store format version, bumped when the schema changes incompatibly.
pub const STORE_FORMAT_VERSION: u32 = 1;

/// What one ingest did to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub inserted: usize,
    /// Existing rows whose interval was extended.
    pub extended: usize,
    /// Full-replacement rows carried over unchanged.
    pub removed: usize,
}

pub struct SnapshotStore {
    conn: Connection,
}

impl SnapshotStore {
    pub fn open(path: &Path) -> Result<Self, IoError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, IoError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, IoError> {
        conn.execute_batch(SCHEMA)?;
        conn.execute(
            "INSERT OR IGNORE INTO meta (key, value) VALUES (?1, ?2)",
            params!["format_version", STORE_FORMAT_VERSION.to_string()],
        )?;
        Ok(Self { conn })
    }

    /// Every stored row of one kind, in insertion order.
    pub fn load<E: Entity>(&self) -> Result<Vec<Snapshot<E>>, IoError> {
        StoreReader { conn: &self.conn }.load()
    }

    /// A consistent read of every kind.
    pub fn load_all(&mut self) -> Result<SnapshotSet, IoError> {
        let tx = self.conn.transaction()?;
        let set = {
            let reader = StoreReader { conn: &tx };
            reader.load_set()?
        };
        tx.commit()?;
        Ok(set)
    }

    /// Record one scrape cycle's observations of a kind, honoring its refresh mode.
    pub fn ingest<E: Entity>(&mut self, records: &[E], seen_at: Timestamp) -> Result<IngestStats, IoError> {
        match E::KIND.refresh() {
            Refresh::FullReplacement => self.replace_root(records, seen_at),
            Refresh::Append | Refresh::SingleShot => self.append(records, seen_at),
        }
    }

    /// Append observations. Identical records extend their interval; single-shot
    /// kinds always get a fresh row unless the exact observation is already stored.
    pub fn append<E: Entity>(&mut self, records: &[E], seen_at: Timestamp) -> Result<IngestStats, IoError> {
        let refresh = E::KIND.refresh();
        if refresh == Refresh::FullReplacement {
            return Err(IoError::WrongRefresh {
                kind: E::KIND,
                message: "full-replacement kinds are refreshed with replace_root".into(),
            });
        }

        let entity = E::KIND.table_name();
        let stamp = format_timestamp(&seen_at);
        let mut stats = IngestStats::default();

        let tx = self.conn.transaction()?;
        {
            let mut extend = tx.prepare(
                "UPDATE snapshots
                 SET first_seen_at = MIN(first_seen_at, ?3), last_seen_at = MAX(last_seen_at, ?3)
                 WHERE entity = ?1 AND record_json = ?2",
            )?;
            let mut exists_at = tx.prepare(
                "SELECT id FROM snapshots
                 WHERE entity = ?1 AND record_json = ?2 AND first_seen_at = ?3 LIMIT 1",
            )?;
            let mut insert = tx.prepare(
                "INSERT INTO snapshots (entity, record_json, first_seen_at, last_seen_at)
                 VALUES (?1, ?2, ?3, ?3)",
            )?;

            for record in records {
                let json = serde_json::to_string(record)?;
                match refresh {
                    Refresh::SingleShot => {
                        let existing: Option<i64> = exists_at
                            .query_row(params![entity, json, stamp], |row| row.get(0))
                            .optional()?;
                        if existing.is_none() {
                            insert.execute(params![entity, json, stamp])?;
                            stats.inserted += 1;
                        }
                    }
                    _ => {
                        let touched = extend.execute(params![entity, json, stamp])?;
                        if touched == 0 {
                            insert.execute(params![entity, json, stamp])?;
                            stats.inserted += 1;
                        } else {
                            stats.extended += 1;
                        }
                    }
                }
            }
        }
        tx.commit()?;

        debug!(kind = %E::KIND, inserted = stats.inserted, extended = stats.extended, "appended");
        Ok(stats)
    }

    /// Refresh a full-replacement kind: diff this cycle's complete scrape against
    /// the stored rows and rewrite them as new, continuing and removed.
    pub fn replace_root<E: Entity>(&mut self, records: &[E], now: Timestamp) -> Result<IngestStats, IoError> {
        if E::KIND.refresh() != Refresh::FullReplacement {
            return Err(IoError::WrongRefresh {
                kind: E::KIND,
                message: "only full-replacement kinds can be replaced".into(),
            });
        }

        let entity = E::KIND.table_name();
        let tx = self.conn.transaction()?;
        let existing = StoreReader { conn: &tx }.load::<E>()?;
        let diff = diff_snapshot(records, &existing, now);
        let stats = IngestStats {
            inserted: diff.new.len(),
            extended: diff.continuing.len(),
            removed: diff.removed.len(),
        };

        tx.execute("DELETE FROM snapshots WHERE entity = ?1", params![entity])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO snapshots (entity, record_json, first_seen_at, last_seen_at)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for row in diff.into_table() {
                insert.execute(params![
                    entity,
                    serde_json::to_string(&row.record)?,
                    format_timestamp(&row.first_seen_at),
                    format_timestamp(&row.last_seen_at),
                ])?;
            }
        }
        tx.commit()?;

        info!(
            kind = %E::KIND,
            new = stats.inserted,
            continuing = stats.extended,
            removed = stats.removed,
            "replaced"
        );
        Ok(stats)
    }

    /// Insert rows with their recorded intervals as-is (history import).
    pub fn import_history<E: Entity>(&mut self, rows: &[Snapshot<E>]) -> Result<usize, IoError> {
        let entity = E::KIND.table_name();
        let tx = self.conn.transaction()?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO snapshots (entity, record_json, first_seen_at, last_seen_at)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for row in rows {
                insert.execute(params![
                    entity,
                    serde_json::to_string(&row.record)?,
                    format_timestamp(&row.first_seen_at),
                    format_timestamp(&row.last_seen_at),
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// Stored row count per kind, only kinds with rows.
    pub fn counts(&self) -> Result<Vec<(String, usize)>, IoError> {
        let mut stmt = self
            .conn
            .prepare("SELECT entity, COUNT(*) FROM snapshots GROUP BY entity ORDER BY entity")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// Reads inside an open transaction.
struct StoreReader<'c> {
    conn: &'c Connection,
}

impl StoreReader<'_> {
    fn load<E: Entity>(&self) -> Result<Vec<Snapshot<E>>, IoError> {
        let entity = E::KIND.table_name();
        let mut stmt = self.conn.prepare(
            "SELECT id, record_json, first_seen_at, last_seen_at
             FROM snapshots WHERE entity = ?1 ORDER BY id",
        )?;
        let raw = stmt
            .query_map(params![entity], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        decode_rows::<E>(entity, raw)
    }

    fn load_set(&self) -> Result<SnapshotSet, IoError> {
        Ok(SnapshotSet {
            bills: self.load()?,
            authors: self.load()?,
            sponsors: self.load()?,
            companions: self.load()?,
            committee_status: self.load()?,
            actions: self.load()?,
            bill_stages: self.load()?,
            committee_meeting_bills: self.load()?,
            versions: self.load()?,
            subjects: self.load()?,
            committee_meetings: self.load()?,
            upcoming_meetings: self.load()?,
            upcoming_meeting_bills: self.load()?,
        })
    }
}

fn decode_rows<E: Entity>(
    entity: &str,
    raw: Vec<(i64, String, String, String)>,
) -> Result<Vec<Snapshot<E>>, IoError> {
    let ts = |id: i64, value: String| {
        parse_timestamp(&value).ok_or_else(|| IoError::BadTimestamp {
            entity: entity.to_string(),
            id,
            value,
        })
    };
    raw.into_iter()
        .map(|(id, json, first, last)| {
            let record: E = serde_json::from_str(&json)?;
            Ok(Snapshot::new(record, ts(id, first)?, ts(id, last)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use legtrack_recon::model::{Author, Bill, UpcomingMeeting};
    use legtrack_recon::resolve;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

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

    fn author(name: &str) -> Author {
        Author {
            bill_id: "HB1".into(),
            leg_id: "89R".into(),
            author: name.into(),
            author_type: Some("Author".into()),
        }
    }

    #[test]
    fn identical_observations_extend_one_row() {
        let mut store = SnapshotStore::open_in_memory().unwrap();
        store.append(&[author("Smith")], at(1)).unwrap();
        let stats = store.append(&[author("Smith"), author("Jones")], at(2)).unwrap();
        assert_eq!(stats, IngestStats { inserted: 1, extended: 1, removed: 0 });

        let rows = store.load::<Author>().unwrap();
        assert_eq!(
            rows,
            vec![
                Snapshot::new(author("Smith"), at(1), at(2)),
                Snapshot::observed(author("Jones"), at(2)),
            ]
        );
    }

    #[test]
    fn late_backfill_never_shrinks_interval() {
        let mut store = SnapshotStore::open_in_memory().unwrap();
        store.append(&[author("Smith")], at(3)).unwrap();
        store.append(&[author("Smith")], at(1)).unwrap();
        let rows = store.load::<Author>().unwrap();
        assert_eq!(rows, vec![Snapshot::new(author("Smith"), at(1), at(3))]);
    }

    #[test]
    fn single_shot_kinds_insert_per_observation() {
        let meeting = UpcomingMeeting {
            committee: "Finance".into(),
            chamber: Some("S".into()),
            date: "03/10/2025".into(),
            time: Some("9:00 AM".into()),
            location: Some("E1.036".into()),
            chair: None,
            meeting_url: None,
        };
        let mut store = SnapshotStore::open_in_memory().unwrap();
        store.ingest(&[meeting.clone()], at(1)).unwrap();
        store.ingest(&[meeting.clone()], at(1)).unwrap();
        store.ingest(&[meeting.clone()], at(2)).unwrap();
        let rows = store.load::<UpcomingMeeting>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].first_seen_at, at(2));
    }

    #[test]
    fn replace_root_keeps_history() {
        let mut store = SnapshotStore::open_in_memory().unwrap();
        store.ingest(&[bill("HB7", "A"), bill("HB8", "C")], at(1)).unwrap();
        let stats = store.ingest(&[bill("HB7", "B"), bill("HB8", "C")], at(2)).unwrap();
        assert_eq!(stats, IngestStats { inserted: 1, extended: 1, removed: 1 });

        let rows = store.load::<Bill>().unwrap();
        assert_eq!(rows.len(), 3);
        let current = resolve(&rows);
        let hb7 = current
            .current
            .iter()
            .find(|r| r.record.bill_id == "HB7")
            .unwrap();
        assert_eq!(hb7.record.caption.as_deref(), Some("B"));
        assert_eq!(hb7.first_seen_at, at(2));
        let hb8 = current
            .current
            .iter()
            .find(|r| r.record.bill_id == "HB8")
            .unwrap();
        assert_eq!((hb8.first_seen_at, hb8.last_seen_at), (at(1), at(2)));
    }

    #[test]
    fn refresh_mode_is_enforced() {
        let mut store = SnapshotStore::open_in_memory().unwrap();
        assert!(matches!(
            store.append(&[bill("HB1", "x")], at(1)),
            Err(IoError::WrongRefresh { .. })
        ));
        assert!(matches!(
            store.replace_root(&[author("Smith")], at(1)),
            Err(IoError::WrongRefresh { .. })
        ));
    }

    #[test]
    fn file_store_round_trips_all_kinds() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("snapshots.db");
        {
            let mut store = SnapshotStore::open(&path).unwrap();
            store.ingest(&[bill("HB1", "x")], at(1)).unwrap();
            store.ingest(&[author("Smith")], at(1)).unwrap();
        }
        let mut store = SnapshotStore::open(&path).unwrap();
        let set = store.load_all().unwrap();
        assert_eq!(set.bills.len(), 1);
        assert_eq!(set.authors.len(), 1);
        assert!(set.versions.is_empty());
        assert_eq!(
            store.counts().unwrap(),
            vec![("authors".to_string(), 1), ("bills".to_string(), 1)]
        );
    }

    #[test]
    fn history_import_keeps_intervals() {
        let mut store = SnapshotStore::open_in_memory().unwrap();
        let rows = vec![Snapshot::new(author("Smith"), at(1), at(4))];
        assert_eq!(store.import_history(&rows).unwrap(), 1);
        assert_eq!(store.load::<Author>().unwrap(), rows);
    }
}
