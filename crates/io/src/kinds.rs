// Operations selected by entity kind at runtime

use serde::Serialize;
use tracing::info;

use legtrack_recon::entity::{Entity, EntityKind};
use legtrack_recon::model::{
    Action, Author, Bill, BillStage, CommitteeMeeting, CommitteeStatus, Companion, MeetingBill, Sponsor, Subject,
    Timestamp, UpcomingMeeting, UpcomingMeetingBill, Version,
};
use legtrack_recon::resolve;

use crate::csv::load_snapshot_csv;
use crate::error::IoError;
use crate::store::SnapshotStore;

/// Run `$body` with `$ty` bound to the record type of `$kind`.
macro_rules! with_entity {
    ($kind:expr, $ty:ident => $body:expr) => {
        match $kind {
            EntityKind::Bills => { type $ty = Bill; $body }
            EntityKind::Authors => { type $ty = Author; $body }
            EntityKind::Sponsors => { type $ty = Sponsor; $body }
            EntityKind::Companions => { type $ty = Companion; $body }
            EntityKind::CommitteeStatus => { type $ty = CommitteeStatus; $body }
            EntityKind::Actions => { type $ty = Action; $body }
            EntityKind::BillStages => { type $ty = BillStage; $body }
            EntityKind::CommitteeMeetingBills => { type $ty = MeetingBill; $body }
            EntityKind::Versions => { type $ty = Version; $body }
            EntityKind::Subjects => { type $ty = Subject; $body }
            EntityKind::CommitteeMeetings => { type $ty = CommitteeMeeting; $body }
            EntityKind::UpcomingMeetings => { type $ty = UpcomingMeeting; $body }
            EntityKind::UpcomingMeetingBills => { type $ty = UpcomingMeetingBill; $body }
        }
    };
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub kind: String,
    /// Scrape cycles applied, oldest first.
    pub cycles: usize,
    pub inserted: usize,
    pub extended: usize,
    pub removed: usize,
    /// Rows imported with their recorded intervals.
    pub imported: usize,
    pub skipped: usize,
}

/// Load a scraper CSV for `kind` and write it into the store.
///
/// Files with interval columns are imported as history; otherwise every distinct
/// observation time is applied as its own scrape cycle.
pub fn ingest_csv(
    store: &mut SnapshotStore,
    kind: EntityKind,
    content: &str,
    delimiter: u8,
    seen_at: Timestamp,
) -> Result<IngestReport, IoError> {
    with_entity!(kind, E => ingest_typed::<E>(store, content, delimiter, seen_at))
}

fn ingest_typed<E: Entity>(
    store: &mut SnapshotStore,
    content: &str,
    delimiter: u8,
    seen_at: Timestamp,
) -> Result<IngestReport, IoError> {
    let batch = load_snapshot_csv::<E>(content, delimiter, seen_at)?;
    let mut report = IngestReport {
        kind: E::KIND.to_string(),
        skipped: batch.skipped,
        ..Default::default()
    };

    if batch.has_intervals {
        report.imported = store.import_history(&batch.rows)?;
    } else {
        for (at, records) in batch.cycles() {
            let stats = store.ingest(&records, at)?;
            report.cycles += 1;
            report.inserted += stats.inserted;
            report.extended += stats.extended;
            report.removed += stats.removed;
        }
    }

    info!(
        kind = %report.kind,
        cycles = report.cycles,
        inserted = report.inserted,
        imported = report.imported,
        skipped = report.skipped,
        "ingested"
    );
    Ok(report)
}

/// Current rows of one kind as JSON, in natural-key order.
pub fn current_json(store: &SnapshotStore, kind: EntityKind, include_history: bool) -> Result<serde_json::Value, IoError> {
    with_entity!(kind, E => current_typed::<E>(store, include_history))
}

fn current_typed<E: Entity>(store: &SnapshotStore, include_history: bool) -> Result<serde_json::Value, IoError> {
    let rows = store.load::<E>()?;
    if include_history {
        return Ok(serde_json::to_value(&rows)?);
    }
    Ok(serde_json::to_value(&resolve(&rows).current)?)
}
