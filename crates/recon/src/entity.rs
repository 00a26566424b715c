//! Entity kinds, their natural keys, and the dedup strategy each one declares.

use std::fmt::Debug;
use std::hash::Hash;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ReconError;
use crate::model::{
    Action, Author, Bill, BillKey, BillStage, CommitteeMeeting, CommitteeStatus, Companion,
    MeetingBill, Snapshot, SnapshotSet, Sponsor, Subject, UpcomingMeeting, UpcomingMeetingBill,
    Version,
};

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// How "current" is decided for a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Current iff `last_seen_at` equals the per-key high-water mark.
    IntervalPresence,
    /// Rank rows within a key by recency and keep rank 1.
    LatestWins(Recency),
}

/// Which timestamp ranks rows under [`Strategy::LatestWins`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recency {
    LastSeen,
    /// For kinds with no notion of disappearance (single `seen_at`).
    FirstSeen,
}

/// How a scrape cycle writes a kind into the snapshot store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// Whole table re-scraped and merged with the three-way differ.
    FullReplacement,
    /// Identical observations extend `last_seen_at`; new ones are inserted.
    Append,
    /// Every observation is a new row stamped with a single `seen_at`.
    SingleShot,
}

// ---------------------------------------------------------------------------
// EntityKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Bills,
    Authors,
    Sponsors,
    Companions,
    CommitteeStatus,
    Actions,
    BillStages,
    CommitteeMeetingBills,
    Versions,
    Subjects,
    CommitteeMeetings,
    UpcomingMeetings,
    UpcomingMeetingBills,
}

impl EntityKind {
    pub const ALL: [EntityKind; 13] = [
        Self::Bills,
        Self::Authors,
        Self::Sponsors,
        Self::Companions,
        Self::CommitteeStatus,
        Self::Actions,
        Self::BillStages,
        Self::CommitteeMeetingBills,
        Self::Versions,
        Self::Subjects,
        Self::CommitteeMeetings,
        Self::UpcomingMeetings,
        Self::UpcomingMeetingBills,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            Self::Bills => "bills",
            Self::Authors => "authors",
            Self::Sponsors => "sponsors",
            Self::Companions => "companions",
            Self::CommitteeStatus => "committee_status",
            Self::Actions => "actions",
            Self::BillStages => "bill_stages",
            Self::CommitteeMeetingBills => "committee_meeting_bills",
            Self::Versions => "versions",
            Self::Subjects => "subjects",
            Self::CommitteeMeetings => "committee_meetings",
            Self::UpcomingMeetings => "upcoming_meetings",
            Self::UpcomingMeetingBills => "upcoming_meeting_bills",
        }
    }

    pub fn strategy(self) -> Strategy {
        match self {
            Self::Bills
            | Self::Authors
            | Self::Sponsors
            | Self::Companions
            | Self::CommitteeStatus
            | Self::Actions
            | Self::BillStages
            | Self::CommitteeMeetingBills => Strategy::IntervalPresence,
            Self::Versions | Self::Subjects | Self::CommitteeMeetings => {
                Strategy::LatestWins(Recency::LastSeen)
            }
            Self::UpcomingMeetings | Self::UpcomingMeetingBills => {
                Strategy::LatestWins(Recency::FirstSeen)
            }
        }
    }

    pub fn refresh(self) -> Refresh {
        match self {
            Self::Bills => Refresh::FullReplacement,
            Self::UpcomingMeetings | Self::UpcomingMeetingBills => Refresh::SingleShot,
            _ => Refresh::Append,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table_name())
    }
}

impl FromStr for EntityKind {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|k| k.table_name() == wanted)
            .ok_or_else(|| ReconError::UnknownEntity(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Entity trait
// ---------------------------------------------------------------------------

/// A snapshot-tracked record type. Full-record equality is the attribute-tuple
/// equality used by dedup and by the three-way differ.
pub trait Entity: Clone + Eq + Hash + Debug + Serialize + DeserializeOwned {
    type Key: Clone + Eq + Hash + Ord + Debug;

    const KIND: EntityKind;

    fn natural_key(&self) -> Self::Key;

    /// This kind's rows inside a [`SnapshotSet`].
    fn rows(set: &SnapshotSet) -> &[Snapshot<Self>];
}

/// Records that belong to one bill.
pub trait BillScoped {
    fn bill_key(&self) -> BillKey;
}

macro_rules! bill_scoped {
    ($($ty:ty),* $(,)?) => {
        $(
            impl BillScoped for $ty {
                fn bill_key(&self) -> BillKey {
                    BillKey::new(self.bill_id.clone(), self.leg_id.clone())
                }
            }
        )*
    };
}

bill_scoped!(Bill, Author, Sponsor, Companion, CommitteeStatus, Action, BillStage, MeetingBill, Version, Subject);

impl BillScoped for UpcomingMeetingBill {
    fn bill_key(&self) -> BillKey {
        self.0.bill_key()
    }
}

impl Entity for Bill {
    type Key = BillKey;
    const KIND: EntityKind = EntityKind::Bills;

    fn natural_key(&self) -> BillKey {
        self.bill_key()
    }

    fn rows(set: &SnapshotSet) -> &[Snapshot<Self>] {
        &set.bills
    }
}

impl Entity for Author {
    type Key = (BillKey, String);
    const KIND: EntityKind = EntityKind::Authors;

    fn natural_key(&self) -> Self::Key {
        (self.bill_key(), self.author.clone())
    }

    fn rows(set: &SnapshotSet) -> &[Snapshot<Self>] {
        &set.authors
    }
}

impl Entity for Sponsor {
    type Key = (BillKey, String);
    const KIND: EntityKind = EntityKind::Sponsors;

    fn natural_key(&self) -> Self::Key {
        (self.bill_key(), self.sponsor.clone())
    }

    fn rows(set: &SnapshotSet) -> &[Snapshot<Self>] {
        &set.sponsors
    }
}

impl Entity for Companion {
    type Key = (BillKey, String);
    const KIND: EntityKind = EntityKind::Companions;

    fn natural_key(&self) -> Self::Key {
        (self.bill_key(), self.companion_bill_id.clone())
    }

    fn rows(set: &SnapshotSet) -> &[Snapshot<Self>] {
        &set.companions
    }
}

impl Entity for CommitteeStatus {
    type Key = (BillKey, String, Option<String>);
    const KIND: EntityKind = EntityKind::CommitteeStatus;

    fn natural_key(&self) -> Self::Key {
        (self.bill_key(), self.name.clone(), self.chamber.clone())
    }

    fn rows(set: &SnapshotSet) -> &[Snapshot<Self>] {
        &set.committee_status
    }
}

impl Entity for Action {
    type Key = (BillKey, String);
    const KIND: EntityKind = EntityKind::Actions;

    fn natural_key(&self) -> Self::Key {
        (self.bill_key(), self.action_number.clone())
    }

    fn rows(set: &SnapshotSet) -> &[Snapshot<Self>] {
        &set.actions
    }
}

impl Entity for BillStage {
    type Key = (BillKey, String);
    const KIND: EntityKind = EntityKind::BillStages;

    fn natural_key(&self) -> Self::Key {
        (self.bill_key(), self.stage.clone())
    }

    fn rows(set: &SnapshotSet) -> &[Snapshot<Self>] {
        &set.bill_stages
    }
}

impl Entity for MeetingBill {
    type Key = (BillKey, String, Option<String>, String, Option<String>);
    const KIND: EntityKind = EntityKind::CommitteeMeetingBills;

    fn natural_key(&self) -> Self::Key {
        (
            self.bill_key(),
            self.committee.clone(),
            self.chamber.clone(),
            self.date.clone(),
            self.time.clone(),
        )
    }

    fn rows(set: &SnapshotSet) -> &[Snapshot<Self>] {
        &set.committee_meeting_bills
    }
}

impl Entity for Version {
    type Key = (BillKey, String, u32);
    const KIND: EntityKind = EntityKind::Versions;

    fn natural_key(&self) -> Self::Key {
        (self.bill_key(), self.doc_type.clone(), self.text_order)
    }

    fn rows(set: &SnapshotSet) -> &[Snapshot<Self>] {
        &set.versions
    }
}

impl Entity for Subject {
    type Key = (BillKey, String);
    const KIND: EntityKind = EntityKind::Subjects;

    fn natural_key(&self) -> Self::Key {
        (self.bill_key(), self.subject_id.clone())
    }

    fn rows(set: &SnapshotSet) -> &[Snapshot<Self>] {
        &set.subjects
    }
}

impl Entity for CommitteeMeeting {
    type Key = (String, Option<String>, String, Option<String>);
    const KIND: EntityKind = EntityKind::CommitteeMeetings;

    fn natural_key(&self) -> Self::Key {
        (self.committee.clone(), self.chamber.clone(), self.date.clone(), self.time.clone())
    }

    fn rows(set: &SnapshotSet) -> &[Snapshot<Self>] {
        &set.committee_meetings
    }
}

impl Entity for UpcomingMeeting {
    type Key = (String, Option<String>, String, Option<String>);
    const KIND: EntityKind = EntityKind::UpcomingMeetings;

    fn natural_key(&self) -> Self::Key {
        (self.committee.clone(), self.chamber.clone(), self.date.clone(), self.time.clone())
    }

    fn rows(set: &SnapshotSet) -> &[Snapshot<Self>] {
        &set.upcoming_meetings
    }
}

impl Entity for UpcomingMeetingBill {
    type Key = (BillKey, String, Option<String>, String, Option<String>, Option<String>);
    const KIND: EntityKind = EntityKind::UpcomingMeetingBills;

    fn natural_key(&self) -> Self::Key {
        (
            self.bill_key(),
            self.committee.clone(),
            self.chamber.clone(),
            self.date.clone(),
            self.time.clone(),
            self.meeting_url.clone(),
        )
    }

    fn rows(set: &SnapshotSet) -> &[Snapshot<Self>] {
        &set.upcoming_meeting_bills
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.table_name().parse::<EntityKind>().unwrap(), kind);
        }
        assert_eq!("committee-status".parse::<EntityKind>().unwrap(), EntityKind::CommitteeStatus);
        assert!("amendments".parse::<EntityKind>().is_err());
    }

    #[test]
    fn strategies_follow_disappearance_semantics() {
        assert_eq!(EntityKind::Bills.strategy(), Strategy::IntervalPresence);
        assert_eq!(EntityKind::BillStages.strategy(), Strategy::IntervalPresence);
        assert_eq!(EntityKind::Versions.strategy(), Strategy::LatestWins(Recency::LastSeen));
        assert_eq!(
            EntityKind::UpcomingMeetings.strategy(),
            Strategy::LatestWins(Recency::FirstSeen)
        );
        assert_eq!(EntityKind::Bills.refresh(), Refresh::FullReplacement);
        assert_eq!(EntityKind::UpcomingMeetingBills.refresh(), Refresh::SingleShot);
        assert_eq!(EntityKind::Authors.refresh(), Refresh::Append);
    }

    #[test]
    fn version_key_separates_doc_types() {
        let v = |doc_type: &str, order| Version {
            bill_id: "HB1".into(),
            leg_id: "89R".into(),
            doc_type: doc_type.into(),
            text_order: order,
            description: None,
            html_url: None,
            pdf_url: None,
            ftp_html_url: None,
            ftp_pdf_url: None,
        };
        assert_ne!(v("Bill", 1).natural_key(), v("Fiscal Note", 1).natural_key());
        assert_ne!(v("Bill", 1).natural_key(), v("Bill", 2).natural_key());
    }
}
