//! Current state of every entity kind, resolved in one pass over the store contents.

use serde::Serialize;

use crate::entity::Entity;
use crate::model::{
    Action, Author, Bill, BillStage, CommitteeMeeting, CommitteeStatus, Companion, MeetingBill,
    SnapshotSet, Sponsor, Subject, UpcomingMeeting, UpcomingMeetingBill, Version,
};
use crate::resolve::{resolve, Resolved};

#[derive(Debug, Clone)]
pub struct CurrentState {
    pub bills: Resolved<Bill>,
    pub authors: Resolved<Author>,
    pub sponsors: Resolved<Sponsor>,
    pub companions: Resolved<Companion>,
    pub committee_status: Resolved<CommitteeStatus>,
    pub actions: Resolved<Action>,
    pub bill_stages: Resolved<BillStage>,
    pub committee_meeting_bills: Resolved<MeetingBill>,
    pub versions: Resolved<Version>,
    pub subjects: Resolved<Subject>,
    pub committee_meetings: Resolved<CommitteeMeeting>,
    pub upcoming_meetings: Resolved<UpcomingMeeting>,
    pub upcoming_meeting_bills: Resolved<UpcomingMeetingBill>,
}

/// Per-kind resolution counts for the run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindPresence {
    pub kind: String,
    pub history_rows: usize,
    pub current: usize,
    pub disappeared: usize,
    pub ties: usize,
}

fn of<E: Entity>(set: &SnapshotSet) -> Resolved<E> {
    resolve(E::rows(set))
}

fn presence<E: Entity>(resolved: &Resolved<E>) -> KindPresence {
    KindPresence {
        kind: E::KIND.to_string(),
        history_rows: resolved.history_rows,
        current: resolved.len(),
        disappeared: resolved.disappeared().count(),
        ties: resolved.ties,
    }
}

impl CurrentState {
    pub fn resolve(set: &SnapshotSet) -> Self {
        Self {
            bills: of(set),
            authors: of(set),
            sponsors: of(set),
            companions: of(set),
            committee_status: of(set),
            actions: of(set),
            bill_stages: of(set),
            committee_meeting_bills: of(set),
            versions: of(set),
            subjects: of(set),
            committee_meetings: of(set),
            upcoming_meetings: of(set),
            upcoming_meeting_bills: of(set),
        }
    }

    /// One entry per kind, in catalogue order.
    pub fn presence(&self) -> Vec<KindPresence> {
        vec![
            presence(&self.bills),
            presence(&self.authors),
            presence(&self.sponsors),
            presence(&self.companions),
            presence(&self.committee_status),
            presence(&self.actions),
            presence(&self.bill_stages),
            presence(&self.committee_meeting_bills),
            presence(&self.versions),
            presence(&self.subjects),
            presence(&self.committee_meetings),
            presence(&self.upcoming_meetings),
            presence(&self.upcoming_meeting_bills),
        ]
    }
}
