use std::ops::Deref;

use chrono::{DateTime, NaiveDateTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Observation timestamp. Scrape clocks are local wall time floored to the minute.
pub type Timestamp = NaiveDateTime;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a stored timestamp. Accepts seconds-less and ISO `T`-separated forms.
pub fn parse_timestamp(value: &str) -> Option<Timestamp> {
    let value = value.trim();
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// The timestamp stamped on every row of one scrape cycle.
pub fn scrape_timestamp<Tz: TimeZone>(now: DateTime<Tz>) -> Timestamp {
    let naive = now.naive_local();
    naive
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(naive)
}

// ---------------------------------------------------------------------------
// Snapshot rows
// ---------------------------------------------------------------------------

/// One observed state of an entity plus its validity interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot<E> {
    pub record: E,
    pub first_seen_at: Timestamp,
    pub last_seen_at: Timestamp,
}

impl<E> Snapshot<E> {
    pub fn new(record: E, first_seen_at: Timestamp, last_seen_at: Timestamp) -> Self {
        Self { record, first_seen_at, last_seen_at }
    }

    /// A row seen exactly once (single-shot kinds, or a brand-new observation).
    pub fn observed(record: E, seen_at: Timestamp) -> Self {
        Self::new(record, seen_at, seen_at)
    }
}

/// Identity of a bill within a legislative session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BillKey {
    pub bill_id: String,
    pub leg_id: String,
}

impl BillKey {
    pub fn new(bill_id: impl Into<String>, leg_id: impl Into<String>) -> Self {
        Self { bill_id: bill_id.into(), leg_id: leg_id.into() }
    }
}

impl std::fmt::Display for BillKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.bill_id, self.leg_id)
    }
}

// ---------------------------------------------------------------------------
// Entity records (raw attributes as scraped)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bill {
    pub bill_id: String,
    pub leg_id: String,
    pub caption: Option<String>,
    pub last_action: Option<String>,
    pub last_action_date: Option<String>,
    pub last_action_chamber: Option<String>,
    pub caption_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Author {
    pub bill_id: String,
    pub leg_id: String,
    pub author: String,
    /// `Author` or `Coauthor`.
    pub author_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sponsor {
    pub bill_id: String,
    pub leg_id: String,
    pub sponsor: String,
    /// `Sponsor` or `cosponsor`.
    pub sponsor_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Companion {
    pub bill_id: String,
    pub leg_id: String,
    pub companion_bill_id: String,
    pub relationship: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitteeStatus {
    pub bill_id: String,
    pub leg_id: String,
    pub chamber: Option<String>,
    pub name: String,
    pub status: Option<String>,
    pub aye_votes: Option<u32>,
    pub nay_votes: Option<u32>,
    pub present_votes: Option<u32>,
    pub absent_votes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    pub bill_id: String,
    pub leg_id: String,
    pub action_number: String,
    pub action_date: Option<String>,
    pub description: Option<String>,
    pub comment: Option<String>,
    pub action_timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub bill_id: String,
    pub leg_id: String,
    /// `Bill`, `Fiscal Note` or `Analysis`.
    #[serde(rename = "type")]
    pub doc_type: String,
    pub text_order: u32,
    pub description: Option<String>,
    pub html_url: Option<String>,
    pub pdf_url: Option<String>,
    pub ftp_html_url: Option<String>,
    pub ftp_pdf_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    pub bill_id: String,
    pub leg_id: String,
    pub subject_title: String,
    pub subject_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BillStage {
    pub bill_id: String,
    pub leg_id: String,
    /// Stage label as scraped, e.g. `Stage 3`.
    pub stage: String,
    pub stage_title: Option<String>,
    pub stage_date: Option<String>,
    /// Box state: `complete`, `failed`, ...
    pub div_class: Option<String>,
    /// Outcome flag from the continuation marker: `pass`, `fail`, ...
    pub after_status: Option<String>,
    pub stage_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitteeMeeting {
    pub committee: String,
    pub chamber: Option<String>,
    pub leg_id: Option<String>,
    pub date: String,
    pub time: Option<String>,
    pub location: Option<String>,
    pub chair: Option<String>,
    pub meeting_url: Option<String>,
    pub hearing_notice_pdf: Option<String>,
    pub minutes_pdf: Option<String>,
    pub witness_list_pdf: Option<String>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UpcomingMeeting {
    pub committee: String,
    pub chamber: Option<String>,
    pub date: String,
    pub time: Option<String>,
    pub location: Option<String>,
    pub chair: Option<String>,
    pub meeting_url: Option<String>,
}

/// A bill scheduled for a committee meeting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeetingBill {
    pub bill_id: String,
    pub leg_id: String,
    pub committee: String,
    pub chamber: Option<String>,
    pub date: String,
    pub time: Option<String>,
    pub meeting_url: Option<String>,
    pub link: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

/// Meeting-bill row from the upcoming-meetings feed, which is stamped once per scrape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpcomingMeetingBill(pub MeetingBill);

impl Deref for UpcomingMeetingBill {
    type Target = MeetingBill;

    fn deref(&self) -> &MeetingBill {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Store contents
// ---------------------------------------------------------------------------

/// Every snapshot row of every entity kind, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct SnapshotSet {
    pub bills: Vec<Snapshot<Bill>>,
    pub authors: Vec<Snapshot<Author>>,
    pub sponsors: Vec<Snapshot<Sponsor>>,
    pub companions: Vec<Snapshot<Companion>>,
    pub committee_status: Vec<Snapshot<CommitteeStatus>>,
    pub actions: Vec<Snapshot<Action>>,
    pub bill_stages: Vec<Snapshot<BillStage>>,
    pub committee_meeting_bills: Vec<Snapshot<MeetingBill>>,
    pub versions: Vec<Snapshot<Version>>,
    pub subjects: Vec<Snapshot<Subject>>,
    pub committee_meetings: Vec<Snapshot<CommitteeMeeting>>,
    pub upcoming_meetings: Vec<Snapshot<UpcomingMeeting>>,
    pub upcoming_meeting_bills: Vec<Snapshot<UpcomingMeetingBill>>,
}
