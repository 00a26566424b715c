//! Composite assembler: one report row per bill in the master roster.

use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{LinkTemplates, TrackerConfig};
use crate::current::CurrentState;
use crate::entity::{BillScoped, Entity};
use crate::error::ReconError;
use crate::lifecycle::{Lifecycle, LifecycleRules};
use crate::model::{
    Action, Author, Bill, BillKey, BillStage, CommitteeStatus, Companion, MeetingBill, Snapshot,
    Sponsor, Subject, Timestamp, Version,
};
use crate::normalize::{
    classify_stage, parse_date_opt, stage_number, BillNumber, BillType, Chamber, MeetingTimeTable,
    StageStatus,
};
use crate::resolve::Resolved;
use crate::roster::{check_all, complete_bill_list, RosterCheck, RosterLimits};
use crate::views::{Cell, Hyperlink};

// ---------------------------------------------------------------------------
// Report row
// ---------------------------------------------------------------------------

/// Display text with an optional target. Without a URL it renders as plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkedText {
    pub label: String,
    pub url: Option<String>,
}

impl LinkedText {
    pub fn new(label: impl Into<String>, url: Option<String>) -> Self {
        Self { label: label.into(), url }
    }

    pub fn cell(&self) -> Cell {
        match self.url {
            Some(ref url) => Cell::Link(Hyperlink {
                label: self.label.clone(),
                url: url.clone(),
            }),
            None => Cell::Text(self.label.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitteeSummary {
    pub name: String,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageSummary {
    pub number: Option<u32>,
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub status: StageStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionRef {
    pub doc_type: String,
    pub text_order: u32,
    pub link: LinkedText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledMeeting {
    pub committee: String,
    pub chamber: Chamber,
    pub at: NaiveDateTime,
    /// Scraped time text, verbatim.
    pub time_display: Option<String>,
    pub location: Option<String>,
    pub link: LinkedText,
}

impl ScheduledMeeting {
    pub fn when(&self) -> String {
        let time = self
            .time_display
            .clone()
            .unwrap_or_else(|| self.at.format("%-I:%M %p").to_string());
        format!("{} {}", self.at.format("%m/%d/%Y"), time)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NextMeetings {
    pub house: Option<ScheduledMeeting>,
    pub senate: Option<ScheduledMeeting>,
    pub joint: Option<ScheduledMeeting>,
}

impl NextMeetings {
    pub fn get(&self, chamber: Chamber) -> Option<&ScheduledMeeting> {
        match chamber {
            Chamber::House => self.house.as_ref(),
            Chamber::Senate => self.senate.as_ref(),
            Chamber::Joint => self.joint.as_ref(),
            Chamber::Unknown => None,
        }
    }

    fn slot(&mut self, chamber: Chamber) -> Option<&mut Option<ScheduledMeeting>> {
        match chamber {
            Chamber::House => Some(&mut self.house),
            Chamber::Senate => Some(&mut self.senate),
            Chamber::Joint => Some(&mut self.joint),
            Chamber::Unknown => None,
        }
    }
}

/// The composite per-bill row. Missing children are `None`, never a dropped row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillReport {
    pub bill_id: String,
    pub leg_id: String,
    pub prefix: String,
    pub number: Option<u64>,
    pub bill_type: Option<BillType>,
    /// False for gap-filled roster entries with no scraped bill row.
    pub scraped: bool,
    pub caption: Option<String>,
    pub authors: Option<LinkedText>,
    pub coauthors: Option<String>,
    pub sponsors: Option<String>,
    pub cosponsors: Option<String>,
    pub subjects: Option<String>,
    pub companions: Option<String>,
    pub last_action: Option<LinkedText>,
    pub last_action_date: Option<NaiveDate>,
    pub last_action_chamber: Option<Chamber>,
    pub house_committee: Option<CommitteeSummary>,
    pub senate_committee: Option<CommitteeSummary>,
    /// Most recent stage for display.
    pub stage: Option<StageSummary>,
    /// Highest-numbered stage.
    pub highest_stage: Option<u32>,
    pub status: Lifecycle,
    pub bill_text: Option<VersionRef>,
    pub fiscal_note: Option<VersionRef>,
    pub analysis: Option<VersionRef>,
    pub next_meetings: NextMeetings,
    pub history: LinkedText,
    pub first_seen_at: Option<Timestamp>,
    pub last_seen_at: Option<Timestamp>,
}

impl BillReport {
    pub fn key(&self) -> BillKey {
        BillKey::new(self.bill_id.clone(), self.leg_id.clone())
    }

    pub fn origin(&self) -> Chamber {
        self.bill_type.map_or(Chamber::Unknown, |t| t.origin)
    }
}

// ---------------------------------------------------------------------------
// Assembler
// ---------------------------------------------------------------------------

pub struct Assembler<'a> {
    rules: &'a LifecycleRules,
    links: &'a LinkTemplates,
    times: MeetingTimeTable,
    delimiter: &'a str,
    exclude_disappeared: bool,
    session: Option<&'a str>,
    limits: &'a RosterLimits,
    now: NaiveDateTime,
}

type ByBill<'s, E> = HashMap<BillKey, Vec<&'s Snapshot<E>>>;

/// Current rows grouped per bill. With `exclude_disappeared`, rows the
/// latest scrape of the kind did not observe are left out.
fn group<E: Entity + BillScoped>(resolved: &Resolved<E>, exclude_disappeared: bool) -> ByBill<'_, E> {
    let latest = resolved.latest_scrape;
    let mut out: ByBill<'_, E> = HashMap::new();
    for row in &resolved.current {
        if exclude_disappeared && latest.is_some_and(|ts| row.last_seen_at < ts) {
            continue;
        }
        out.entry(row.record.bill_key()).or_default().push(row);
    }
    out
}

fn children<'m, 's, E>(map: &'m ByBill<'s, E>, key: &BillKey) -> &'m [&'s Snapshot<E>] {
    map.get(key).map(Vec::as_slice).unwrap_or(&[])
}

struct Grouped<'s> {
    authors: ByBill<'s, Author>,
    sponsors: ByBill<'s, Sponsor>,
    companions: ByBill<'s, Companion>,
    committees: ByBill<'s, CommitteeStatus>,
    actions: ByBill<'s, Action>,
    stages: ByBill<'s, BillStage>,
    versions: ByBill<'s, Version>,
    subjects: ByBill<'s, Subject>,
    meetings: HashMap<BillKey, Vec<&'s MeetingBill>>,
    locations: HashMap<(String, Chamber, String, Option<String>), String>,
}

impl<'a> Assembler<'a> {
    pub fn new(config: &'a TrackerConfig, now: NaiveDateTime) -> Result<Self, ReconError> {
        Ok(Self {
            rules: &config.lifecycle,
            links: &config.links,
            times: config.meeting_time_table()?,
            delimiter: &config.assembly.delimiter,
            exclude_disappeared: config.assembly.exclude_disappeared,
            session: config.session.as_deref(),
            limits: &config.roster,
            now,
        })
    }

    /// Scraped bill keys in scope for this run.
    pub fn scraped_roster(&self, state: &CurrentState) -> Vec<BillKey> {
        state
            .bills
            .current
            .iter()
            .map(|row| row.record.bill_key())
            .filter(|key| self.session.map_or(true, |s| key.leg_id == s))
            .collect()
    }

    /// Contiguity check over the scraped roster, one entry per (session, prefix).
    pub fn check_roster(&self, state: &CurrentState) -> Vec<RosterCheck> {
        check_all(&self.scraped_roster(state), self.limits)
    }

    pub fn assemble(&self, state: &CurrentState) -> Vec<BillReport> {
        let bills: HashMap<BillKey, &Snapshot<Bill>> = state
            .bills
            .current
            .iter()
            .map(|row| (row.record.bill_key(), row))
            .collect();

        let grouped = self.group_children(state);
        let roster = complete_bill_list(&self.scraped_roster(state), self.limits);

        let mut reports: Vec<BillReport> = roster
            .iter()
            .map(|key| self.build(key, bills.get(key).copied(), &grouped))
            .collect();

        reports.sort_by(|a, b| {
            let (ka, kb) = (BillNumber::parse(&a.bill_id), BillNumber::parse(&b.bill_id));
            ka.sort_key()
                .cmp(&kb.sort_key())
                .then_with(|| a.leg_id.cmp(&b.leg_id))
        });

        info!(
            bills = reports.len(),
            gap_filled = reports.iter().filter(|r| !r.scraped).count(),
            "assembled bill reports"
        );
        reports
    }

    fn group_children<'s>(&self, state: &'s CurrentState) -> Grouped<'s> {
        let exclude = self.exclude_disappeared;

        let mut meetings: HashMap<BillKey, Vec<&'s MeetingBill>> = HashMap::new();
        for (key, rows) in group(&state.committee_meeting_bills, exclude) {
            meetings.entry(key).or_default().extend(rows.into_iter().map(|r| &r.record));
        }
        for (key, rows) in group(&state.upcoming_meeting_bills, exclude) {
            meetings.entry(key).or_default().extend(rows.into_iter().map(|r| &r.record.0));
        }

        let mut locations = HashMap::new();
        let committee_meetings = state.committee_meetings.current.iter().map(|r| {
            (&r.record.committee, &r.record.chamber, &r.record.date, &r.record.time, &r.record.location)
        });
        let upcoming = state.upcoming_meetings.current.iter().map(|r| {
            (&r.record.committee, &r.record.chamber, &r.record.date, &r.record.time, &r.record.location)
        });
        // Upcoming-meeting rows come last so their fresher location wins.
        for (committee, chamber, date, time, location) in committee_meetings.chain(upcoming) {
            if let Some(location) = location {
                locations.insert(
                    (
                        committee.clone(),
                        Chamber::from_opt(chamber.as_deref()),
                        date.clone(),
                        time.clone(),
                    ),
                    location.clone(),
                );
            }
        }

        Grouped {
            authors: group(&state.authors, exclude),
            sponsors: group(&state.sponsors, exclude),
            companions: group(&state.companions, exclude),
            committees: group(&state.committee_status, exclude),
            actions: group(&state.actions, exclude),
            stages: group(&state.bill_stages, exclude),
            versions: group(&state.versions, exclude),
            subjects: group(&state.subjects, exclude),
            meetings,
            locations,
        }
    }

    fn build(&self, key: &BillKey, bill: Option<&Snapshot<Bill>>, g: &Grouped<'_>) -> BillReport {
        let number = BillNumber::parse(&key.bill_id);
        let record = bill.map(|b| &b.record);

        let (authors, coauthors) =
            self.split_roles(children(&g.authors, key), |a| (&a.author, &a.author_type), "coauthor");
        let (sponsors, cosponsors) = self.split_roles(
            children(&g.sponsors, key),
            |s| (&s.sponsor, &s.sponsor_type),
            "cosponsor",
        );

        let (last_action, last_action_date, last_action_chamber) =
            last_action(record, children(&g.actions, key));

        let stages = stage_rows(children(&g.stages, key));
        let highest = stages
            .iter()
            .filter_map(|s| s.number.map(|n| (n, s.status)))
            .max_by_key(|(n, _)| *n);
        let status = self.rules.derive(last_action.as_deref(), highest);
        let stage = stages
            .into_iter()
            .max_by_key(|s| (s.date.is_some(), s.date, s.number));

        debug!(bill = %key, status = %status, "assembled");

        BillReport {
            bill_id: key.bill_id.clone(),
            leg_id: key.leg_id.clone(),
            bill_type: BillType::from_prefix(&number.prefix),
            prefix: number.prefix,
            number: number.number,
            scraped: bill.is_some(),
            caption: record.and_then(|b| b.caption.clone()),
            authors: authors.map(|names| {
                LinkedText::new(names, Some(LinkTemplates::render(&self.links.authors, key)))
            }),
            coauthors,
            sponsors,
            cosponsors,
            subjects: self.subjects(children(&g.subjects, key)),
            companions: self.companions(children(&g.companions, key)),
            last_action: last_action.map(|text| {
                LinkedText::new(text, Some(LinkTemplates::render(&self.links.actions, key)))
            }),
            last_action_date,
            last_action_chamber,
            house_committee: committee_for(children(&g.committees, key), Chamber::House),
            senate_committee: committee_for(children(&g.committees, key), Chamber::Senate),
            stage,
            highest_stage: highest.map(|(n, _)| n),
            status,
            bill_text: latest_version(children(&g.versions, key), DocKind::BillText),
            fiscal_note: latest_version(children(&g.versions, key), DocKind::FiscalNote),
            analysis: latest_version(children(&g.versions, key), DocKind::Analysis),
            next_meetings: self.next_meetings(
                g.meetings.get(key).map(Vec::as_slice).unwrap_or(&[]),
                &g.locations,
            ),
            history: LinkedText::new(
                "History",
                Some(LinkTemplates::render(&self.links.history, key)),
            ),
            first_seen_at: bill.map(|b| b.first_seen_at),
            last_seen_at: bill.map(|b| b.last_seen_at),
        }
    }

    fn join<I: IntoIterator<Item = String>>(&self, items: I) -> Option<String> {
        let items: Vec<String> = items.into_iter().collect();
        if items.is_empty() {
            None
        } else {
            Some(items.join(self.delimiter))
        }
    }

    /// Splits people into primary and secondary by role text, each in
    /// order of first appearance then name.
    fn split_roles<E, F>(
        &self,
        rows: &[&Snapshot<E>],
        fields: F,
        secondary: &str,
    ) -> (Option<String>, Option<String>)
    where
        F: Fn(&E) -> (&String, &Option<String>),
    {
        let mut ordered: Vec<(Timestamp, &String, bool)> = rows
            .iter()
            .map(|row| {
                let (name, role) = fields(&row.record);
                let is_secondary = role
                    .as_deref()
                    .is_some_and(|r| r.trim().eq_ignore_ascii_case(secondary));
                (row.first_seen_at, name, is_secondary)
            })
            .collect();
        ordered.sort();

        let primary = ordered.iter().filter(|(_, _, s)| !s).map(|(_, n, _)| (*n).clone());
        let others = ordered.iter().filter(|(_, _, s)| *s).map(|(_, n, _)| (*n).clone());
        (self.join(primary), self.join(others))
    }

    fn subjects(&self, rows: &[&Snapshot<Subject>]) -> Option<String> {
        let mut titles: Vec<String> = rows.iter().map(|r| r.record.subject_title.clone()).collect();
        titles.sort();
        titles.dedup();
        self.join(titles)
    }

    fn companions(&self, rows: &[&Snapshot<Companion>]) -> Option<String> {
        let mut rows: Vec<&Companion> = rows.iter().map(|r| &r.record).collect();
        rows.sort_by(|a, b| {
            BillNumber::parse(&a.companion_bill_id)
                .sort_key()
                .cmp(&BillNumber::parse(&b.companion_bill_id).sort_key())
        });
        self.join(rows.into_iter().map(|c| match c.relationship.as_deref() {
            Some(rel) if !rel.trim().is_empty() => format!("{} ({})", c.companion_bill_id, rel.trim()),
            _ => c.companion_bill_id.clone(),
        }))
    }

    /// Earliest not-yet-started meeting per chamber. Meetings without a
    /// parseable date and time are never eligible.
    fn next_meetings(
        &self,
        rows: &[&MeetingBill],
        locations: &HashMap<(String, Chamber, String, Option<String>), String>,
    ) -> NextMeetings {
        let mut next = NextMeetings::default();
        for row in rows {
            let Some(at) = self.times.meeting_datetime(&row.date, row.time.as_deref()) else {
                continue;
            };
            if at < self.now {
                continue;
            }
            let chamber = Chamber::from_opt(row.chamber.as_deref());
            let Some(slot) = next.slot(chamber) else {
                continue;
            };
            let better = match slot.as_ref() {
                Some(current) => (at, &row.committee) < (current.at, &current.committee),
                None => true,
            };
            if better {
                let location = locations
                    .get(&(row.committee.clone(), chamber, row.date.clone(), row.time.clone()))
                    .cloned();
                *slot = Some(ScheduledMeeting {
                    committee: row.committee.clone(),
                    chamber,
                    at,
                    time_display: self.times.normalize(row.time.as_deref()).display,
                    location,
                    link: LinkedText::new(
                        row.committee.clone(),
                        row.meeting_url.clone().or_else(|| row.link.clone()),
                    ),
                });
            }
        }
        next
    }
}

// ---------------------------------------------------------------------------
// Per-bill selections
// ---------------------------------------------------------------------------

/// The bill row's last action, or the latest action row when the bill row has none.
fn last_action(
    bill: Option<&Bill>,
    actions: &[&Snapshot<Action>],
) -> (Option<String>, Option<NaiveDate>, Option<Chamber>) {
    if let Some(text) = bill.and_then(|b| b.last_action.clone()) {
        let date = bill.and_then(|b| parse_date_opt(b.last_action_date.as_deref()));
        let chamber = bill
            .and_then(|b| b.last_action_chamber.as_deref())
            .map(Chamber::from_code);
        return (Some(text), date, chamber);
    }

    let latest = actions.iter().max_by_key(|row| {
        let a = &row.record;
        (
            parse_date_opt(a.action_date.as_deref()),
            a.action_timestamp.clone(),
            row.first_seen_at,
            BillNumber::parse(&a.action_number).number,
        )
    });
    match latest {
        Some(row) => (
            row.record.description.clone(),
            parse_date_opt(row.record.action_date.as_deref()),
            None,
        ),
        None => (None, None, None),
    }
}

fn stage_rows(rows: &[&Snapshot<BillStage>]) -> Vec<StageSummary> {
    rows.iter()
        .map(|row| {
            let s = &row.record;
            StageSummary {
                number: stage_number(&s.stage),
                title: s.stage_title.clone(),
                date: parse_date_opt(s.stage_date.as_deref()),
                status: classify_stage(s.div_class.as_deref(), s.after_status.as_deref()),
            }
        })
        .collect()
}

/// Most recently referred committee for a chamber.
fn committee_for(rows: &[&Snapshot<CommitteeStatus>], chamber: Chamber) -> Option<CommitteeSummary> {
    rows.iter()
        .filter(|r| Chamber::from_opt(r.record.chamber.as_deref()) == chamber)
        .max_by_key(|r| (r.first_seen_at, Reverse(r.record.name.clone())))
        .map(|r| CommitteeSummary {
            name: r.record.name.clone(),
            status: r.record.status.clone(),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocKind {
    BillText,
    FiscalNote,
    Analysis,
}

impl DocKind {
    fn of(doc_type: &str) -> Option<Self> {
        let t = doc_type.to_ascii_lowercase();
        if t.contains("fiscal") {
            Some(DocKind::FiscalNote)
        } else if t.contains("analysis") {
            Some(DocKind::Analysis)
        } else if t.starts_with("bill") {
            Some(DocKind::BillText)
        } else {
            None
        }
    }
}

/// Highest `text_order` among the bill's versions of one document kind.
fn latest_version(rows: &[&Snapshot<Version>], kind: DocKind) -> Option<VersionRef> {
    let v = rows
        .iter()
        .map(|r| &r.record)
        .filter(|v| DocKind::of(&v.doc_type) == Some(kind))
        .max_by_key(|v| v.text_order)?;

    let label = v
        .description
        .clone()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| format!("{} {}", v.doc_type, v.text_order));
    let url = [&v.pdf_url, &v.html_url, &v.ftp_pdf_url, &v.ftp_html_url]
        .into_iter()
        .find_map(|u| u.clone().filter(|u| !u.trim().is_empty()));

    Some(VersionRef {
        doc_type: v.doc_type.clone(),
        text_order: v.text_order,
        link: LinkedText::new(label, url),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SnapshotSet, UpcomingMeeting, UpcomingMeetingBill};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn config() -> TrackerConfig {
        TrackerConfig::from_toml(r#"name = "test""#).unwrap()
    }

    fn bill(id: &str) -> Bill {
        Bill {
            bill_id: id.into(),
            leg_id: "89R".into(),
            caption: Some(format!("Relating to {id}")),
            last_action: None,
            last_action_date: None,
            last_action_chamber: None,
            caption_version: None,
        }
    }

    fn stage(id: &str, n: u32, date: Option<&str>, div: &str, after: Option<&str>) -> BillStage {
        BillStage {
            bill_id: id.into(),
            leg_id: "89R".into(),
            stage: format!("Stage {n}"),
            stage_title: Some(format!("Title {n}")),
            stage_date: date.map(String::from),
            div_class: Some(div.into()),
            after_status: after.map(String::from),
            stage_text: None,
        }
    }

    fn version(id: &str, doc_type: &str, order: u32) -> Version {
        Version {
            bill_id: id.into(),
            leg_id: "89R".into(),
            doc_type: doc_type.into(),
            text_order: order,
            description: None,
            html_url: Some(format!("https://example.org/{doc_type}/{order}.htm")),
            pdf_url: None,
            ftp_html_url: None,
            ftp_pdf_url: None,
        }
    }

    fn meeting_bill(id: &str, chamber: &str, date: &str, time: Option<&str>) -> MeetingBill {
        MeetingBill {
            bill_id: id.into(),
            leg_id: "89R".into(),
            committee: format!("{chamber} Committee"),
            chamber: Some(chamber.into()),
            date: date.into(),
            time: time.map(String::from),
            meeting_url: Some("https://example.org/meeting".into()),
            link: None,
            author: None,
            description: None,
            status: None,
        }
    }

    fn assemble(set: &SnapshotSet, now: NaiveDateTime) -> Vec<BillReport> {
        let config = config();
        let assembler = Assembler::new(&config, now).unwrap();
        assembler.assemble(&CurrentState::resolve(set))
    }

    #[test]
    fn gap_filled_roster_keeps_every_bill() {
        let set = SnapshotSet {
            bills: vec![
                Snapshot::observed(bill("HB3"), at(1, 6)),
                Snapshot::observed(bill("HB1"), at(1, 6)),
            ],
            ..Default::default()
        };
        let reports = assemble(&set, at(1, 7));
        let ids: Vec<_> = reports.iter().map(|r| r.bill_id.as_str()).collect();
        assert_eq!(ids, vec!["HB1", "HB2", "HB3"]);

        let hb2 = &reports[1];
        assert!(!hb2.scraped);
        assert_eq!(hb2.status, Lifecycle::Unassigned);
        assert_eq!(hb2.caption, None);
        assert_eq!(hb2.authors, None);
        assert!(hb2.history.url.as_deref().unwrap().contains("Bill=HB2"));
    }

    #[test]
    fn version_picks_are_independent_per_type() {
        let set = SnapshotSet {
            bills: vec![Snapshot::observed(bill("HB1"), at(1, 6))],
            versions: vec![
                Snapshot::observed(version("HB1", "Bill", 1), at(1, 6)),
                Snapshot::observed(version("HB1", "Bill", 2), at(1, 6)),
                Snapshot::observed(version("HB1", "Fiscal Note", 1), at(1, 6)),
            ],
            ..Default::default()
        };
        let reports = assemble(&set, at(1, 7));
        let r = &reports[0];
        assert_eq!(r.bill_text.as_ref().map(|v| v.text_order), Some(2));
        assert_eq!(r.fiscal_note.as_ref().map(|v| v.text_order), Some(1));
        assert_eq!(r.analysis, None);
        assert_eq!(r.bill_text.as_ref().unwrap().link.label, "Bill 2");
    }

    #[test]
    fn undated_stage_only_wins_without_dated_ones() {
        let set = SnapshotSet {
            bills: vec![
                Snapshot::observed(bill("HB1"), at(1, 6)),
                Snapshot::observed(bill("HB2"), at(1, 6)),
            ],
            bill_stages: vec![
                Snapshot::observed(stage("HB1", 1, Some("03/01/2025"), "complete", Some("pass")), at(1, 6)),
                Snapshot::observed(stage("HB1", 2, Some("03/05/2025"), "complete", None), at(1, 6)),
                Snapshot::observed(stage("HB1", 3, None, "incomplete", None), at(1, 6)),
                Snapshot::observed(stage("HB2", 1, None, "incomplete", None), at(1, 6)),
            ],
            ..Default::default()
        };
        let reports = assemble(&set, at(1, 7));
        assert_eq!(reports[0].stage.as_ref().and_then(|s| s.number), Some(2));
        assert_eq!(reports[0].highest_stage, Some(3));
        assert_eq!(reports[0].status, Lifecycle::Alive);
        assert_eq!(reports[1].stage.as_ref().and_then(|s| s.number), Some(1));
    }

    #[test]
    fn veto_marker_beats_law() {
        let mut vetoed = bill("HB1");
        vetoed.last_action = Some("06/20/2025 E Vetoed by Governor".into());
        let set = SnapshotSet {
            bills: vec![Snapshot::observed(vetoed, at(1, 6))],
            bill_stages: vec![Snapshot::observed(
                stage("HB1", 7, Some("06/20/2025"), "complete", None),
                at(1, 6),
            )],
            ..Default::default()
        };
        let reports = assemble(&set, at(1, 7));
        assert_eq!(reports[0].status, Lifecycle::Vetoed);
    }

    #[test]
    fn failed_stage_is_dead() {
        let set = SnapshotSet {
            bills: vec![Snapshot::observed(bill("HB1"), at(1, 6))],
            bill_stages: vec![Snapshot::observed(
                stage("HB1", 2, Some("03/05/2025"), "complete", Some("fail")),
                at(1, 6),
            )],
            ..Default::default()
        };
        assert_eq!(assemble(&set, at(1, 7))[0].status, Lifecycle::Dead);
    }

    #[test]
    fn authors_split_by_role_in_order_of_appearance() {
        let author = |name: &str, kind: &str| Author {
            bill_id: "HB1".into(),
            leg_id: "89R".into(),
            author: name.into(),
            author_type: Some(kind.into()),
        };
        let set = SnapshotSet {
            bills: vec![Snapshot::observed(bill("HB1"), at(1, 6))],
            authors: vec![
                Snapshot::new(author("Zapata", "Author"), at(1, 6), at(2, 6)),
                Snapshot::new(author("Lopez", "Coauthor"), at(2, 6), at(2, 6)),
                Snapshot::new(author("Adams", "Coauthor"), at(2, 6), at(2, 6)),
                Snapshot::new(author("Brown", "Author"), at(2, 6), at(2, 6)),
            ],
            ..Default::default()
        };
        let r = &assemble(&set, at(3, 6))[0];
        assert_eq!(r.authors.as_ref().unwrap().label, "Zapata; Brown");
        assert_eq!(r.coauthors.as_deref(), Some("Adams; Lopez"));
    }

    #[test]
    fn last_action_falls_back_to_action_rows() {
        let action = |n: &str, date: &str, text: &str| Action {
            bill_id: "HB1".into(),
            leg_id: "89R".into(),
            action_number: n.into(),
            action_date: Some(date.into()),
            description: Some(text.into()),
            comment: None,
            action_timestamp: None,
        };
        let set = SnapshotSet {
            bills: vec![Snapshot::observed(bill("HB1"), at(1, 6))],
            actions: vec![
                Snapshot::observed(action("H 1", "03/01/2025", "Filed"), at(1, 6)),
                Snapshot::observed(action("H 2", "03/04/2025", "Referred to State Affairs"), at(1, 6)),
            ],
            ..Default::default()
        };
        let r = &assemble(&set, at(1, 7))[0];
        assert_eq!(r.last_action.as_ref().unwrap().label, "Referred to State Affairs");
        assert_eq!(r.last_action_date, NaiveDate::from_ymd_opt(2025, 3, 4));
    }

    #[test]
    fn nearest_future_meeting_per_chamber() {
        let set = SnapshotSet {
            bills: vec![Snapshot::observed(bill("HB1"), at(1, 6))],
            committee_meeting_bills: vec![
                // Already past.
                Snapshot::observed(meeting_bill("HB1", "H", "03/01/2025", Some("8:00 AM")), at(1, 6)),
                Snapshot::observed(meeting_bill("HB1", "H", "03/12/2025", Some("8:00 AM")), at(1, 6)),
                // No time: never eligible.
                Snapshot::observed(meeting_bill("HB1", "S", "03/04/2025", None), at(1, 6)),
            ],
            upcoming_meeting_bills: vec![
                Snapshot::observed(
                    UpcomingMeetingBill(meeting_bill("HB1", "H", "03/10/2025", Some("Upon final adjourn."))),
                    at(1, 6),
                ),
                Snapshot::observed(
                    UpcomingMeetingBill(meeting_bill("HB1", "S", "03/11/2025", Some("9:00 AM"))),
                    at(1, 6),
                ),
            ],
            upcoming_meetings: vec![Snapshot::observed(
                UpcomingMeeting {
                    committee: "H Committee".into(),
                    chamber: Some("H".into()),
                    date: "03/10/2025".into(),
                    time: Some("Upon final adjourn.".into()),
                    location: Some("E2.036".into()),
                    chair: None,
                    meeting_url: None,
                },
                at(1, 6),
            )],
            ..Default::default()
        };
        let r = &assemble(&set, at(2, 0))[0];

        let house = r.next_meetings.house.as_ref().unwrap();
        assert_eq!(house.at, at(10, 12));
        assert_eq!(house.time_display.as_deref(), Some("Upon final adjourn."));
        assert_eq!(house.location.as_deref(), Some("E2.036"));
        assert_eq!(house.when(), "03/10/2025 Upon final adjourn.");

        let senate = r.next_meetings.senate.as_ref().unwrap();
        assert_eq!(senate.at, at(11, 9));
        assert!(r.next_meetings.joint.is_none());
    }

    #[test]
    fn orders_by_number_then_prefix() {
        let set = SnapshotSet {
            bills: ["SB2", "HB2", "SB1", "HB1"]
                .into_iter()
                .map(|id| Snapshot::observed(bill(id), at(1, 6)))
                .collect(),
            ..Default::default()
        };
        let ids: Vec<_> = assemble(&set, at(1, 7))
            .into_iter()
            .map(|r| r.bill_id)
            .collect();
        assert_eq!(ids, vec!["HB1", "SB1", "HB2", "SB2"]);
    }

    #[test]
    fn exclude_disappeared_drops_unobserved_children() {
        let subject = |title: &str, id: &str| Subject {
            bill_id: "HB1".into(),
            leg_id: "89R".into(),
            subject_title: title.into(),
            subject_id: id.into(),
        };
        let set = SnapshotSet {
            bills: vec![Snapshot::observed(bill("HB1"), at(1, 6))],
            subjects: vec![
                Snapshot::new(subject("Water", "I1"), at(1, 6), at(1, 6)),
                Snapshot::new(subject("Roads", "I2"), at(1, 6), at(2, 6)),
            ],
            ..Default::default()
        };

        let kept = assemble(&set, at(3, 0));
        assert_eq!(kept[0].subjects.as_deref(), Some("Roads; Water"));

        let mut config = config();
        config.assembly.exclude_disappeared = true;
        let assembler = Assembler::new(&config, at(3, 0)).unwrap();
        let dropped = assembler.assemble(&CurrentState::resolve(&set));
        assert_eq!(dropped[0].subjects.as_deref(), Some("Roads"));
    }
}
