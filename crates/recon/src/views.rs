//! Report columns and filtered views over the assembled bill rows.
//!
//! Cells carry structured `(label, url)` hyperlinks; rendering them as
//! formulas or workbook links is left to the sink.

use serde::{Deserialize, Serialize, Serializer};

use crate::assemble::{BillReport, CommitteeSummary, ScheduledMeeting, VersionRef};
use crate::error::ReconError;
use crate::lifecycle::Lifecycle;
use crate::model::format_timestamp;
use crate::normalize::{Chamber, ResolutionKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hyperlink {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Text(String),
    Number(u64),
    Link(Hyperlink),
}

impl Cell {
    fn text(value: Option<impl Into<String>>) -> Self {
        value.map_or(Cell::Empty, |v| Cell::Text(v.into()))
    }

    /// Plain-text rendering; links show their label.
    pub fn display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
            Cell::Link(link) => link.label.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

macro_rules! columns {
    ($($variant:ident => ($id:literal, $header:literal)),* $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Column {
            $($variant),*
        }

        impl Column {
            pub const ALL: &'static [Column] = &[$(Column::$variant),*];

            pub fn id(self) -> &'static str {
                match self {
                    $(Column::$variant => $id),*
                }
            }

            pub fn header(self) -> &'static str {
                match self {
                    $(Column::$variant => $header),*
                }
            }
        }
    };
}

columns! {
    Bill => ("bill_id", "Bill"),
    Session => ("session", "Session"),
    BillType => ("bill_type", "Bill Type"),
    OriginChamber => ("origin_chamber", "Origin Chamber"),
    Caption => ("caption", "Caption"),
    Authors => ("authors", "Authors"),
    Coauthors => ("coauthors", "Coauthors"),
    Sponsors => ("sponsors", "Sponsors"),
    Cosponsors => ("cosponsors", "Cosponsors"),
    Subjects => ("subjects", "Subjects"),
    Companions => ("companions", "Companions"),
    LastAction => ("last_action", "Last Action"),
    LastActionDate => ("last_action_date", "Last Action Date"),
    LastActionChamber => ("last_action_chamber", "Last Action Chamber"),
    HouseCommittee => ("house_committee", "House Committee"),
    HouseCommitteeStatus => ("house_committee_status", "House Committee Status"),
    SenateCommittee => ("senate_committee", "Senate Committee"),
    SenateCommitteeStatus => ("senate_committee_status", "Senate Committee Status"),
    Stage => ("stage", "Stage"),
    StageTitle => ("stage_title", "Stage Title"),
    StageDate => ("stage_date", "Stage Date"),
    Status => ("status", "Status"),
    BillText => ("bill_text", "Bill Text"),
    FiscalNote => ("fiscal_note", "Fiscal Note"),
    Analysis => ("analysis", "Analysis"),
    NextHouseMeeting => ("next_house_meeting", "Next House Meeting"),
    NextHouseMeetingTime => ("next_house_meeting_time", "Next House Meeting Time"),
    NextSenateMeeting => ("next_senate_meeting", "Next Senate Meeting"),
    NextSenateMeetingTime => ("next_senate_meeting_time", "Next Senate Meeting Time"),
    NextJointMeeting => ("next_joint_meeting", "Next Joint Meeting"),
    NextJointMeetingTime => ("next_joint_meeting_time", "Next Joint Meeting Time"),
    History => ("history", "Bill History"),
    FirstSeen => ("first_seen_at", "First Seen"),
    LastSeen => ("last_seen_at", "Last Seen"),
}

impl Serialize for Column {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.header())
    }
}

fn committee_name(c: &Option<CommitteeSummary>) -> Cell {
    Cell::text(c.as_ref().map(|c| c.name.clone()))
}

fn committee_status(c: &Option<CommitteeSummary>) -> Cell {
    Cell::text(c.as_ref().and_then(|c| c.status.clone()))
}

fn version(v: &Option<VersionRef>) -> Cell {
    v.as_ref().map_or(Cell::Empty, |v| v.link.cell())
}

fn meeting(m: Option<&ScheduledMeeting>) -> Cell {
    m.map_or(Cell::Empty, |m| m.link.cell())
}

fn meeting_time(m: Option<&ScheduledMeeting>) -> Cell {
    Cell::text(m.map(ScheduledMeeting::when))
}

fn date(d: Option<chrono::NaiveDate>) -> Cell {
    Cell::text(d.map(|d| d.format("%m/%d/%Y").to_string()))
}

impl Column {
    /// Match by id or header, case-insensitively.
    pub fn lookup(name: &str) -> Option<Column> {
        let name = name.trim();
        Column::ALL
            .iter()
            .copied()
            .find(|c| c.id().eq_ignore_ascii_case(name) || c.header().eq_ignore_ascii_case(name))
    }

    pub fn cell(self, r: &BillReport) -> Cell {
        match self {
            Column::Bill => Cell::Text(r.bill_id.clone()),
            Column::Session => Cell::Text(r.leg_id.clone()),
            Column::BillType => Cell::text(r.bill_type.map(|t| t.label())),
            Column::OriginChamber => Cell::text(r.bill_type.map(|t| t.origin.as_str())),
            Column::Caption => Cell::text(r.caption.clone()),
            Column::Authors => r.authors.as_ref().map_or(Cell::Empty, |a| a.cell()),
            Column::Coauthors => Cell::text(r.coauthors.clone()),
            Column::Sponsors => Cell::text(r.sponsors.clone()),
            Column::Cosponsors => Cell::text(r.cosponsors.clone()),
            Column::Subjects => Cell::text(r.subjects.clone()),
            Column::Companions => Cell::text(r.companions.clone()),
            Column::LastAction => r.last_action.as_ref().map_or(Cell::Empty, |a| a.cell()),
            Column::LastActionDate => date(r.last_action_date),
            Column::LastActionChamber => Cell::text(r.last_action_chamber.map(Chamber::as_str)),
            Column::HouseCommittee => committee_name(&r.house_committee),
            Column::HouseCommitteeStatus => committee_status(&r.house_committee),
            Column::SenateCommittee => committee_name(&r.senate_committee),
            Column::SenateCommitteeStatus => committee_status(&r.senate_committee),
            Column::Stage => r
                .stage
                .as_ref()
                .and_then(|s| s.number)
                .map_or(Cell::Empty, |n| Cell::Number(n.into())),
            Column::StageTitle => Cell::text(r.stage.as_ref().and_then(|s| s.title.clone())),
            Column::StageDate => date(r.stage.as_ref().and_then(|s| s.date)),
            Column::Status => Cell::Text(r.status.as_str().into()),
            Column::BillText => version(&r.bill_text),
            Column::FiscalNote => version(&r.fiscal_note),
            Column::Analysis => version(&r.analysis),
            Column::NextHouseMeeting => meeting(r.next_meetings.get(Chamber::House)),
            Column::NextHouseMeetingTime => meeting_time(r.next_meetings.get(Chamber::House)),
            Column::NextSenateMeeting => meeting(r.next_meetings.get(Chamber::Senate)),
            Column::NextSenateMeetingTime => meeting_time(r.next_meetings.get(Chamber::Senate)),
            Column::NextJointMeeting => meeting(r.next_meetings.get(Chamber::Joint)),
            Column::NextJointMeetingTime => meeting_time(r.next_meetings.get(Chamber::Joint)),
            Column::History => r.history.cell(),
            Column::FirstSeen => Cell::text(r.first_seen_at.as_ref().map(format_timestamp)),
            Column::LastSeen => Cell::text(r.last_seen_at.as_ref().map(format_timestamp)),
        }
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// `[[views]]` entry. Empty filter lists match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSpec {
    pub name: String,
    /// Bill prefixes (`HB`, `SJR`, ...).
    pub prefixes: Vec<String>,
    /// Origin chamber code or name.
    pub chamber: Option<String>,
    pub kinds: Vec<ResolutionKind>,
    /// Highest stage reached must be at least this.
    pub min_stage: Option<u32>,
    pub statuses: Vec<String>,
    pub drop_columns: Vec<String>,
}

impl ViewSpec {
    pub fn all_bills() -> Self {
        Self {
            name: "All Bills".into(),
            ..Default::default()
        }
    }

    pub fn matches(&self, r: &BillReport) -> bool {
        if !self.prefixes.is_empty()
            && !self.prefixes.iter().any(|p| p.eq_ignore_ascii_case(&r.prefix))
        {
            return false;
        }
        if let Some(ref chamber) = self.chamber {
            if r.origin() != Chamber::from_code(chamber) {
                return false;
            }
        }
        if !self.kinds.is_empty() {
            match r.bill_type {
                Some(t) if self.kinds.contains(&t.kind) => {}
                _ => return false,
            }
        }
        if let Some(min) = self.min_stage {
            if r.highest_stage.map_or(true, |n| n < min) {
                return false;
            }
        }
        if !self.statuses.is_empty()
            && !self
                .statuses
                .iter()
                .any(|s| Lifecycle::parse(s) == Some(r.status))
        {
            return false;
        }
        true
    }

    pub fn columns(&self) -> Result<Vec<Column>, ReconError> {
        let mut dropped = Vec::with_capacity(self.drop_columns.len());
        for name in &self.drop_columns {
            let column = Column::lookup(name).ok_or_else(|| ReconError::UnknownColumn {
                view: self.name.clone(),
                column: name.clone(),
            })?;
            dropped.push(column);
        }
        Ok(Column::ALL
            .iter()
            .copied()
            .filter(|c| !dropped.contains(c))
            .collect())
    }
}

/// One rendered view: header plus rows of cells, in report order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportTable {
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
}

impl ReportTable {
    pub fn headers(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.header()).collect()
    }
}

/// File stem for a view name: lowercase ASCII alphanumerics, every other run
/// collapsed to `_`. Names with no alphanumerics map to `view`.
pub fn file_stem(name: &str) -> String {
    let mut stem = String::new();
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            stem.push(ch.to_ascii_lowercase());
        } else if !stem.ends_with('_') {
            stem.push('_');
        }
    }
    match stem.trim_matches('_') {
        "" => "view".to_string(),
        s => s.to_string(),
    }
}

pub fn build_view(spec: &ViewSpec, reports: &[BillReport]) -> Result<ReportTable, ReconError> {
    let columns = spec.columns()?;
    let rows = reports
        .iter()
        .filter(|r| spec.matches(r))
        .map(|r| columns.iter().map(|c| c.cell(r)).collect())
        .collect();
    Ok(ReportTable {
        name: spec.name.clone(),
        columns,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::{LinkedText, NextMeetings};
    use crate::normalize::BillType;
    use pretty_assertions::assert_eq;

    fn report(bill_id: &str, status: Lifecycle, highest_stage: Option<u32>) -> BillReport {
        let number = crate::normalize::BillNumber::parse(bill_id);
        BillReport {
            bill_id: bill_id.into(),
            leg_id: "89R".into(),
            bill_type: BillType::from_prefix(&number.prefix),
            prefix: number.prefix,
            number: number.number,
            scraped: true,
            caption: Some("Relating to water".into()),
            authors: None,
            coauthors: None,
            sponsors: None,
            cosponsors: None,
            subjects: None,
            companions: None,
            last_action: None,
            last_action_date: None,
            last_action_chamber: None,
            house_committee: None,
            senate_committee: None,
            stage: None,
            highest_stage,
            status,
            bill_text: Some(VersionRef {
                doc_type: "Bill".into(),
                text_order: 1,
                link: LinkedText::new("Introduced", Some("https://example.org/hb.pdf".into())),
            }),
            fiscal_note: None,
            analysis: None,
            next_meetings: NextMeetings::default(),
            history: LinkedText::new("History", Some("https://example.org/history".into())),
            first_seen_at: None,
            last_seen_at: None,
        }
    }

    #[test]
    fn links_stay_structured() {
        let r = report("HB1", Lifecycle::Alive, Some(2));
        assert_eq!(
            Column::BillText.cell(&r),
            Cell::Link(Hyperlink {
                label: "Introduced".into(),
                url: "https://example.org/hb.pdf".into(),
            })
        );
        assert_eq!(Column::FiscalNote.cell(&r), Cell::Empty);
        assert_eq!(Column::BillType.cell(&r).display(), "House Bill");
    }

    #[test]
    fn lookup_accepts_id_or_header() {
        assert_eq!(Column::lookup("fiscal_note"), Some(Column::FiscalNote));
        assert_eq!(Column::lookup("bill history"), Some(Column::History));
        assert_eq!(Column::lookup("votes"), None);
    }

    #[test]
    fn view_filters_combine() {
        let reports = vec![
            report("HB1", Lifecycle::Alive, Some(2)),
            report("SB1", Lifecycle::Alive, Some(4)),
            report("SJR1", Lifecycle::Law, Some(7)),
            report("HB2", Lifecycle::Dead, None),
        ];

        let senate = ViewSpec {
            name: "Senate".into(),
            chamber: Some("S".into()),
            ..Default::default()
        };
        assert_eq!(build_view(&senate, &reports).unwrap().rows.len(), 2);

        let joint = ViewSpec {
            name: "Joint".into(),
            kinds: vec![ResolutionKind::Joint],
            ..Default::default()
        };
        assert_eq!(build_view(&joint, &reports).unwrap().rows.len(), 1);

        let advanced = ViewSpec {
            name: "Past committee".into(),
            min_stage: Some(3),
            statuses: vec!["alive".into()],
            ..Default::default()
        };
        let table = build_view(&advanced, &reports).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][0], Cell::Text("SB1".into()));

        let house = ViewSpec {
            name: "House".into(),
            prefixes: vec!["hb".into()],
            drop_columns: vec!["Caption".into(), "first_seen_at".into()],
            ..Default::default()
        };
        let table = build_view(&house, &reports).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.columns.len(), Column::ALL.len() - 2);
        assert!(!table.headers().contains(&"Caption"));
    }

    #[test]
    fn cells_serialize_untagged() {
        let json = serde_json::to_string(&vec![
            Cell::Empty,
            Cell::Number(3),
            Cell::Link(Hyperlink { label: "HB1".into(), url: "https://x".into() }),
        ])
        .unwrap();
        assert_eq!(json, r#"[null,3,{"label":"HB1","url":"https://x"}]"#);
    }
}
