//! Derived-field normalizer. Pure functions; malformed input maps to `None` or
//! [`Chamber::Unknown`], never to an error.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::BillKey;

// ---------------------------------------------------------------------------
// Chamber
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Chamber {
    House,
    Senate,
    Joint,
    Unknown,
}

impl Chamber {
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "h" | "house" => Chamber::House,
            "s" | "senate" => Chamber::Senate,
            "j" | "joint" => Chamber::Joint,
            _ => Chamber::Unknown,
        }
    }

    pub fn from_opt(code: Option<&str>) -> Self {
        code.map_or(Chamber::Unknown, Self::from_code)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Chamber::House => "House",
            Chamber::Senate => "Senate",
            Chamber::Joint => "Joint",
            Chamber::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Chamber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

static TRAILING_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*$").unwrap());

/// Trailing integer of a stage label (`"Stage 3"` -> 3).
pub fn stage_number(stage: &str) -> Option<u32> {
    TRAILING_DIGITS
        .captures(stage)
        .and_then(|c| c[1].parse().ok())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageStatus {
    Alive,
    Dead,
}

impl StageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StageStatus::Alive => "Alive",
            StageStatus::Dead => "Dead",
        }
    }
}

/// A completed stage whose outcome flag is `fail` is dead; so is a stage box
/// flagged `failed`. The completed-stage branch is checked first.
pub fn classify_stage(div_class: Option<&str>, after_status: Option<&str>) -> StageStatus {
    let div = div_class.map(|s| s.trim().to_ascii_lowercase());
    let after = after_status.map(|s| s.trim().to_ascii_lowercase());

    if div.as_deref() == Some("complete") && after.as_deref() == Some("fail") {
        return StageStatus::Dead;
    }
    if div.as_deref() == Some("failed") {
        return StageStatus::Dead;
    }
    StageStatus::Alive
}

// ---------------------------------------------------------------------------
// Dates and times
// ---------------------------------------------------------------------------

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    ["%m/%d/%Y", "%Y-%m-%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

pub fn parse_date_opt(value: Option<&str>) -> Option<NaiveDate> {
    value.and_then(parse_date)
}

static CLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})(?::(\d{2}))?(?::(\d{2}))?\s*(AM|PM)?$").unwrap());

/// Clock time of day: `8:00 AM`, `8:00 A.M.`, `2 PM`, `14:30`.
pub fn parse_clock(value: &str) -> Option<NaiveTime> {
    let cleaned = value.trim().to_ascii_uppercase().replace('.', "");
    let caps = CLOCK.captures(&cleaned)?;

    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
    let second: u32 = caps.get(3).map_or(Some(0), |m| m.as_str().parse().ok())?;

    let hour = match caps.get(4).map(|m| m.as_str()) {
        Some(meridiem) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            hour % 12 + if meridiem == "PM" { 12 } else { 0 }
        }
        // A bare number is not a clock reading.
        None if caps.get(2).is_none() => return None,
        None => hour,
    };
    NaiveTime::from_hms_opt(hour, minute, second)
}

/// One phrase-to-clock mapping. Phrases match case-insensitively as substrings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingTimeRule {
    pub phrase: String,
    /// `HH:MM`, 24-hour.
    pub time: String,
}

impl MeetingTimeRule {
    fn new(phrase: &str, time: &str) -> Self {
        Self { phrase: phrase.into(), time: time.into() }
    }
}

pub fn default_meeting_time_rules() -> Vec<MeetingTimeRule> {
    vec![
        MeetingTimeRule::new("30 minutes", "12:30"),
        MeetingTimeRule::new("during reading", "10:00"),
        MeetingTimeRule::new("upon final adjourn", "12:00"),
        MeetingTimeRule::new("upon adjourn", "12:00"),
        MeetingTimeRule::new("upon recess", "12:00"),
    ]
}

/// A meeting's time as displayed and as a sortable clock value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeetingTime {
    /// The scraped text, verbatim.
    pub display: Option<String>,
    pub clock: Option<NaiveTime>,
}

#[derive(Debug, Clone)]
pub struct MeetingTimeTable {
    rules: Vec<(String, NaiveTime)>,
}

impl Default for MeetingTimeTable {
    fn default() -> Self {
        // Built-in rules are well-formed.
        Self::from_rules(&default_meeting_time_rules()).unwrap_or(Self { rules: Vec::new() })
    }
}

impl MeetingTimeTable {
    pub fn from_rules(rules: &[MeetingTimeRule]) -> Result<Self, ReconError> {
        let rules = rules
            .iter()
            .map(|rule| {
                let time = NaiveTime::parse_from_str(rule.time.trim(), "%H:%M").map_err(|_| {
                    ReconError::ConfigValidation(format!(
                        "meeting_times: '{}' has invalid time '{}' (expected HH:MM)",
                        rule.phrase, rule.time
                    ))
                })?;
                Ok((rule.phrase.to_lowercase(), time))
            })
            .collect::<Result<Vec<_>, ReconError>>()?;
        Ok(Self { rules })
    }

    pub fn normalize(&self, raw: Option<&str>) -> MeetingTime {
        let display = raw.map(str::trim).filter(|s| !s.is_empty()).map(String::from);
        let clock = display.as_deref().and_then(|text| {
            let lowered = text.to_lowercase();
            self.rules
                .iter()
                .find(|(phrase, _)| lowered.contains(phrase.as_str()))
                .map(|(_, time)| *time)
                .or_else(|| parse_clock(text))
        });
        MeetingTime { display, clock }
    }

    /// Sortable meeting datetime; `None` when either part is missing or malformed.
    pub fn meeting_datetime(&self, date: &str, time: Option<&str>) -> Option<NaiveDateTime> {
        let date = parse_date(date)?;
        let clock = self.normalize(time).clock?;
        Some(date.and_time(clock))
    }
}

// ---------------------------------------------------------------------------
// Bill identifiers
// ---------------------------------------------------------------------------

static BILL_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+)\s*\(\s*(\w+)\s*\)\s*([A-Za-z]+)\s*(\d+)\s*$").unwrap()
});

/// `"89(R) HB 1"` -> `HB1` in session `89R`.
pub fn clean_bill_ref(raw: &str) -> Option<BillKey> {
    let caps = BILL_REF.captures(raw)?;
    let number: u32 = caps[4].parse().ok()?;
    Some(BillKey::new(
        format!("{}{}", caps[3].to_ascii_uppercase(), number),
        format!("{}{}", &caps[1], caps[2].to_ascii_uppercase()),
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BillNumber {
    pub prefix: String,
    pub number: Option<u64>,
}

impl BillNumber {
    /// Alphabetic characters form the prefix; the digits, with everything else stripped, the number.
    pub fn parse(bill_id: &str) -> Self {
        let prefix: String = bill_id
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        let digits: String = bill_id.chars().filter(char::is_ascii_digit).collect();
        Self { prefix, number: digits.parse().ok() }
    }

    /// Numeric part ascending (ids without digits last), then prefix.
    pub fn sort_key(&self) -> (bool, u64, &str) {
        (self.number.is_none(), self.number.unwrap_or(0), self.prefix.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionKind {
    Bill,
    Joint,
    Concurrent,
    Simple,
}

impl ResolutionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolutionKind::Bill => "Bill",
            ResolutionKind::Joint => "Joint Resolution",
            ResolutionKind::Concurrent => "Concurrent Resolution",
            ResolutionKind::Simple => "Resolution",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BillType {
    pub origin: Chamber,
    pub kind: ResolutionKind,
}

impl BillType {
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        let (origin, kind) = match prefix.to_ascii_uppercase().as_str() {
            "HB" => (Chamber::House, ResolutionKind::Bill),
            "SB" => (Chamber::Senate, ResolutionKind::Bill),
            "HJR" => (Chamber::House, ResolutionKind::Joint),
            "SJR" => (Chamber::Senate, ResolutionKind::Joint),
            "HCR" => (Chamber::House, ResolutionKind::Concurrent),
            "SCR" => (Chamber::Senate, ResolutionKind::Concurrent),
            "HR" => (Chamber::House, ResolutionKind::Simple),
            "SR" => (Chamber::Senate, ResolutionKind::Simple),
            _ => return None,
        };
        Some(Self { origin, kind })
    }

    /// `House Bill`, `Senate Joint Resolution`, ...
    pub fn label(&self) -> String {
        format!("{} {}", self.origin, self.kind.as_str())
    }
}
