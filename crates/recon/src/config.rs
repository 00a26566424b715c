use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::lifecycle::{Lifecycle, LifecycleRules};
use crate::model::BillKey;
use crate::normalize::{default_meeting_time_rules, Chamber, MeetingTimeRule, MeetingTimeTable};
use crate::roster::RosterLimits;
use crate::views::{file_stem, Column, ViewSpec};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackerConfig {
    pub name: String,
    /// Restrict the report roster to one session (`89R`). All sessions when unset.
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub lifecycle: LifecycleRules,
    #[serde(default)]
    pub assembly: AssemblyConfig,
    #[serde(default)]
    pub roster: RosterLimits,
    #[serde(default)]
    pub links: LinkTemplates,
    /// Replaces the built-in phrase table when present.
    #[serde(default = "default_meeting_time_rules")]
    pub meeting_times: Vec<MeetingTimeRule>,
    #[serde(default)]
    pub views: Vec<ViewSpec>,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Joins multi-valued fields (authors, subjects, ...).
    pub delimiter: String,
    /// Drop child rows the latest scrape of their kind did not observe.
    pub exclude_disappeared: bool,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            delimiter: "; ".into(),
            exclude_disappeared: false,
        }
    }
}

/// URL templates. `{bill_id}` and `{leg_id}` are substituted.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LinkTemplates {
    pub history: String,
    pub actions: String,
    pub authors: String,
}

impl Default for LinkTemplates {
    fn default() -> Self {
        const BASE: &str = "https://capitol.texas.gov/BillLookup";
        Self {
            history: format!("{BASE}/History.aspx?LegSess={{leg_id}}&Bill={{bill_id}}"),
            actions: format!("{BASE}/Actions.aspx?LegSess={{leg_id}}&Bill={{bill_id}}"),
            authors: format!("{BASE}/Authors.aspx?LegSess={{leg_id}}&Bill={{bill_id}}"),
        }
    }
}

impl LinkTemplates {
    pub fn render(template: &str, key: &BillKey) -> String {
        template
            .replace("{bill_id}", &key.bill_id)
            .replace("{leg_id}", &key.leg_id)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Directory receiving one CSV per view.
    #[serde(default)]
    pub dir: Option<String>,
    /// Workbook path, one worksheet per view.
    #[serde(default)]
    pub xlsx: Option<String>,
    /// Full run result as JSON.
    #[serde(default)]
    pub json: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl TrackerConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: TrackerConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Configured views, or a single unfiltered view when none are configured.
    pub fn effective_views(&self) -> Vec<ViewSpec> {
        if self.views.is_empty() {
            vec![ViewSpec::all_bills()]
        } else {
            self.views.clone()
        }
    }

    pub fn meeting_time_table(&self) -> Result<MeetingTimeTable, ReconError> {
        MeetingTimeTable::from_rules(&self.meeting_times)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.name.trim().is_empty() {
            return Err(ReconError::ConfigValidation("name must not be empty".into()));
        }

        if self.lifecycle.terminal_stage == 0 {
            return Err(ReconError::ConfigValidation(
                "lifecycle.terminal_stage must be at least 1".into(),
            ));
        }
        let markers = self
            .lifecycle
            .veto_markers
            .iter()
            .chain(&self.lifecycle.committee_failure_markers);
        for marker in markers {
            if marker.trim().is_empty() {
                return Err(ReconError::ConfigValidation(
                    "lifecycle markers must not be empty strings".into(),
                ));
            }
        }

        if self.assembly.delimiter.is_empty() {
            return Err(ReconError::ConfigValidation(
                "assembly.delimiter must not be empty".into(),
            ));
        }

        for (field, template) in [
            ("history", &self.links.history),
            ("actions", &self.links.actions),
            ("authors", &self.links.authors),
        ] {
            if !template.contains("{bill_id}") {
                return Err(ReconError::ConfigValidation(format!(
                    "links.{field} must contain {{bill_id}}"
                )));
            }
        }

        if self.roster.max_bill_number == 0 {
            return Err(ReconError::ConfigValidation(
                "roster.max_bill_number must be at least 1".into(),
            ));
        }

        self.meeting_time_table()?;

        // Each view becomes <stem>.csv, so stems must be unique
        let mut stems: HashMap<String, &str> = HashMap::new();
        for view in &self.views {
            self.validate_view(view)?;
            if let Some(other) = stems.insert(file_stem(&view.name), &view.name) {
                return Err(ReconError::ConfigValidation(format!(
                    "views '{other}' and '{}' would write the same file",
                    view.name
                )));
            }
        }

        Ok(())
    }

    fn validate_view(&self, view: &ViewSpec) -> Result<(), ReconError> {
        let name = view.name.trim();
        // Worksheet names are capped at 31 characters and reject []:*?/\
        if name.is_empty() || name.chars().count() > 31 {
            return Err(ReconError::ConfigValidation(format!(
                "view name '{}' must be 1-31 characters",
                view.name
            )));
        }
        if name.contains(['[', ']', ':', '*', '?', '/', '\\']) {
            return Err(ReconError::ConfigValidation(format!(
                "view name '{}' contains a character not allowed in sheet names",
                view.name
            )));
        }

        if let Some(ref chamber) = view.chamber {
            if Chamber::from_code(chamber) == Chamber::Unknown {
                return Err(ReconError::ConfigValidation(format!(
                    "view '{}': unknown chamber '{chamber}'",
                    view.name
                )));
            }
        }

        for status in &view.statuses {
            if Lifecycle::parse(status).is_none() {
                return Err(ReconError::ConfigValidation(format!(
                    "view '{}': unknown status '{status}'",
                    view.name
                )));
            }
        }

        for column in &view.drop_columns {
            Column::lookup(column).ok_or_else(|| ReconError::UnknownColumn {
                view: view.name.clone(),
                column: column.clone(),
            })?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
