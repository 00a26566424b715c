use serde::{Deserialize, Serialize};

use crate::normalize::StageStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lifecycle {
    Unassigned,
    Alive,
    Dead,
    Law,
    Vetoed,
}

impl Lifecycle {
    pub fn as_str(self) -> &'static str {
        match self {
            Lifecycle::Unassigned => "Unassigned",
            Lifecycle::Alive => "Alive",
            Lifecycle::Dead => "Dead",
            Lifecycle::Law => "Law",
            Lifecycle::Vetoed => "Vetoed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unassigned" => Some(Lifecycle::Unassigned),
            "alive" => Some(Lifecycle::Alive),
            "dead" => Some(Lifecycle::Dead),
            "law" => Some(Lifecycle::Law),
            "vetoed" => Some(Lifecycle::Vetoed),
            _ => None,
        }
    }
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `[lifecycle]` section. Markers match the last action case-insensitively as substrings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleRules {
    pub terminal_stage: u32,
    pub veto_markers: Vec<String>,
    pub committee_failure_markers: Vec<String>,
}

impl Default for LifecycleRules {
    fn default() -> Self {
        Self {
            terminal_stage: 7,
            veto_markers: vec!["Vetoed by Governor".into()],
            committee_failure_markers: vec![
                "Failed to receive affirmative vote in comm".into(),
            ],
        }
    }
}

impl LifecycleRules {
    /// Text markers short-circuit the stage machine, which has no veto state.
    ///
    /// `highest_stage` is the highest-numbered stage with its status.
    pub fn derive(
        &self,
        last_action: Option<&str>,
        highest_stage: Option<(u32, StageStatus)>,
    ) -> Lifecycle {
        if let Some(action) = last_action {
            if matches_any(action, &self.veto_markers) {
                return Lifecycle::Vetoed;
            }
            if matches_any(action, &self.committee_failure_markers) {
                return Lifecycle::Dead;
            }
        }

        match highest_stage {
            Some((stage, StageStatus::Alive)) if stage == self.terminal_stage => Lifecycle::Law,
            Some((_, StageStatus::Alive)) => Lifecycle::Alive,
            Some((_, StageStatus::Dead)) => Lifecycle::Dead,
            None => Lifecycle::Unassigned,
        }
    }
}

fn matches_any(text: &str, markers: &[String]) -> bool {
    let text = text.to_lowercase();
    markers
        .iter()
        .any(|m| !m.is_empty() && text.contains(&m.to_lowercase()))
}
