use serde::Serialize;
use tracing::{info, warn};

use crate::assemble::{Assembler, BillReport};
use crate::config::TrackerConfig;
use crate::current::{CurrentState, KindPresence};
use crate::error::ReconError;
use crate::evidence::{compute_summary, RunSummary};
use crate::model::{format_timestamp, SnapshotSet, Timestamp};
use crate::roster::RosterCheck;
use crate::views::{build_view, ReportTable};

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub session: Option<String>,
    pub engine_version: String,
    /// Clock used for "upcoming" meeting selection.
    pub as_of: String,
}

/// Everything one reconciliation run derives from the store.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub meta: RunMeta,
    pub summary: RunSummary,
    pub presence: Vec<KindPresence>,
    pub roster: Vec<RosterCheck>,
    pub reports: Vec<BillReport>,
    pub views: Vec<ReportTable>,
}

impl RunResult {
    /// Reports may be promoted only when every roster group is contiguous.
    pub fn roster_ok(&self) -> bool {
        self.roster.iter().all(RosterCheck::passed)
    }
}

/// Run reconciliation per config over a consistent read of the store.
pub fn run(
    config: &TrackerConfig,
    snapshots: &SnapshotSet,
    now: Timestamp,
) -> Result<RunResult, ReconError> {
    let state = CurrentState::resolve(snapshots);
    let presence = state.presence();
    for p in presence.iter().filter(|p| p.disappeared > 0) {
        info!(kind = %p.kind, disappeared = p.disappeared, "rows absent from latest scrape");
    }

    let assembler = Assembler::new(config, now)?;
    let roster = assembler.check_roster(&state);
    if roster.iter().any(|c| !c.passed()) {
        warn!("roster contiguity check failed; reports should not be promoted");
    }

    let reports = assembler.assemble(&state);

    let views = config
        .effective_views()
        .iter()
        .map(|spec| build_view(spec, &reports))
        .collect::<Result<Vec<_>, _>>()?;

    let summary = compute_summary(&reports, &roster, &presence);
    info!(
        bills = summary.total_bills,
        views = views.len(),
        roster_failures = summary.roster_failures,
        "run complete"
    );

    Ok(RunResult {
        meta: RunMeta {
            config_name: config.name.clone(),
            session: config.session.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            as_of: format_timestamp(&now),
        },
        summary,
        presence,
        roster,
        reports,
        views,
    })
}
