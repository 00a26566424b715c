//! `legtrack-recon`: Temporal reconciliation of legislative snapshots.
//!
//! Pure engine crate: receives snapshot history, returns current state and
//! per-bill report rows. No CLI or IO dependencies.

pub mod assemble;
pub mod config;
pub mod current;
pub mod differ;
pub mod engine;
pub mod entity;
pub mod error;
pub mod evidence;
pub mod lifecycle;
pub mod model;
pub mod normalize;
pub mod resolve;
pub mod roster;
pub mod views;

pub use assemble::BillReport;
pub use config::TrackerConfig;
pub use current::CurrentState;
pub use differ::{diff_snapshot, DiffOutput};
pub use engine::{run, RunResult};
pub use entity::{Entity, EntityKind};
pub use error::ReconError;
pub use lifecycle::Lifecycle;
pub use model::{Snapshot, SnapshotSet, Timestamp};
pub use resolve::{resolve, Resolved};
pub use views::{Cell, Hyperlink, ReportTable};
