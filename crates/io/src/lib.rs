// Snapshot store and report I/O

pub mod csv;
pub mod error;
pub mod json;
pub mod kinds;
pub mod sink;
pub mod store;
pub mod xlsx;

pub use error::IoError;
pub use store::{IngestStats, SnapshotStore, STORE_FORMAT_VERSION};
