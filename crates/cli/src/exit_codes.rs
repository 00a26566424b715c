//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; schedulers rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 10-19   | store            | Snapshot store and scraper input         |
//! | 20-29   | run              | Config, roster gate, report sinks        |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `CliError` or the relevant command

use legtrack_io::IoError;
use legtrack_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unknown entity kind, unreadable input file.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Store (10-19)
// =============================================================================

/// Snapshot store cannot be opened, read or written.
pub const EXIT_STORE: u8 = 10;

/// Stored row is corrupt (timestamp or record JSON does not parse).
pub const EXIT_STORE_CORRUPT: u8 = 11;

/// Scraper CSV could not be read at all (individual bad rows are skipped, not fatal).
pub const EXIT_INPUT_PARSE: u8 = 12;

// =============================================================================
// Run (20-29)
// =============================================================================

/// Config file does not parse or fails validation.
pub const EXIT_CONFIG_INVALID: u8 = 20;

/// Roster contiguity check failed; reports were not promoted.
pub const EXIT_ROSTER_GAPS: u8 = 21;

/// A report sink (CSV directory, workbook, JSON file) could not be written.
pub const EXIT_OUTPUT: u8 = 22;

// =============================================================================
// Error mapping
// =============================================================================

pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) | ReconError::UnknownColumn { .. } => {
            EXIT_CONFIG_INVALID
        }
        ReconError::UnknownEntity(_) => EXIT_USAGE,
    }
}

pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::Sqlite(_) => EXIT_STORE,
        IoError::BadTimestamp { .. } | IoError::Json(_) => EXIT_STORE_CORRUPT,
        IoError::Csv(_) => EXIT_INPUT_PARSE,
        IoError::Xlsx(_) | IoError::Io(_) => EXIT_OUTPUT,
        IoError::WrongRefresh { .. } => EXIT_ERROR,
    }
}
