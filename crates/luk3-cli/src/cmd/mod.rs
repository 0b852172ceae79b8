//! Command implementations

pub mod bootstrap;
pub mod clean;

/// A run precondition failed (marker, token, configuration).
pub const EXIT_SETUP_FAILURE: u8 = 1;
/// Some bundle or file failed to sync under `--strict`. Distinct from the
/// `2` clap exits with on usage errors.
pub const EXIT_SYNC_FAILURE: u8 = 3;
