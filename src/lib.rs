//! Core library for `mirrorshuttle`.
//!
//! Two modes over a protected target tree and a writable mirror of it:
//! - init: recreate the target's directory structure (no files) as the mirror;
//! - move: promote files written into the mirror back into the target, with
//!   SHA-256 checked copies, refusing to overwrite anything.
//!
//! The binary only parses flags, sets up logging and drives these functions.

pub mod cli;
pub mod config;
pub mod errors;
pub mod fs_ops;
pub mod outcome;
pub mod output;
pub mod platform;
pub mod shutdown;

pub use config::{Config, ConfigError, LogLevel, Mode, path_has_symlink_ancestor};
pub use errors::ShuttleError;
pub use fs_ops::{
    Filesystem, OsFs, TEMP_SUFFIX, create_mirror_structure, is_empty_structure, is_excluded,
    move_files,
};
pub use outcome::{ExitStatus, Outcome};
pub use shutdown::CancelToken;

use tracing::{info, warn};

/// Run the configured mode against `fs`, recording counters and flags in
/// `outcome`.
pub fn run_mode<F: Filesystem + ?Sized>(
    fs: &F,
    cfg: &Config,
    cancel: &CancelToken,
    outcome: &mut Outcome,
) -> Result<(), ShuttleError> {
    let op = cfg.mode.as_str();
    if cfg.dry_run {
        warn!(op, "running in dry mode - no changes will be made");
    }

    match cfg.mode {
        Mode::Init => {
            info!(
                op,
                mirror = %cfg.mirror_root.display(),
                target = %cfg.target_root.display(),
                "setting up the mirror structure..."
            );
            create_mirror_structure(fs, cfg, cancel, outcome)
        }
        Mode::Move => {
            info!(
                op,
                mirror = %cfg.mirror_root.display(),
                target = %cfg.target_root.display(),
                "moving files from mirror to target structure..."
            );
            move_files(fs, cfg, cancel, outcome)
        }
    }
}

/// Exit status for a finished run: the outcome flags on success, otherwise
/// the class of the fatal error.
pub fn exit_status_for(result: &Result<(), ShuttleError>, outcome: &Outcome) -> ExitStatus {
    match result {
        Ok(()) => outcome.exit_status(),
        Err(ShuttleError::MirrorNotEmpty(_)) => ExitStatus::MirrorNotEmpty,
        Err(_) => ExitStatus::Failure,
    }
}
