//! CLI definition and parsing.
//! Defines Args and turns them, together with an optional YAML file, into a
//! validated Config.
//!
//! Notes:
//! - A flag given on the command line wins over the config file, which wins
//!   over the defaults.
//! - Boolean flags take an optional value (`--verify`, `--verify=false`) so a
//!   file setting can be switched off again from the command line.
//! - `--exclude` replaces the file's exclude list instead of extending it.

use clap::{Parser, ValueHint};
use std::path::PathBuf;

use crate::config::{Config, ConfigError, FileConfig, LogLevel, Mode, validate_and_normalize};

/// Keep your organization, ditch the ransomware.
///
/// `--mode=init` mirrors the directory structure of the target into the
/// mirror root; `--mode=move` moves files written into the mirror back to
/// their place in the target.
#[derive(Parser, Debug, Clone)]
#[command(name = "mirrorshuttle", version, about, long_about = None)]
pub struct Args {
    /// Mode of operation.
    #[arg(long, value_enum)]
    pub mode: Mode,

    /// Optional YAML configuration file.
    #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Absolute path to the mirror structure.
    #[arg(long, value_name = "ABSPATH", value_hint = ValueHint::DirPath)]
    pub mirror: Option<PathBuf>,

    /// Absolute path to the real (target) structure.
    #[arg(long, value_name = "ABSPATH", value_hint = ValueHint::DirPath)]
    pub target: Option<PathBuf>,

    /// Absolute path to exclude; can be repeated.
    #[arg(long = "exclude", value_name = "ABSPATH", value_hint = ValueHint::AnyPath)]
    pub excludes: Vec<PathBuf>,

    /// Try an atomic rename before falling back to copy and remove.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub direct: Option<bool>,

    /// Re-read each moved file and compare it against the source hash.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub verify: Option<bool>,

    /// Only create target directories that end up containing files.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub skip_empty: Option<bool>,

    /// With --skip-empty, remove empty mirror directories that no longer
    /// exist in the target (move mode).
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub remove_empty: Option<bool>,

    /// Log and skip failing entries instead of aborting (exit status 2).
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub skip_failed: Option<bool>,

    /// Pause between batches of created directories (init mode).
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub slow_mode: Option<bool>,

    /// Maximum mirroring depth in init mode; negative means unlimited.
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub init_depth: Option<i64>,

    /// Log what would be done without touching the filesystem.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub dry_run: Option<bool>,

    /// Log level: debug, info, warn, error.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub json: Option<bool>,

    /// Also append logs to this file.
    #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,
}

impl Args {
    /// Apply CLI overrides to `cfg` (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) -> Result<(), ConfigError> {
        cfg.mode = self.mode;
        if let Some(m) = &self.mirror {
            cfg.mirror_root = m.clone();
        }
        if let Some(t) = &self.target {
            cfg.target_root = t.clone();
        }
        if !self.excludes.is_empty() {
            cfg.excludes = self.excludes.clone();
        }

        let flags = [
            (self.direct, &mut cfg.direct),
            (self.verify, &mut cfg.verify),
            (self.skip_empty, &mut cfg.skip_empty),
            (self.remove_empty, &mut cfg.remove_empty),
            (self.skip_failed, &mut cfg.skip_failed),
            (self.slow_mode, &mut cfg.slow_mode),
            (self.dry_run, &mut cfg.dry_run),
            (self.json, &mut cfg.json),
        ];
        for (given, slot) in flags {
            if let Some(v) = given {
                *slot = v;
            }
        }

        if let Some(depth) = self.init_depth {
            cfg.init_depth = depth;
        }
        if let Some(s) = &self.log_level {
            cfg.log_level =
                LogLevel::parse(s).ok_or_else(|| ConfigError::InvalidLogLevel(s.clone()))?;
        }
        if let Some(p) = &self.log_file {
            cfg.log_file = Some(p.clone());
        }
        Ok(())
    }
}

/// Build the effective configuration: defaults, then the YAML file (if any),
/// then the command line, then normalization and validation.
pub fn build_config(args: &Args) -> Result<Config, ConfigError> {
    let mut cfg = Config::new(args.mode, "", "");
    if let Some(path) = &args.config {
        FileConfig::load(path)?.apply_to(&mut cfg)?;
    }
    args.apply_overrides(&mut cfg)?;
    validate_and_normalize(&mut cfg)?;
    Ok(cfg)
}
