//! Core configuration types.
//! - Config holds runtime settings with sensible defaults.
//! - Mode selects between mirroring the structure and moving files back.
//! - LogLevel represents verbosity with simple parsing helpers.

use serde::{Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::DEFAULT_INIT_DEPTH;

/// Mode of operation, always given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Mode {
    /// Mirror the target's directory structure into the mirror root.
    Init,
    /// Move files from the mirror root into the target structure.
    #[default]
    Move,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Init => "init",
            Mode::Move => "move",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verbosity of the operational logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a level name (surrounding whitespace ignored, case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

impl Serialize for LogLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Runtime configuration shared by both modes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(skip)]
    pub mode: Mode,
    /// Staging tree; directories are mirrored into it, files are moved out of it
    #[serde(rename = "mirror")]
    pub mirror_root: PathBuf,
    /// Protected tree; the source of truth in init mode, the destination in move mode
    #[serde(rename = "target")]
    pub target_root: PathBuf,
    /// Cleaned absolute paths excluded in both modes
    #[serde(rename = "exclude")]
    pub excludes: Vec<PathBuf>,
    /// Try an atomic rename before falling back to copy and remove
    pub direct: bool,
    /// Re-read the destination after commit and compare against the source hash
    pub verify: bool,
    /// Only create target directories that receive a moved file
    pub skip_empty: bool,
    /// With `skip_empty`: drop empty mirror directories missing from the target
    pub remove_empty: bool,
    /// Record and skip failed elements instead of aborting
    pub skip_failed: bool,
    /// Pause after batches of created directories in init mode
    pub slow_mode: bool,
    /// Maximum mirrored depth in init mode; negative means unlimited
    pub init_depth: i64,
    /// Log the planned operations without touching the filesystem
    pub dry_run: bool,
    pub log_level: LogLevel,
    pub json: bool,
    /// Optional log file in addition to stderr
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            mirror_root: PathBuf::new(),
            target_root: PathBuf::new(),
            excludes: Vec::new(),
            direct: false,
            verify: false,
            skip_empty: false,
            remove_empty: false,
            skip_failed: false,
            slow_mode: false,
            init_depth: DEFAULT_INIT_DEPTH,
            dry_run: false,
            log_level: LogLevel::default(),
            json: false,
            log_file: None,
        }
    }
}

impl Config {
    /// Construct a Config with explicit roots; other fields use defaults.
    pub fn new(mode: Mode, mirror_root: impl Into<PathBuf>, target_root: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            mirror_root: mirror_root.into(),
            target_root: target_root.into(),
            ..Default::default()
        }
    }

    /// Render the effective configuration as indented YAML lines.
    pub fn to_yaml_lines(&self) -> Result<Vec<String>, serde_yaml::Error> {
        let out = serde_yaml::to_string(self)?;
        Ok(out
            .lines()
            .filter(|l| !l.is_empty())
            .map(|l| format!("\t{l}"))
            .collect())
    }
}
