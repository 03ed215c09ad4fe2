//! YAML configuration support.
//! - Loads settings from a user-supplied YAML file (serde_yaml).
//! - Every key is optional; CLI flags given on the command line win later.
//!
//! Notes:
//! - This module only reads the config file; path validation happens elsewhere.
//! - Unknown or malformed fields are rejected to surface misconfigurations early.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::error::ConfigError;
use super::types::{Config, LogLevel};

/// Struct mirroring the YAML config for deserialization.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub mirror: Option<String>,
    pub target: Option<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    pub direct: Option<bool>,
    pub verify: Option<bool>,
    pub skip_empty: Option<bool>,
    pub remove_empty: Option<bool>,
    pub skip_failed: Option<bool>,
    pub slow_mode: Option<bool>,
    pub init_depth: Option<i64>,
    pub dry_run: Option<bool>,
    pub log_level: Option<String>,
    pub json: Option<bool>,
    pub log_file: Option<String>,
}

impl FileConfig {
    /// Read and parse a YAML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Missing {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed = Self::parse(&contents).map_err(|e| match e {
            ConfigError::Malformed { source, .. } => ConfigError::Malformed {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        debug!(path = %path.display(), "loaded yaml configuration");
        Ok(parsed)
    }

    /// Parse YAML text. An empty document yields an all-default FileConfig.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents).map_err(|source| ConfigError::Malformed {
            path: PathBuf::new(),
            source,
        })
    }

    /// Copy every value present in the file onto `cfg`.
    pub fn apply_to(&self, cfg: &mut Config) -> Result<(), ConfigError> {
        if let Some(m) = &self.mirror {
            cfg.mirror_root = PathBuf::from(m);
        }
        if let Some(t) = &self.target {
            cfg.target_root = PathBuf::from(t);
        }
        if !self.exclude.is_empty() {
            cfg.excludes = self.exclude.iter().map(PathBuf::from).collect();
        }
        if let Some(v) = self.direct {
            cfg.direct = v;
        }
        if let Some(v) = self.verify {
            cfg.verify = v;
        }
        if let Some(v) = self.skip_empty {
            cfg.skip_empty = v;
        }
        if let Some(v) = self.remove_empty {
            cfg.remove_empty = v;
        }
        if let Some(v) = self.skip_failed {
            cfg.skip_failed = v;
        }
        if let Some(v) = self.slow_mode {
            cfg.slow_mode = v;
        }
        if let Some(v) = self.init_depth {
            cfg.init_depth = v;
        }
        if let Some(v) = self.dry_run {
            cfg.dry_run = v;
        }
        if let Some(s) = &self.log_level {
            cfg.log_level =
                LogLevel::parse(s).ok_or_else(|| ConfigError::InvalidLogLevel(s.clone()))?;
        }
        if let Some(v) = self.json {
            cfg.json = v;
        }
        if let Some(s) = &self.log_file {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                cfg.log_file = Some(PathBuf::from(trimmed));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::Mode;

    #[test]
    fn parses_all_known_fields() {
        let yaml = "\
mirror: /mirror
target: /real
exclude:
  - /real/skip-this
  - /real/temp
direct: true
verify: true
skip-empty: true
remove-empty: true
skip-failed: true
slow-mode: true
init-depth: 2
dry-run: true
log-level: warn
json: true
";
        let parsed = FileConfig::parse(yaml).unwrap();
        let mut cfg = Config::new(Mode::Move, "", "");
        parsed.apply_to(&mut cfg).unwrap();
        assert_eq!(cfg.mirror_root, PathBuf::from("/mirror"));
        assert_eq!(cfg.target_root, PathBuf::from("/real"));
        assert_eq!(cfg.excludes.len(), 2);
        assert!(cfg.direct && cfg.verify && cfg.skip_empty && cfg.skip_failed);
        assert!(cfg.remove_empty);
        assert!(cfg.slow_mode && cfg.dry_run && cfg.json);
        assert_eq!(cfg.init_depth, 2);
        assert_eq!(cfg.log_level, LogLevel::Warn);
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = FileConfig::parse("mirror: /m\nbogus: 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[test]
    fn rejects_mode_in_file() {
        assert!(FileConfig::parse("mode: move\n").is_err());
    }

    #[test]
    fn rejects_invalid_log_level() {
        let parsed = FileConfig::parse("log-level: loud\n").unwrap();
        let mut cfg = Config::default();
        let err = parsed.apply_to(&mut cfg).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogLevel(_)));
    }

    #[test]
    fn empty_document_is_all_defaults() {
        let parsed = FileConfig::parse("  \n").unwrap();
        let mut cfg = Config::default();
        parsed.apply_to(&mut cfg).unwrap();
        assert_eq!(cfg.init_depth, -1);
        assert!(!cfg.direct);
    }
}
