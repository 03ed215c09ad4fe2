//! Config validation logic.
//! Cleans the configured paths and rejects combinations the engine cannot run
//! with. Existence of the roots is checked by the engine itself.

use tracing::debug;

use super::error::ConfigError;
use super::paths::clean_path;
use super::types::Config;

/// Normalize `cfg` in place and validate it.
///
/// - mirror and target must both be set, absolute, and different
/// - every exclude must be absolute
/// - all paths are trimmed and lexically cleaned
pub fn validate_and_normalize(cfg: &mut Config) -> Result<(), ConfigError> {
    if cfg.mirror_root.as_os_str().is_empty() || cfg.target_root.as_os_str().is_empty() {
        return Err(ConfigError::MissingMirrorTarget);
    }

    cfg.mirror_root = clean_path(&cfg.mirror_root);
    cfg.target_root = clean_path(&cfg.target_root);

    if cfg.mirror_root == cfg.target_root {
        return Err(ConfigError::MirrorTargetSame);
    }
    if !cfg.mirror_root.is_absolute() || !cfg.target_root.is_absolute() {
        return Err(ConfigError::MirrorTargetNotAbs);
    }

    let mut cleaned = Vec::with_capacity(cfg.excludes.len());
    for excl in &cfg.excludes {
        let p = clean_path(excl);
        if !p.is_absolute() {
            return Err(ConfigError::ExcludeNotAbs(p));
        }
        cleaned.push(p);
    }
    cfg.excludes = cleaned;

    debug!(
        mirror = %cfg.mirror_root.display(),
        target = %cfg.target_root.display(),
        excludes = cfg.excludes.len(),
        "configuration validated"
    );
    Ok(())
}
