//! Exclusion matching.
//!
//! A path is excluded when it equals an exclude entry or lies below one. The
//! test is component-wise, so `/real/dir1x` is not below `/real/dir1`.

use std::path::{Path, PathBuf};

use crate::config::clean_path;

/// Return true if `path` equals or is nested under any of `excludes`.
///
/// `path` is cleaned before comparing; `excludes` are expected to be cleaned
/// already (configuration validation does that). Never touches the disk.
pub fn is_excluded(path: &Path, excludes: &[PathBuf]) -> bool {
    if excludes.is_empty() {
        return false;
    }
    let path = clean_path(path);
    excludes.iter().any(|excl| path.starts_with(excl))
}
