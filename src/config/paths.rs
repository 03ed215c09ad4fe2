//! Path helpers.
//! Lexical path cleaning shared by config normalization and the exclusion
//! matcher, plus symlink-ancestor detection for the log file.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Lexically clean a path: trim surrounding whitespace, drop `.` segments and
/// redundant separators, and resolve `..` against preceding segments. `..`
/// never climbs above the root of an absolute path. Never touches the disk.
pub fn clean_path(path: &Path) -> PathBuf {
    let trimmed: PathBuf = match path.to_str() {
        Some(s) => PathBuf::from(s.trim()),
        None => path.to_path_buf(),
    };

    let mut out = PathBuf::new();
    let mut depth = 0usize;
    for comp in trimmed.components() {
        match comp {
            Component::Prefix(_) | Component::RootDir => out.push(comp.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth > 0 {
                    out.pop();
                    depth -= 1;
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(name) => {
                out.push(name);
                depth += 1;
            }
        }
    }

    if out.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        out
    }
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.exists() {
            let meta = fs::symlink_metadata(anc)?;
            if meta.file_type().is_symlink() {
                return Ok(true);
            }
        }
        p = anc.parent();
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_path_normalizes_lexically() {
        assert_eq!(clean_path(Path::new("  /real//dir/./sub/../x/ ")), PathBuf::from("/real/dir/x"));
        assert_eq!(clean_path(Path::new("/../..")), PathBuf::from("/"));
        assert_eq!(clean_path(Path::new("a/../..")), PathBuf::from(".."));
        assert_eq!(clean_path(Path::new("")), PathBuf::from("."));
    }
}
