//! Init mode: recreate the directory structure of the target inside the
//! mirror root, plus the emptiness check that guards its removal.

use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::exclude::is_excluded;
use super::policy::{FailurePolicy, Flow};
use super::provider::{Filesystem, require_exists};
use crate::config::Config;
use crate::errors::ShuttleError;
use crate::outcome::Outcome;
use crate::shutdown::CancelToken;

const OP: &str = "init";

/// Directories created per slow-mode batch.
pub const DIR_CREATION_BATCH: usize = 50;
/// Pause between slow-mode batches.
pub const DIR_CREATION_PAUSE: Duration = Duration::from_secs(1);

/// Number of separators in a relative path: 0 for a direct child of the root.
pub fn dir_depth(rel: &Path) -> usize {
    rel.components().count().saturating_sub(1)
}

/// Build (or rebuild) the mirror structure for `cfg.target_root`.
///
/// An existing mirror root is only removed when it holds no files, otherwise
/// this fails with `MirrorNotEmpty` and leaves it alone.
pub fn create_mirror_structure<F: Filesystem + ?Sized>(
    fs: &F,
    cfg: &Config,
    cancel: &CancelToken,
    outcome: &mut Outcome,
) -> Result<(), ShuttleError> {
    require_exists(fs, &cfg.target_root, ShuttleError::TargetNotExist)?;

    let mirror_root = cfg.mirror_root.as_path();
    let parent = mirror_root.parent().unwrap_or(mirror_root);
    match fs.metadata(parent) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Err(ShuttleError::MirrorParentNotDir(parent.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ShuttleError::MirrorParentNotExist(parent.to_path_buf()));
        }
        Err(e) => return Err(ShuttleError::io("stat", parent, e)),
    }

    match fs.metadata(mirror_root) {
        Ok(_) => {
            info!(op = OP, "testing if the existing mirror structure is empty...");
            if !is_empty_structure(fs, mirror_root, true, cancel)? {
                return Err(ShuttleError::MirrorNotEmpty(mirror_root.to_path_buf()));
            }
            if !cfg.dry_run {
                fs.remove_dir_all(mirror_root)
                    .map_err(|e| ShuttleError::io("remove", mirror_root, e))?;
            }
            info!(op = OP, path = %mirror_root.display(), dry_run = cfg.dry_run, "mirror directory removed");
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(ShuttleError::io("stat", mirror_root, e)),
    }

    if !cfg.dry_run {
        fs.create_dir(mirror_root)
            .map_err(|e| ShuttleError::io("create", mirror_root, e))?;
        outcome.created_dirs += 1;
    }
    info!(op = OP, path = %mirror_root.display(), dry_run = cfg.dry_run, "mirror directory created");

    let policy = FailurePolicy::new(cfg.skip_failed, OP);
    let mut batch = 0usize;
    let mut walk = fs.walk(&cfg.target_root);

    loop {
        if cancel.is_requested() {
            return Err(ShuttleError::Cancelled);
        }
        let Some(item) = walk.next() else {
            break;
        };

        let entry = match item {
            Ok(entry) => entry,
            Err(err) if err.is_not_found() => {
                warn!(op = OP, path = %err.path.display(), reason = "no_longer_exists", "path skipped");
                continue;
            }
            Err(err) => {
                policy.handle(ShuttleError::io("walk", err.path, err.source), false, outcome)?;
                continue;
            }
        };

        if !entry.is_dir() {
            continue;
        }
        let path = entry.path.as_path();

        if path == mirror_root {
            warn!(op = OP, path = %path.display(), reason = "is_mirror_root", "path skipped");
            walk.skip_subtree();
            continue;
        }

        if is_excluded(path, &cfg.excludes) {
            warn!(op = OP, path = %path.display(), reason = "is_user_excluded", "path skipped");
            walk.skip_subtree();
            continue;
        }

        let Ok(rel) = path.strip_prefix(&cfg.target_root) else {
            let err = ShuttleError::io(
                "get relative path",
                path,
                io::Error::other("path is outside of the target root"),
            );
            if policy.handle(err, true, outcome)? == Flow::SkipSubtree {
                walk.skip_subtree();
            }
            continue;
        };
        if rel.as_os_str().is_empty() {
            // The mirror root itself was created above.
            continue;
        }

        if cfg.init_depth >= 0 {
            let depth = dir_depth(rel);
            if depth as i64 > cfg.init_depth {
                debug!(op = OP, path = %path.display(), dir_depth = depth, reason = "exceeds_init_depth", "path skipped");
                walk.skip_subtree();
                continue;
            }
        }

        let mirror_path = mirror_root.join(rel);
        if !cfg.dry_run {
            if let Err(e) = fs.create_dir(&mirror_path) {
                let err = ShuttleError::io("create", &mirror_path, e);
                if policy.handle(err, true, outcome)? == Flow::SkipSubtree {
                    walk.skip_subtree();
                }
                continue;
            }
            outcome.created_dirs += 1;
            batch += 1;
        }

        if cfg.slow_mode && !cfg.dry_run {
            info!(
                op = OP,
                path = %mirror_path.display(),
                slow_mode = true,
                slow_batch = %format!("{batch}/{DIR_CREATION_BATCH}"),
                dry_run = false,
                "directory created"
            );
            if batch >= DIR_CREATION_BATCH {
                thread::sleep(DIR_CREATION_PAUSE);
                batch = 0;
            }
        } else {
            info!(
                op = OP,
                path = %mirror_path.display(),
                slow_mode = cfg.slow_mode,
                dry_run = cfg.dry_run,
                "directory created"
            );
        }
    }

    Ok(())
}

/// Return true if no regular file (or other non-directory) exists below `root`.
///
/// With `report_all` every file found is logged and the walk runs to the end;
/// otherwise it stops at the first file. Any walk error is fatal.
pub fn is_empty_structure<F: Filesystem + ?Sized>(
    fs: &F,
    root: &Path,
    report_all: bool,
    cancel: &CancelToken,
) -> Result<bool, ShuttleError> {
    let mut empty = true;

    let mut walk = fs.walk(root);
    loop {
        if cancel.is_requested() {
            return Err(ShuttleError::Cancelled);
        }
        let Some(item) = walk.next() else {
            break;
        };
        let entry = item.map_err(|err| ShuttleError::io("walk", err.path, err.source))?;
        if entry.is_dir() {
            continue;
        }

        empty = false;
        if !report_all {
            break;
        }
        warn!(op = OP, path = %entry.path.display(), "unmoved file found");
    }

    Ok(empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use crate::fs_ops::memfs::MemFs;

    fn config() -> Config {
        Config::new(Mode::Init, "/mirror", "/real")
    }

    fn target() -> MemFs {
        let fs = MemFs::new();
        fs.add_file("/real/a/b/c/file.txt", "x");
        fs.add_dir("/real/d");
        fs
    }

    #[test]
    fn depth_counts_separators() {
        assert_eq!(dir_depth(Path::new("a")), 0);
        assert_eq!(dir_depth(Path::new("a/b")), 1);
        assert_eq!(dir_depth(Path::new("a/b/c")), 2);
    }

    #[test]
    fn mirrors_directories_only() {
        let fs = target();
        let mut outcome = Outcome::default();
        create_mirror_structure(&fs, &config(), &CancelToken::new(), &mut outcome).unwrap();

        assert!(fs.is_dir("/mirror/a/b/c"));
        assert!(fs.is_dir("/mirror/d"));
        assert!(!fs.exists("/mirror/a/b/c/file.txt"));
        assert_eq!(outcome.created_dirs, 5);
    }

    #[test]
    fn init_depth_limits_the_structure() {
        let fs = target();
        let mut cfg = config();
        cfg.init_depth = 0;
        create_mirror_structure(&fs, &cfg, &CancelToken::new(), &mut Outcome::default()).unwrap();

        assert!(fs.is_dir("/mirror/a"));
        assert!(fs.is_dir("/mirror/d"));
        assert!(!fs.exists("/mirror/a/b"));
    }

    #[test]
    fn empty_existing_mirror_is_rebuilt() {
        let fs = target();
        fs.add_dir("/mirror/stale/dir");
        create_mirror_structure(&fs, &config(), &CancelToken::new(), &mut Outcome::default()).unwrap();
        assert!(!fs.exists("/mirror/stale"));
        assert!(fs.is_dir("/mirror/a/b/c"));
    }

    #[test]
    fn mirror_with_files_is_refused() {
        let fs = target();
        fs.add_file("/mirror/x/pending.txt", "data");
        let err = create_mirror_structure(&fs, &config(), &CancelToken::new(), &mut Outcome::default())
            .unwrap_err();
        assert!(matches!(err, ShuttleError::MirrorNotEmpty(_)));
        assert_eq!(fs.read("/mirror/x/pending.txt").unwrap(), b"data");
    }

    #[test]
    fn mirror_parent_must_be_a_directory() {
        let fs = target();
        let mut cfg = config();
        cfg.mirror_root = "/nowhere/mirror".into();
        let err = create_mirror_structure(&fs, &cfg, &CancelToken::new(), &mut Outcome::default())
            .unwrap_err();
        assert!(matches!(err, ShuttleError::MirrorParentNotExist(_)));

        fs.add_file("/file", "x");
        cfg.mirror_root = "/file/mirror".into();
        let err = create_mirror_structure(&fs, &cfg, &CancelToken::new(), &mut Outcome::default())
            .unwrap_err();
        assert!(matches!(err, ShuttleError::MirrorParentNotDir(_)));
    }

    #[test]
    fn nested_mirror_root_is_not_mirrored_into_itself() {
        let fs = target();
        let mut cfg = config();
        cfg.mirror_root = "/real/mirror".into();
        create_mirror_structure(&fs, &cfg, &CancelToken::new(), &mut Outcome::default()).unwrap();

        assert!(fs.is_dir("/real/mirror/a/b/c"));
        assert!(!fs.exists("/real/mirror/mirror"));
    }

    #[test]
    fn excluded_directories_are_skipped() {
        let fs = target();
        let mut cfg = config();
        cfg.excludes = vec!["/real/a/b".into()];
        create_mirror_structure(&fs, &cfg, &CancelToken::new(), &mut Outcome::default()).unwrap();

        assert!(fs.is_dir("/mirror/a"));
        assert!(!fs.exists("/mirror/a/b"));
    }

    #[test]
    fn dry_run_changes_nothing() {
        let fs = target();
        fs.add_dir("/mirror/old");
        let mut cfg = config();
        cfg.dry_run = true;
        let before = fs.paths();

        create_mirror_structure(&fs, &cfg, &CancelToken::new(), &mut Outcome::default()).unwrap();
        assert_eq!(fs.paths(), before);
    }

    #[test]
    fn emptiness_check_stops_or_reports() {
        let fs = MemFs::new();
        fs.add_dir("/m/a/b");
        assert!(is_empty_structure(&fs, Path::new("/m"), false, &CancelToken::new()).unwrap());

        fs.add_file("/m/a/one.txt", "1");
        fs.add_file("/m/two.txt", "2");
        assert!(!is_empty_structure(&fs, Path::new("/m"), false, &CancelToken::new()).unwrap());
        assert!(!is_empty_structure(&fs, Path::new("/m"), true, &CancelToken::new()).unwrap());
    }
}
