//! Move mode: walk the mirror tree and promote its files into the target.
//!
//! Every regular file below the mirror root is moved to the same relative
//! location below the target root. Existing target files are never
//! overwritten; such sources stay where they are and the run is flagged as
//! having unmoved files.
//!
//! With `remove_empty` (only together with `skip_empty`), mirror directories
//! that are missing from the target and end up empty are removed after the
//! walk, deepest first.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::exclude::is_excluded;
use super::file_move::{Transfer, TransferOptions, transfer_file};
use super::policy::{FailurePolicy, Flow};
use super::provider::{Filesystem, require_exists};
use super::walk::{EntryKind, WalkEntry};
use crate::config::Config;
use crate::errors::ShuttleError;
use crate::outcome::Outcome;
use crate::shutdown::CancelToken;

const OP: &str = "move";

/// Move all files from `cfg.mirror_root` into `cfg.target_root`.
///
/// Fails up front if either root is missing. Per-entry errors abort the walk
/// unless `cfg.skip_failed` is set; cancellation always aborts.
pub fn move_files<F: Filesystem + ?Sized>(
    fs: &F,
    cfg: &Config,
    cancel: &CancelToken,
    outcome: &mut Outcome,
) -> Result<(), ShuttleError> {
    require_exists(fs, &cfg.mirror_root, ShuttleError::MirrorNotExist)?;
    require_exists(fs, &cfg.target_root, ShuttleError::TargetNotExist)?;

    let mut mover = Mover {
        fs,
        cfg,
        cancel,
        policy: FailurePolicy::new(cfg.skip_failed, OP),
        outcome,
        planned_dirs: HashSet::new(),
        stale_dirs: Vec::new(),
    };

    let mut walk = fs.walk(&cfg.mirror_root);
    loop {
        // Checked before advancing: the next step may list a directory.
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
                let err = ShuttleError::io("walk", err.path, err.source);
                mover.policy.handle(err, false, mover.outcome)?;
                continue;
            }
        };

        if mover.visit(&entry)? == Flow::SkipSubtree && entry.is_dir() {
            walk.skip_subtree();
        }
    }

    mover.remove_stale_dirs()
}

struct Mover<'a, F: Filesystem + ?Sized> {
    fs: &'a F,
    cfg: &'a Config,
    cancel: &'a CancelToken,
    policy: FailurePolicy,
    outcome: &'a mut Outcome,
    /// Directories already reported in a skip-empty dry run.
    planned_dirs: HashSet<PathBuf>,
    /// Mirror directories without a target counterpart, in walk order.
    stale_dirs: Vec<PathBuf>,
}

impl<F: Filesystem + ?Sized> Mover<'_, F> {
    fn visit(&mut self, entry: &WalkEntry) -> Result<Flow, ShuttleError> {
        let path = entry.path.as_path();
        let skip = if entry.is_dir() {
            Flow::SkipSubtree
        } else {
            Flow::Continue
        };

        if is_excluded(path, &self.cfg.excludes) {
            warn!(op = OP, path = %path.display(), reason = "is_user_excluded", "path skipped");
            return Ok(skip);
        }

        let move_path = match path.strip_prefix(&self.cfg.mirror_root) {
            Ok(rel) if rel.as_os_str().is_empty() => self.cfg.target_root.clone(),
            Ok(rel) => self.cfg.target_root.join(rel),
            Err(_) => {
                let err = ShuttleError::io(
                    "get relative path",
                    path,
                    io::Error::other("path is outside of the mirror root"),
                );
                return self.policy.handle(err, entry.is_dir(), self.outcome);
            }
        };

        if move_path == self.cfg.mirror_root {
            warn!(op = OP, path = %move_path.display(), reason = "mirror_into_mirror", "path skipped");
            return Ok(skip);
        }

        if is_excluded(&move_path, &self.cfg.excludes) {
            warn!(op = OP, path = %move_path.display(), reason = "is_user_excluded", "path skipped");
            return Ok(skip);
        }

        match entry.kind {
            EntryKind::Dir => self.handle_dir(path, &move_path),
            EntryKind::File => self.handle_file(path, &move_path),
            EntryKind::Other => {
                warn!(op = OP, path = %path.display(), reason = "not_regular_file", "path skipped");
                Ok(Flow::Continue)
            }
        }
    }

    fn handle_dir(&mut self, path: &Path, move_path: &Path) -> Result<Flow, ShuttleError> {
        if self.cfg.skip_empty {
            // Created on demand once a file needs them.
            if self.cfg.remove_empty && path != self.cfg.mirror_root {
                match self.fs.metadata(move_path) {
                    Ok(_) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        self.stale_dirs.push(path.to_path_buf());
                    }
                    Err(e) => {
                        let err = ShuttleError::io("stat", move_path, e);
                        return self.policy.handle(err, true, self.outcome);
                    }
                }
            }
            return Ok(Flow::Continue);
        }

        match self.fs.metadata(move_path) {
            Ok(_) => Ok(Flow::Continue),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if !self.cfg.dry_run {
                    if let Err(e) = self.fs.create_dir(move_path) {
                        let err = ShuttleError::io("create", move_path, e);
                        return self.policy.handle(err, true, self.outcome);
                    }
                    self.outcome.created_dirs += 1;
                }
                info!(op = OP, path = %move_path.display(), dry_run = self.cfg.dry_run, "directory created");
                Ok(Flow::Continue)
            }
            Err(e) => {
                let err = ShuttleError::io("stat", move_path, e);
                self.policy.handle(err, true, self.outcome)
            }
        }
    }

    fn handle_file(&mut self, src: &Path, dst: &Path) -> Result<Flow, ShuttleError> {
        match self.fs.metadata(dst) {
            Ok(_) => {
                self.outcome.has_unmoved_files = true;
                warn!(
                    op = OP,
                    src = %src.display(),
                    dst = %dst.display(),
                    action = "skipped",
                    "target already exists"
                );
                return Ok(Flow::Continue);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                let err = ShuttleError::io("stat", dst, e);
                return self.policy.handle(err, false, self.outcome);
            }
        }

        if self.cfg.skip_empty {
            if let Err(err) = self.ensure_parents(dst) {
                return self.policy.handle(err, false, self.outcome);
            }
        }

        if self.cfg.dry_run {
            info!(
                op = OP,
                mode = "",
                src = %src.display(),
                dst = %dst.display(),
                dry_run = true,
                "file moved"
            );
            return Ok(Flow::Continue);
        }

        let opts = TransferOptions {
            direct: self.cfg.direct,
            verify: self.cfg.verify,
        };
        match transfer_file(self.fs, src, dst, opts, self.cancel) {
            Ok(transfer) => {
                self.outcome.moved_files += 1;
                self.log_moved(src, dst, &transfer);
                Ok(Flow::Continue)
            }
            Err(source) => {
                let err = ShuttleError::Move {
                    src: src.to_path_buf(),
                    dst: dst.to_path_buf(),
                    source: Box::new(source),
                };
                self.policy.handle(err, false, self.outcome)
            }
        }
    }

    /// Create the missing directories between the target root and `dst`.
    fn ensure_parents(&mut self, dst: &Path) -> Result<(), ShuttleError> {
        let root = &self.cfg.target_root;
        let mut missing = Vec::new();

        if let Some(parent) = dst.parent() {
            for anc in parent.ancestors() {
                if anc == root.as_path() || !anc.starts_with(root) || self.planned_dirs.contains(anc) {
                    break;
                }
                match self.fs.metadata(anc) {
                    Ok(_) => break,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => missing.push(anc.to_path_buf()),
                    Err(e) => return Err(ShuttleError::io("stat", anc, e)),
                }
            }
        }

        for dir in missing.into_iter().rev() {
            if self.cfg.dry_run {
                info!(op = OP, path = %dir.display(), dry_run = true, "directory created");
                self.planned_dirs.insert(dir);
                continue;
            }
            self.fs
                .create_dir(&dir)
                .map_err(|e| ShuttleError::io("create", &dir, e))?;
            self.outcome.created_dirs += 1;
            info!(op = OP, path = %dir.display(), dry_run = false, "directory created");
        }
        Ok(())
    }

    /// Remove recorded stale directories that are (now) empty and still have
    /// no counterpart in the target. Children come before their parents.
    fn remove_stale_dirs(&mut self) -> Result<(), ShuttleError> {
        let stale = std::mem::take(&mut self.stale_dirs);
        for dir in stale.iter().rev() {
            if self.cancel.is_requested() {
                return Err(ShuttleError::Cancelled);
            }
            if let Err(err) = self.remove_if_stale(dir) {
                self.policy.handle(err, false, self.outcome)?;
            }
        }
        Ok(())
    }

    fn remove_if_stale(&self, dir: &Path) -> Result<(), ShuttleError> {
        let Ok(rel) = dir.strip_prefix(&self.cfg.mirror_root) else {
            return Ok(());
        };
        let move_path = self.cfg.target_root.join(rel);
        // A moved file may have brought the target directory into existence.
        match self.fs.metadata(&move_path) {
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(ShuttleError::io("stat", &move_path, e)),
        }

        match self.fs.walk(dir).nth(1) {
            None => {}
            Some(Ok(_)) => return Ok(()),
            Some(Err(err)) => return Err(ShuttleError::io("walk", err.path, err.source)),
        }

        if !self.cfg.dry_run {
            match self.fs.remove_dir(dir) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(ShuttleError::io("remove", dir, e)),
            }
        }
        info!(
            op = OP,
            path = %dir.display(),
            reason = "not_in_target",
            dry_run = self.cfg.dry_run,
            "empty directory removed"
        );
        Ok(())
    }

    fn log_moved(&self, src: &Path, dst: &Path, transfer: &Transfer) {
        match transfer {
            Transfer::Renamed => info!(
                op = OP,
                mode = transfer.mode(),
                src = %src.display(),
                dst = %dst.display(),
                dry_run = false,
                "file moved"
            ),
            Transfer::Copied(hashes) => info!(
                op = OP,
                mode = transfer.mode(),
                src = %src.display(),
                dst = %dst.display(),
                src_hash = %hashes.src_hash,
                dst_hash = %hashes.dst_hash,
                verify_hash = hashes.verify_hash.as_deref().unwrap_or(""),
                verify = self.cfg.verify,
                dry_run = false,
                "file moved"
            ),
        }
    }
}
