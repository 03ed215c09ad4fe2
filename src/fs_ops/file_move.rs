//! Single file transfer.
//!
//! Moves one file from `src` to `dst` (whose parent must already exist):
//! optionally via a direct rename, otherwise by copying into
//! `<dst>.mirsht` while hashing both sides, syncing, comparing digests,
//! renaming the temporary file over `dst`, optionally re-reading `dst` for a
//! verify pass, and finally removing `src`.
//!
//! Until the temporary file is renamed into place, a failure removes it again,
//! but only while `src` is known to still exist.

use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use super::helpers::{error_hint, is_cross_device};
use super::io_copy::{CopyResult, copy_hashed, hash_stream};
use super::provider::{Filesystem, WriteFile};
use crate::errors::ShuttleError;
use crate::shutdown::CancelToken;

/// Suffix of in-flight temporary files. A stray `<file>.mirsht` is left over
/// from an interrupted run and is safe to overwrite.
pub const TEMP_SUFFIX: &str = ".mirsht";

/// Path of the temporary file used while transferring to `dst`.
pub fn temp_path_for(dst: &Path) -> PathBuf {
    let mut s = dst.as_os_str().to_owned();
    s.push(TEMP_SUFFIX);
    PathBuf::from(s)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferOptions {
    /// Try an atomic rename before copying.
    pub direct: bool,
    /// Re-read the committed destination and compare digests.
    pub verify: bool,
}

/// SHA-256 digests (hex) of a copy-based transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileHashes {
    pub src_hash: String,
    pub dst_hash: String,
    /// Only set when the verify pass ran.
    pub verify_hash: Option<String>,
}

/// How a file got to its destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transfer {
    Renamed,
    Copied(FileHashes),
}

impl Transfer {
    /// Value of the `mode` log field.
    pub fn mode(&self) -> &'static str {
        match self {
            Transfer::Renamed => "direct",
            Transfer::Copied(_) => "c+r",
        }
    }
}

/// Move `src` to `dst`.
///
/// On success `src` is gone and `dst` holds identical content. On failure
/// before the commit `src` is untouched and no temporary file remains. A
/// verify mismatch or a failed source removal leaves both copies in place.
pub fn transfer_file<F: Filesystem + ?Sized>(
    fs: &F,
    src: &Path,
    dst: &Path,
    opts: TransferOptions,
    cancel: &CancelToken,
) -> Result<Transfer, ShuttleError> {
    if opts.direct {
        match fs.rename(src, dst) {
            Ok(()) => return Ok(Transfer::Renamed),
            Err(e) => {
                debug!(
                    op = "move",
                    src = %src.display(),
                    dst = %dst.display(),
                    error = %e,
                    cross_device = is_cross_device(&e),
                    hint = error_hint(&e).unwrap_or("falling back to copy"),
                    "direct rename failed, using copy and remove"
                );
            }
        }
    }

    copy_and_remove(fs, src, dst, opts.verify, cancel).map(Transfer::Copied)
}

fn copy_and_remove<F: Filesystem + ?Sized>(
    fs: &F,
    src: &Path,
    dst: &Path,
    verify: bool,
    cancel: &CancelToken,
) -> Result<FileHashes, ShuttleError> {
    let tmp = temp_path_for(dst);

    let reader = fs.open(src).map_err(|e| ShuttleError::io("open", src, e))?;
    let writer = fs
        .create(&tmp)
        .map_err(|e| ShuttleError::io("create", &tmp, e))?;
    let mut guard = TempFileGuard::new(fs, src, &tmp);

    // Both handles are closed by the time this returns.
    let copied = copy_to_temp(reader, writer, &tmp, cancel)?;
    check_in_memory_digests(&copied)?;

    fs.rename(&tmp, dst).map_err(|source| ShuttleError::Rename {
        from: tmp.clone(),
        to: dst.to_path_buf(),
        source,
    })?;
    guard.commit();

    let mut hashes = FileHashes {
        src_hash: copied.src_hash,
        dst_hash: copied.dst_hash,
        verify_hash: None,
    };

    if verify {
        let verifier = fs
            .open(dst)
            .map_err(|e| ShuttleError::io("re-open for --verify pass", dst, e))?;
        let verify_hash = hash_stream(verifier, cancel)
            .map_err(|e| ShuttleError::io("re-read for --verify pass", dst, e))?;
        if verify_hash != hashes.src_hash {
            return Err(ShuttleError::VerifyHashMismatch {
                src_hash: hashes.src_hash,
                verify_hash,
            });
        }
        hashes.verify_hash = Some(verify_hash);
    }

    fs.remove_file(src)
        .map_err(|source| ShuttleError::SourceRemoval {
            path: src.to_path_buf(),
            source,
        })?;

    Ok(hashes)
}

/// Compare the digests taken on both sides of the copy. Both see the same
/// buffer, so a mismatch means memory corruption between read and write.
fn check_in_memory_digests(copied: &CopyResult) -> Result<(), ShuttleError> {
    if copied.src_hash != copied.dst_hash {
        return Err(ShuttleError::MemoryHashMismatch {
            src_hash: copied.src_hash.clone(),
            dst_hash: copied.dst_hash.clone(),
        });
    }
    Ok(())
}

fn copy_to_temp(
    reader: Box<dyn Read + '_>,
    mut writer: Box<dyn WriteFile + '_>,
    tmp: &Path,
    cancel: &CancelToken,
) -> Result<CopyResult, ShuttleError> {
    let copied = copy_hashed(reader, &mut *writer, cancel)
        .map_err(|e| ShuttleError::io("copy into", tmp, e))?;
    writer
        .sync_all()
        .map_err(|e| ShuttleError::io("sync", tmp, e))?;
    drop(writer);
    Ok(copied)
}

/// Removes an uncommitted temporary file when dropped.
struct TempFileGuard<'a, F: Filesystem + ?Sized> {
    fs: &'a F,
    src: &'a Path,
    tmp: &'a Path,
    committed: bool,
}

impl<'a, F: Filesystem + ?Sized> TempFileGuard<'a, F> {
    fn new(fs: &'a F, src: &'a Path, tmp: &'a Path) -> Self {
        Self {
            fs,
            src,
            tmp,
            committed: false,
        }
    }

    fn commit(&mut self) {
        self.committed = true;
    }
}

impl<F: Filesystem + ?Sized> Drop for TempFileGuard<'_, F> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }

        // Without a source the temporary file may be the only copy left.
        match self.fs.metadata(self.src) {
            Ok(_) => match self.fs.remove_file(self.tmp) {
                Ok(()) => {
                    info!(op = "move_cleanup", path = %self.tmp.display(), "incomplete file removed");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    error!(
                        op = "move_cleanup",
                        path = %self.tmp.display(),
                        error = %e,
                        reason = "error_occurred",
                        "incomplete file not removed"
                    );
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(op = "move_cleanup", path = %self.src.display(), "file not found");
                warn!(
                    op = "move_cleanup",
                    path = %self.tmp.display(),
                    reason = "src_no_longer_exists",
                    "incomplete file not removed"
                );
            }
            Err(e) => {
                error!(op = "move_cleanup", path = %self.src.display(), error = %e, "failed to stat");
                for path in [self.src, self.tmp] {
                    warn!(
                        op = "move_cleanup",
                        path = %path.display(),
                        reason = "src_existence_unknown",
                        "incomplete file not removed"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs_ops::memfs::{FaultOp, MemFs};

    fn setup(contents: &str) -> MemFs {
        let fs = MemFs::new();
        fs.add_file("/mirror/file.txt", contents);
        fs.add_dir("/real");
        fs
    }

    fn run(fs: &MemFs, opts: TransferOptions, cancel: &CancelToken) -> Result<Transfer, ShuttleError> {
        transfer_file(
            fs,
            Path::new("/mirror/file.txt"),
            Path::new("/real/file.txt"),
            opts,
            cancel,
        )
    }

    #[test]
    fn temp_path_appends_suffix() {
        assert_eq!(
            temp_path_for(Path::new("/real/a.txt")),
            PathBuf::from("/real/a.txt.mirsht")
        );
    }

    #[test]
    fn copy_path_moves_and_reports_hashes() {
        let fs = setup("content");
        let out = run(&fs, TransferOptions::default(), &CancelToken::new()).unwrap();

        let Transfer::Copied(hashes) = out else {
            panic!("expected a copy-based transfer");
        };
        assert_eq!(hashes.src_hash, hashes.dst_hash);
        assert!(hashes.verify_hash.is_none());
        assert_eq!(fs.read("/real/file.txt").unwrap(), b"content");
        assert!(!fs.exists("/mirror/file.txt"));
        assert!(!fs.exists("/real/file.txt.mirsht"));
    }

    #[test]
    fn verify_pass_fills_the_third_hash() {
        let fs = setup("content");
        let opts = TransferOptions {
            direct: false,
            verify: true,
        };
        let Transfer::Copied(hashes) = run(&fs, opts, &CancelToken::new()).unwrap() else {
            panic!("expected a copy-based transfer");
        };
        assert_eq!(hashes.verify_hash.as_deref(), Some(hashes.src_hash.as_str()));
    }

    #[test]
    fn stale_temp_file_is_overwritten() {
        let fs = setup("fresh");
        fs.add_file("/real/file.txt.mirsht", "stale leftover from a crash");
        run(&fs, TransferOptions::default(), &CancelToken::new()).unwrap();
        assert_eq!(fs.read("/real/file.txt").unwrap(), b"fresh");
        assert!(!fs.exists("/real/file.txt.mirsht"));
    }

    #[test]
    fn direct_mode_renames() {
        let fs = setup("content");
        let opts = TransferOptions {
            direct: true,
            verify: false,
        };
        assert_eq!(run(&fs, opts, &CancelToken::new()).unwrap(), Transfer::Renamed);
        assert_eq!(fs.read("/real/file.txt").unwrap(), b"content");
        assert!(!fs.exists("/mirror/file.txt"));
    }

    #[test]
    fn failed_direct_rename_falls_back_to_copy() {
        let fs = setup("content");
        fs.fail_on(FaultOp::Rename, "/mirror/");
        let opts = TransferOptions {
            direct: true,
            verify: false,
        };
        let out = run(&fs, opts, &CancelToken::new()).unwrap();
        assert_eq!(out.mode(), "c+r");
        assert!(!fs.exists("/mirror/file.txt"));
    }

    #[test]
    fn cancellation_mid_copy_cleans_up() {
        let fs = setup("content");
        let token = CancelToken::new();
        fs.cancel_after_first_read("/mirror/file.txt", token.clone());

        let err = run(&fs, TransferOptions::default(), &token).unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(fs.read("/mirror/file.txt").unwrap(), b"content");
        assert!(!fs.exists("/real/file.txt.mirsht"));
        assert!(!fs.exists("/real/file.txt"));
    }

    #[test]
    fn failed_commit_rename_removes_temp() {
        let fs = setup("content");
        fs.fail_on(FaultOp::Rename, ".mirsht");

        let err = run(&fs, TransferOptions::default(), &CancelToken::new()).unwrap_err();
        assert!(matches!(err, ShuttleError::Rename { .. }));
        assert!(fs.exists("/mirror/file.txt"));
        assert!(!fs.exists("/real/file.txt.mirsht"));
        assert!(!fs.exists("/real/file.txt"));
    }

    #[test]
    fn open_and_create_failures_leave_source_alone() {
        let fs = setup("content");
        fs.fail_on(FaultOp::Create, ".mirsht");
        let err = run(&fs, TransferOptions::default(), &CancelToken::new()).unwrap_err();
        assert!(matches!(err, ShuttleError::Io { op: "create", .. }));
        assert!(fs.exists("/mirror/file.txt"));

        let fs = setup("content");
        fs.fail_on(FaultOp::Open, "/mirror/file.txt");
        let err = run(&fs, TransferOptions::default(), &CancelToken::new()).unwrap_err();
        assert!(matches!(err, ShuttleError::Io { op: "open", .. }));
        assert!(!fs.exists("/real/file.txt.mirsht"));
    }

    #[test]
    fn storage_corruption_is_caught_by_verify_and_keeps_both_copies() {
        let fs = setup("content");
        fs.fail_on(FaultOp::CorruptWrite, ".mirsht");
        let opts = TransferOptions {
            direct: false,
            verify: true,
        };

        let err = run(&fs, opts, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, ShuttleError::VerifyHashMismatch { .. }));
        assert!(err.is_integrity());
        assert_eq!(fs.read("/mirror/file.txt").unwrap(), b"content");
        assert!(fs.exists("/real/file.txt"));
    }

    #[test]
    fn failed_source_removal_is_reported() {
        let fs = setup("content");
        fs.fail_on(FaultOp::Remove, "/mirror/file.txt");

        let err = run(&fs, TransferOptions::default(), &CancelToken::new()).unwrap_err();
        assert!(matches!(err, ShuttleError::SourceRemoval { .. }));
        assert!(fs.exists("/mirror/file.txt"));
        assert_eq!(fs.read("/real/file.txt").unwrap(), b"content");
    }

    #[test]
    fn guard_keeps_temp_when_source_vanished() {
        let fs = MemFs::new();
        fs.add_file("/real/file.txt.mirsht", "partial");
        {
            let _guard = TempFileGuard::new(
                &fs,
                Path::new("/mirror/gone.txt"),
                Path::new("/real/file.txt.mirsht"),
            );
        }
        assert!(fs.exists("/real/file.txt.mirsht"));
    }

    #[test]
    fn guard_keeps_both_when_source_state_is_unknown() {
        let fs = MemFs::new();
        fs.add_file("/mirror/file.txt", "x");
        fs.add_file("/real/file.txt.mirsht", "partial");
        fs.fail_on(FaultOp::Stat, "/mirror/file.txt");
        {
            let _guard = TempFileGuard::new(
                &fs,
                Path::new("/mirror/file.txt"),
                Path::new("/real/file.txt.mirsht"),
            );
        }
        assert!(fs.exists("/mirror/file.txt"));
        assert_eq!(fs.read("/real/file.txt.mirsht").unwrap(), b"partial");
    }

    #[test]
    fn failed_commit_with_unknown_source_leaves_temp() {
        let fs = setup("content");
        fs.fail_on(FaultOp::Rename, ".mirsht");
        fs.fail_on(FaultOp::Stat, "/mirror/file.txt");

        let err = run(&fs, TransferOptions::default(), &CancelToken::new()).unwrap_err();
        assert!(matches!(err, ShuttleError::Rename { .. }));
        assert_eq!(fs.read("/real/file.txt.mirsht").unwrap(), b"content");
        assert!(fs.exists("/mirror/file.txt"));
        assert!(!fs.exists("/real/file.txt"));
    }

    #[test]
    fn diverging_copy_digests_are_an_integrity_error() {
        let copied = CopyResult {
            bytes: 7,
            src_hash: "aa".repeat(32),
            dst_hash: "bb".repeat(32),
        };
        let err = check_in_memory_digests(&copied).unwrap_err();
        assert!(matches!(err, ShuttleError::MemoryHashMismatch { .. }));
        assert!(err.is_integrity());

        let same = CopyResult {
            dst_hash: copied.src_hash.clone(),
            ..copied
        };
        assert!(check_in_memory_digests(&same).is_ok());
    }

    #[test]
    fn committed_guard_does_nothing() {
        let fs = MemFs::new();
        fs.add_file("/mirror/file.txt", "x");
        fs.add_file("/real/file.txt.mirsht", "y");
        {
            let mut guard = TempFileGuard::new(
                &fs,
                Path::new("/mirror/file.txt"),
                Path::new("/real/file.txt.mirsht"),
            );
            guard.commit();
        }
        assert!(fs.exists("/real/file.txt.mirsht"));
    }
}
