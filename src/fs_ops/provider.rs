//! Filesystem capability interface.
//!
//! The engine only talks to the disk through [`Filesystem`], so the same code
//! runs against the real filesystem ([`OsFs`]) and against the in-memory
//! double used for fault injection (`MemFs`).

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::walk::{EntryKind, Metadata, TreeWalk, WalkEntry, WalkError, WalkItem};
use crate::errors::ShuttleError;

/// A writable file handle that can be forced to stable storage.
pub trait WriteFile: Write {
    fn sync_all(&mut self) -> io::Result<()>;
}

impl WriteFile for File {
    fn sync_all(&mut self) -> io::Result<()> {
        File::sync_all(self)
    }
}

/// The narrow set of filesystem operations the engine consumes.
pub trait Filesystem {
    /// Stat without following a final symlink.
    fn metadata(&self, path: &Path) -> io::Result<Metadata>;
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + '_>>;
    /// Create or truncate a file for writing.
    fn create(&self, path: &Path) -> io::Result<Box<dyn WriteFile + '_>>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    /// Create a single directory; its parent must exist.
    fn create_dir(&self, path: &Path) -> io::Result<()>;
    /// Remove a single directory; it must be empty.
    fn remove_dir(&self, path: &Path) -> io::Result<()>;
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
    fn walk<'a>(&'a self, root: &Path) -> Box<dyn TreeWalk + 'a>;
}

/// Fail with `missing(path)` unless `path` exists.
pub(crate) fn require_exists<F: Filesystem + ?Sized>(
    fs: &F,
    path: &Path,
    missing: fn(PathBuf) -> ShuttleError,
) -> Result<(), ShuttleError> {
    match fs.metadata(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(missing(path.to_path_buf())),
        Err(e) => Err(ShuttleError::io("stat", path, e)),
    }
}

/// The real filesystem. Permissions of created entries follow the umask.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

fn kind_of(ft: fs::FileType) -> EntryKind {
    if ft.is_dir() {
        EntryKind::Dir
    } else if ft.is_file() {
        EntryKind::File
    } else {
        EntryKind::Other
    }
}

impl Filesystem for OsFs {
    fn metadata(&self, path: &Path) -> io::Result<Metadata> {
        let meta = fs::symlink_metadata(path)?;
        Ok(Metadata {
            kind: kind_of(meta.file_type()),
        })
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(File::open(path)?))
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn WriteFile + '_>> {
        Ok(Box::new(File::create(path)?))
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)?;

        // Unix: fsync the destination directory to persist the rename (best-effort).
        #[cfg(unix)]
        if let Some(parent) = to.parent() {
            let _ = File::open(parent).and_then(|d| d.sync_all());
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }

    fn walk<'a>(&'a self, root: &Path) -> Box<dyn TreeWalk + 'a> {
        Box::new(OsWalk {
            inner: WalkDir::new(root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter(),
        })
    }
}

/// `walkdir` adapter. `skip_current_dir` only has subtree semantics right
/// after a directory was yielded, which is the `TreeWalk` contract.
struct OsWalk {
    inner: walkdir::IntoIter,
}

impl Iterator for OsWalk {
    type Item = WalkItem;

    fn next(&mut self) -> Option<WalkItem> {
        Some(match self.inner.next()? {
            Ok(entry) => {
                let kind = kind_of(entry.file_type());
                let depth = entry.depth();
                Ok(WalkEntry {
                    path: entry.into_path(),
                    kind,
                    depth,
                })
            }
            Err(err) => {
                let path = err.path().map(Path::to_path_buf).unwrap_or_else(PathBuf::new);
                let source = err
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
                Err(WalkError { path, source })
            }
        })
    }
}

impl TreeWalk for OsWalk {
    fn skip_subtree(&mut self) {
        self.inner.skip_current_dir();
    }
}
