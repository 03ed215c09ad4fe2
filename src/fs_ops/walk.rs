//! Tree traversal abstraction.
//!
//! A `TreeWalk` yields entries depth-first in pre-order, siblings sorted by
//! file name, and lets the consumer skip the subtree below the directory it
//! was just handed. Symlinks are reported as `EntryKind::Other` and never
//! followed.

use std::io;
use std::path::{Path, PathBuf};

/// Type of a filesystem entry, as seen without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Dir,
    File,
    /// Symlinks, sockets, devices and the like.
    Other,
}

/// The subset of metadata the engine needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub kind: EntryKind,
}

impl Metadata {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// One visited entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
    /// 0 for the walk root.
    pub depth: usize,
}

impl WalkEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// A traversal failure for a single entry or directory listing.
#[derive(Debug)]
pub struct WalkError {
    pub path: PathBuf,
    pub source: io::Error,
}

impl WalkError {
    /// The entry vanished between being listed and being visited.
    pub fn is_not_found(&self) -> bool {
        self.source.kind() == io::ErrorKind::NotFound
    }
}

pub type WalkItem = Result<WalkEntry, WalkError>;

/// Pre-order, depth-first traversal with subtree skipping.
pub trait TreeWalk: Iterator<Item = WalkItem> {
    /// Do not descend into the directory most recently yielded.
    /// Must only be called right after a directory entry was yielded.
    fn skip_subtree(&mut self);
}

/// Listing primitives a [`StackWalk`] is built on.
pub trait DirLister {
    fn stat(&self, path: &Path) -> io::Result<Metadata>;
    /// Direct children of `dir`, in any order.
    fn list(&self, dir: &Path) -> io::Result<Vec<(PathBuf, EntryKind)>>;
}

/// Explicit-stack walker over any [`DirLister`].
///
/// A directory is listed lazily on the call to `next()` after it was yielded,
/// so `skip_subtree()` prevents the listing altogether.
pub struct StackWalk<'a, L: DirLister + ?Sized> {
    lister: &'a L,
    root: Option<PathBuf>,
    pending: Option<(PathBuf, usize)>,
    stack: Vec<std::vec::IntoIter<WalkEntry>>,
}

impl<'a, L: DirLister + ?Sized> StackWalk<'a, L> {
    pub fn new(lister: &'a L, root: &Path) -> Self {
        Self {
            lister,
            root: Some(root.to_path_buf()),
            pending: None,
            stack: Vec::new(),
        }
    }
}

impl<L: DirLister + ?Sized> Iterator for StackWalk<'_, L> {
    type Item = WalkItem;

    fn next(&mut self) -> Option<WalkItem> {
        if let Some(root) = self.root.take() {
            return Some(match self.lister.stat(&root) {
                Ok(meta) => {
                    if meta.is_dir() {
                        self.pending = Some((root.clone(), 0));
                    }
                    Ok(WalkEntry {
                        path: root,
                        kind: meta.kind,
                        depth: 0,
                    })
                }
                Err(source) => Err(WalkError { path: root, source }),
            });
        }

        if let Some((dir, depth)) = self.pending.take() {
            match self.lister.list(&dir) {
                Ok(mut children) => {
                    children.sort_by(|a, b| a.0.file_name().cmp(&b.0.file_name()));
                    let entries: Vec<WalkEntry> = children
                        .into_iter()
                        .map(|(path, kind)| WalkEntry {
                            path,
                            kind,
                            depth: depth + 1,
                        })
                        .collect();
                    self.stack.push(entries.into_iter());
                }
                Err(source) => return Some(Err(WalkError { path: dir, source })),
            }
        }

        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(entry) => {
                    if entry.is_dir() {
                        self.pending = Some((entry.path.clone(), entry.depth));
                    }
                    return Some(Ok(entry));
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

impl<L: DirLister + ?Sized> TreeWalk for StackWalk<'_, L> {
    fn skip_subtree(&mut self) {
        self.pending = None;
    }
}
