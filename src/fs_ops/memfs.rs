//! In-memory filesystem with fault injection.
//!
//! `MemFs` implements [`Filesystem`] over a path map so the engine can be
//! exercised without touching the disk: renames that always fail, unreadable
//! directories, corrupted writes, or a cancellation tripped halfway through a
//! copy. Faults are keyed by a substring of the path they apply to.

use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::provider::{Filesystem, WriteFile};
use super::walk::{DirLister, EntryKind, Metadata, StackWalk, TreeWalk};
use crate::shutdown::CancelToken;

/// Operations a fault can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOp {
    /// Stat of the path itself (not the stat done by a walk).
    Stat,
    Open,
    Create,
    Rename,
    Remove,
    CreateDir,
    /// Listing a directory during a walk.
    List,
    /// Writes succeed but store flipped bytes.
    CorruptWrite,
}

type Data = Arc<Mutex<Vec<u8>>>;

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Data),
}

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<PathBuf, Node>,
    faults: Vec<(FaultOp, String)>,
    cancel_on_read: Vec<(String, CancelToken)>,
}

impl State {
    fn faulty(&self, op: FaultOp, path: &Path) -> bool {
        let s = path.to_string_lossy();
        self.faults
            .iter()
            .any(|(o, pat)| *o == op && s.contains(pat.as_str()))
    }

    fn parent_is_dir(&self, path: &Path) -> bool {
        match path.parent() {
            Some(parent) => matches!(self.nodes.get(parent), Some(Node::Dir)),
            None => false,
        }
    }
}

fn lock_data(data: &Data) -> MutexGuard<'_, Vec<u8>> {
    data.lock().unwrap_or_else(|e| e.into_inner())
}

fn injected(op: FaultOp, path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::PermissionDenied,
        format!("injected {op:?} fault: {}", path.display()),
    )
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such file or directory: {}", path.display()),
    )
}

/// In-memory [`Filesystem`]. The root `/` always exists.
#[derive(Debug)]
pub struct MemFs {
    state: Mutex<State>,
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemFs {
    pub fn new() -> Self {
        let mut state = State::default();
        state.nodes.insert(PathBuf::from("/"), Node::Dir);
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lookup(&self, path: &Path) -> io::Result<Metadata> {
        match self.lock().nodes.get(path) {
            Some(Node::Dir) => Ok(Metadata {
                kind: EntryKind::Dir,
            }),
            Some(Node::File(_)) => Ok(Metadata {
                kind: EntryKind::File,
            }),
            None => Err(not_found(path)),
        }
    }

    /// Create a directory and any missing ancestors.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut state = self.lock();
        for anc in path.as_ref().ancestors() {
            if anc.as_os_str().is_empty() {
                continue;
            }
            state.nodes.entry(anc.to_path_buf()).or_insert(Node::Dir);
        }
    }

    /// Create (or replace) a file, creating missing ancestors.
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.lock().nodes.insert(
            path.to_path_buf(),
            Node::File(Arc::new(Mutex::new(contents.as_ref().to_vec()))),
        );
    }

    /// Contents of a file, or None if it is missing or a directory.
    pub fn read(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.lock().nodes.get(path.as_ref()) {
            Some(Node::File(data)) => Some(lock_data(data).clone()),
            _ => None,
        }
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.lock().nodes.contains_key(path.as_ref())
    }

    pub fn is_dir(&self, path: impl AsRef<Path>) -> bool {
        matches!(self.lock().nodes.get(path.as_ref()), Some(Node::Dir))
    }

    /// Every path currently present, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().nodes.keys().cloned().collect()
    }

    /// Make `op` fail for every path containing `pattern`.
    pub fn fail_on(&self, op: FaultOp, pattern: &str) {
        self.lock().faults.push((op, pattern.to_string()));
    }

    /// Trip `token` once the first chunk of a matching file has been read.
    pub fn cancel_after_first_read(&self, pattern: &str, token: CancelToken) {
        self.lock().cancel_on_read.push((pattern.to_string(), token));
    }
}

/// Reader over a snapshot of a file's bytes.
struct MemReader {
    inner: Cursor<Vec<u8>>,
    trip: Option<CancelToken>,
}

impl Read for MemReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            if let Some(token) = &self.trip {
                token.request();
            }
        }
        Ok(n)
    }
}

/// Appends into the shared buffer of a file node.
struct MemWriter {
    data: Data,
    corrupt: bool,
}

impl Write for MemWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut data = lock_data(&self.data);
        if self.corrupt {
            data.extend(buf.iter().map(|b| !b));
        } else {
            data.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl WriteFile for MemWriter {
    fn sync_all(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl DirLister for MemFs {
    fn stat(&self, path: &Path) -> io::Result<Metadata> {
        self.lookup(path)
    }

    fn list(&self, dir: &Path) -> io::Result<Vec<(PathBuf, EntryKind)>> {
        let state = self.lock();
        if state.faulty(FaultOp::List, dir) {
            return Err(injected(FaultOp::List, dir));
        }
        match state.nodes.get(dir) {
            Some(Node::Dir) => {}
            Some(Node::File(_)) => return Err(io::Error::other("not a directory")),
            None => return Err(not_found(dir)),
        }
        Ok(state
            .nodes
            .iter()
            .filter(|(p, _)| p.parent() == Some(dir) && p.as_path() != dir)
            .map(|(p, n)| {
                let kind = match n {
                    Node::Dir => EntryKind::Dir,
                    Node::File(_) => EntryKind::File,
                };
                (p.clone(), kind)
            })
            .collect())
    }
}

impl Filesystem for MemFs {
    fn metadata(&self, path: &Path) -> io::Result<Metadata> {
        if self.lock().faulty(FaultOp::Stat, path) {
            return Err(injected(FaultOp::Stat, path));
        }
        self.lookup(path)
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        let state = self.lock();
        if state.faulty(FaultOp::Open, path) {
            return Err(injected(FaultOp::Open, path));
        }
        let bytes = match state.nodes.get(path) {
            Some(Node::File(data)) => lock_data(data).clone(),
            Some(Node::Dir) => return Err(io::Error::other("is a directory")),
            None => return Err(not_found(path)),
        };
        let s = path.to_string_lossy();
        let trip = state
            .cancel_on_read
            .iter()
            .find(|(pat, _)| s.contains(pat.as_str()))
            .map(|(_, token)| token.clone());
        Ok(Box::new(MemReader {
            inner: Cursor::new(bytes),
            trip,
        }))
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn WriteFile + '_>> {
        let mut state = self.lock();
        if state.faulty(FaultOp::Create, path) {
            return Err(injected(FaultOp::Create, path));
        }
        if !state.parent_is_dir(path) {
            return Err(not_found(path));
        }
        if matches!(state.nodes.get(path), Some(Node::Dir)) {
            return Err(io::Error::other("is a directory"));
        }
        let data: Data = Arc::new(Mutex::new(Vec::new()));
        state
            .nodes
            .insert(path.to_path_buf(), Node::File(Arc::clone(&data)));
        let corrupt = state.faulty(FaultOp::CorruptWrite, path);
        Ok(Box::new(MemWriter { data, corrupt }))
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut state = self.lock();
        if state.faulty(FaultOp::Rename, from) || state.faulty(FaultOp::Rename, to) {
            return Err(injected(FaultOp::Rename, from));
        }
        let node = state.nodes.get(from).cloned().ok_or_else(|| not_found(from))?;
        if !state.parent_is_dir(to) {
            return Err(not_found(to));
        }
        match node {
            Node::File(_) => {
                if matches!(state.nodes.get(to), Some(Node::Dir)) {
                    return Err(io::Error::other("is a directory"));
                }
                state.nodes.remove(from);
                state.nodes.insert(to.to_path_buf(), node);
            }
            Node::Dir => {
                if state.nodes.contains_key(to) {
                    return Err(io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        "destination exists",
                    ));
                }
                let moved: Vec<(PathBuf, Node)> = state
                    .nodes
                    .iter()
                    .filter(|(p, _)| p.starts_with(from))
                    .map(|(p, n)| (p.clone(), n.clone()))
                    .collect();
                for (p, n) in moved {
                    state.nodes.remove(&p);
                    if let Ok(rel) = p.strip_prefix(from) {
                        let new_path = if rel.as_os_str().is_empty() {
                            to.to_path_buf()
                        } else {
                            to.join(rel)
                        };
                        state.nodes.insert(new_path, n);
                    }
                }
            }
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        if state.faulty(FaultOp::Remove, path) {
            return Err(injected(FaultOp::Remove, path));
        }
        match state.nodes.get(path) {
            Some(Node::File(_)) => {
                state.nodes.remove(path);
                Ok(())
            }
            Some(Node::Dir) => Err(io::Error::other("is a directory")),
            None => Err(not_found(path)),
        }
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        if state.faulty(FaultOp::CreateDir, path) {
            return Err(injected(FaultOp::CreateDir, path));
        }
        if state.nodes.contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("already exists: {}", path.display()),
            ));
        }
        if !state.parent_is_dir(path) {
            return Err(not_found(path));
        }
        state.nodes.insert(path.to_path_buf(), Node::Dir);
        Ok(())
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        if state.faulty(FaultOp::Remove, path) {
            return Err(injected(FaultOp::Remove, path));
        }
        match state.nodes.get(path) {
            Some(Node::Dir) => {}
            Some(Node::File(_)) => return Err(io::Error::other("not a directory")),
            None => return Err(not_found(path)),
        }
        if state.nodes.keys().any(|p| p.parent() == Some(path)) {
            return Err(io::Error::new(
                io::ErrorKind::DirectoryNotEmpty,
                format!("directory not empty: {}", path.display()),
            ));
        }
        state.nodes.remove(path);
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        if state.faulty(FaultOp::Remove, path) {
            return Err(injected(FaultOp::Remove, path));
        }
        if !state.nodes.contains_key(path) {
            return Err(not_found(path));
        }
        state.nodes.retain(|p, _| !p.starts_with(path));
        Ok(())
    }

    fn walk<'a>(&'a self, root: &Path) -> Box<dyn TreeWalk + 'a> {
        Box::new(StackWalk::new(self, root))
    }
}
