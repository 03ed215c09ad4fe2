//! Filesystem operations: the move/mirror engine.
//!
//! All disk access goes through the [`Filesystem`] trait; [`OsFs`] is the real
//! implementation and [`memfs::MemFs`] an in-memory double for tests.

mod exclude;
mod file_move;
mod hashing;
mod helpers;
mod io_copy;
pub mod memfs;
mod mirror;
mod policy;
mod provider;
mod tree_move;
mod walk;

pub use exclude::is_excluded;
pub use file_move::{FileHashes, TEMP_SUFFIX, Transfer, TransferOptions, temp_path_for, transfer_file};
pub use helpers::{error_hint, is_cross_device};
pub use io_copy::{cancelled_io_error, is_cancelled_io};
pub use mirror::{create_mirror_structure, dir_depth, is_empty_structure};
pub use policy::{FailurePolicy, Flow};
pub use provider::{Filesystem, OsFs, WriteFile};
pub use tree_move::move_files;
pub use walk::{DirLister, EntryKind, Metadata, StackWalk, TreeWalk, WalkEntry, WalkError, WalkItem};
