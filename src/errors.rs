//! Typed error definitions for mirrorshuttle.
//! One variant per failure class of the move/mirror engine, so callers can
//! tell cancellations and integrity failures apart from plain I/O errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShuttleError {
    #[error("--mirror does not exist; have nowhere to move from: '{}'", .0.display())]
    MirrorNotExist(PathBuf),

    #[error("--target does not exist; have nowhere to mirror from or move to: '{}'", .0.display())]
    TargetNotExist(PathBuf),

    #[error("--mirror parent does not exist; cannot create mirror inside it: '{}'", .0.display())]
    MirrorParentNotExist(PathBuf),

    #[error("--mirror parent is not a directory; cannot create mirror inside it: '{}'", .0.display())]
    MirrorParentNotDir(PathBuf),

    #[error(
        "--mirror contains files; run with --mode=move to relocate them, or remove the files manually: '{}'",
        .0.display()
    )]
    MirrorNotEmpty(PathBuf),

    #[error("operation cancelled")]
    Cancelled,

    #[error("failed to {op}: '{}' ({source})", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to rename: '{}' -x-> '{}' ({source})", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "in-memory hash mismatch; possible corruption during in-memory I/O: {src_hash} (src_hash) != {dst_hash} (dst_hash)"
    )]
    MemoryHashMismatch { src_hash: String, dst_hash: String },

    #[error(
        "--verify pass hash mismatch; possible corruption during disk-write I/O: {src_hash} (src_hash) != {verify_hash} (verify_hash)"
    )]
    VerifyHashMismatch {
        src_hash: String,
        verify_hash: String,
    },

    #[error(
        "failed to remove (after move), file now exists in both places: '{}' ({source})",
        path.display()
    )]
    SourceRemoval {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to move: '{}' -x-> '{}' ({source})", src.display(), dst.display())]
    Move {
        src: PathBuf,
        dst: PathBuf,
        #[source]
        source: Box<ShuttleError>,
    },
}

impl ShuttleError {
    /// Attach an operation name and path to an I/O error. A cancelled read
    /// surfaced through `io::Error` is turned back into `Cancelled`.
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        if crate::fs_ops::is_cancelled_io(&source) {
            return ShuttleError::Cancelled;
        }
        ShuttleError::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// True for a cancellation, also when wrapped in a `Move` context.
    pub fn is_cancelled(&self) -> bool {
        match self {
            ShuttleError::Cancelled => true,
            ShuttleError::Move { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// True for a digest mismatch on either side of the commit.
    pub fn is_integrity(&self) -> bool {
        match self {
            ShuttleError::MemoryHashMismatch { .. } | ShuttleError::VerifyHashMismatch { .. } => {
                true
            }
            ShuttleError::Move { source, .. } => source.is_integrity(),
            _ => false,
        }
    }

    /// Stable short name used as the `kind` field in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ShuttleError::MirrorNotExist(_) => "mirror_not_exist",
            ShuttleError::TargetNotExist(_) => "target_not_exist",
            ShuttleError::MirrorParentNotExist(_) => "mirror_parent_not_exist",
            ShuttleError::MirrorParentNotDir(_) => "mirror_parent_not_dir",
            ShuttleError::MirrorNotEmpty(_) => "mirror_not_empty",
            ShuttleError::Cancelled => "cancelled",
            ShuttleError::Io { .. } => "io",
            ShuttleError::Rename { .. } => "rename",
            ShuttleError::MemoryHashMismatch { .. } => "memory_hash_mismatch",
            ShuttleError::VerifyHashMismatch { .. } => "verify_hash_mismatch",
            ShuttleError::SourceRemoval { .. } => "source_removal",
            ShuttleError::Move { source, .. } => source.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_seen_through_move_context() {
        let err = ShuttleError::Move {
            src: PathBuf::from("/mirror/a"),
            dst: PathBuf::from("/real/a"),
            source: Box::new(ShuttleError::Cancelled),
        };
        assert!(err.is_cancelled());
        assert_eq!(err.kind(), "cancelled");
    }

    #[test]
    fn display_carries_path_context() {
        let err = ShuttleError::io(
            "open",
            "/mirror/file.txt",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        let msg = err.to_string();
        assert!(msg.contains("failed to open"));
        assert!(msg.contains("/mirror/file.txt"));
        assert!(!err.is_cancelled());
    }
}
