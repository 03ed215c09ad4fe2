//! I/O error hints.
//!
//! Maps raw OS error codes to short, actionable hints for log lines, e.g. why
//! a direct rename fell back to copying.

use std::io;

/// A short platform-aware hint for `e`, or `None` when nothing useful applies.
pub fn error_hint(e: &io::Error) -> Option<&'static str> {
    if let Some(code) = e.raw_os_error() {
        #[cfg(unix)]
        {
            let hint = match code {
                libc::EXDEV => Some("cross-filesystem; atomic rename not possible"),
                libc::EACCES | libc::EPERM => {
                    Some("permission denied; check ownership and write permissions")
                }
                libc::EBUSY => Some("resource busy; ensure no other process is writing"),
                libc::ENOSPC => Some("insufficient space on device"),
                libc::EROFS => Some("read-only filesystem; cannot write here"),
                libc::ENAMETOOLONG => Some("filename or path too long"),
                _ => None,
            };
            if hint.is_some() {
                return hint;
            }
        }
        #[cfg(windows)]
        {
            let hint = match code {
                5 => Some("access denied; check permissions"), // ERROR_ACCESS_DENIED
                17 => Some("not same device; atomic rename not possible"), // ERROR_NOT_SAME_DEVICE
                32 => Some("sharing violation; file is in use"), // ERROR_SHARING_VIOLATION
                112 => Some("insufficient disk space"),          // ERROR_DISK_FULL
                _ => None,
            };
            if hint.is_some() {
                return hint;
            }
        }
    }

    match e.kind() {
        io::ErrorKind::PermissionDenied => {
            Some("permission denied; check ownership and write permissions")
        }
        io::ErrorKind::NotFound => Some("path not found; it may have been removed concurrently"),
        io::ErrorKind::AlreadyExists => Some("already exists"),
        _ => None,
    }
}

/// True when `e` says source and destination live on different filesystems.
pub fn is_cross_device(e: &io::Error) -> bool {
    match e.raw_os_error() {
        #[cfg(unix)]
        Some(code) => code == libc::EXDEV,
        #[cfg(windows)]
        Some(code) => code == 17,
        #[cfg(not(any(unix, windows)))]
        Some(_) => false,
        None => false,
    }
}
