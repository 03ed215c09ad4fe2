//! Cancellable, hashing stream copy.
//!
//! The source is wrapped in a `CancellableReader` that checks the
//! `CancelToken` before every chunk read, then teed into a SHA-256 digest.
//! The destination side is digested independently from the bytes the writer
//! accepted, so a mismatch between the two points at in-memory corruption.
//!
//! Cancellation surfaces as an `io::Error` of kind `Other` carrying a private
//! marker. `Interrupted` is not used: std retry loops treat it as
//! transient and would spin on a tripped token.

use std::error::Error;
use std::fmt;
use std::io::{self, Read, Write};

use super::hashing::{HashingReader, HashingWriter};
use crate::shutdown::CancelToken;

/// Size of one copy chunk; cancellation is checked once per chunk.
pub const CHUNK_SIZE: usize = 256 * 1024;

#[derive(Debug)]
struct CancelledMarker;

impl fmt::Display for CancelledMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("operation cancelled")
    }
}

impl Error for CancelledMarker {}

/// The error a `CancellableReader` returns once the token is tripped.
pub fn cancelled_io_error() -> io::Error {
    io::Error::other(CancelledMarker)
}

/// True if `e` was produced by [`cancelled_io_error`].
pub fn is_cancelled_io(e: &io::Error) -> bool {
    e.get_ref().is_some_and(|inner| inner.is::<CancelledMarker>())
}

/// Reader that refuses to read once cancellation was requested.
pub struct CancellableReader<'a, R> {
    inner: R,
    cancel: &'a CancelToken,
}

impl<'a, R: Read> CancellableReader<'a, R> {
    pub fn new(inner: R, cancel: &'a CancelToken) -> Self {
        Self { inner, cancel }
    }
}

impl<R: Read> Read for CancellableReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.cancel.is_requested() {
            return Err(cancelled_io_error());
        }
        self.inner.read(buf)
    }
}

/// Result of a hashed copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyResult {
    /// Bytes moved from source to destination.
    pub bytes: u64,
    /// Digest over the bytes as read.
    pub src_hash: String,
    /// Digest over the bytes as written.
    pub dst_hash: String,
}

/// Copy `src` into `dst` chunk by chunk, hashing both sides.
///
/// Does not flush to stable storage; the caller owns durability.
pub fn copy_hashed<R, W>(src: R, dst: &mut W, cancel: &CancelToken) -> io::Result<CopyResult>
where
    R: Read,
    W: Write + ?Sized,
{
    let mut reader = HashingReader::new(CancellableReader::new(src, cancel));
    let mut writer = HashingWriter::new(dst);
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut bytes: u64 = 0;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        bytes += n as u64;
    }
    writer.flush()?;

    let (_, dst_hash) = writer.finish();
    Ok(CopyResult {
        bytes,
        src_hash: reader.finish(),
        dst_hash,
    })
}

/// Read `src` to the end and return its hex digest.
pub fn hash_stream<R: Read>(src: R, cancel: &CancelToken) -> io::Result<String> {
    Ok(copy_hashed(src, &mut io::sink(), cancel)?.src_hash)
}
