//! SHA-256 integrity hashing on the fly.
//!
//! `HashingReader` digests bytes as they are read from the source and
//! `HashingWriter` digests bytes as they are accepted by the destination, so
//! a single pass yields two independently computed digests.

use sha2::{Digest, Sha256};
use std::io::{self, Read, Write};

/// Lowercase hex encoding of a finished digest.
pub fn to_hex(hasher: Sha256) -> String {
    hex::encode(hasher.finalize())
}

/// Tee reader: every byte handed out is fed into the digest.
pub struct HashingReader<R> {
    inner: R,
    hasher: Sha256,
}

impl<R: Read> HashingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
        }
    }

    /// Consume the reader, returning the hex digest of everything read.
    pub fn finish(self) -> String {
        to_hex(self.hasher)
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}

/// Writer that digests exactly the bytes the inner writer accepted.
pub struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
        }
    }

    /// Split into the inner writer and the hex digest of what was written.
    pub fn finish(self) -> (W, String) {
        (self.inner, to_hex(self.hasher))
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
