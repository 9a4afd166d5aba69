use std::io::{ErrorKind, Read};

use crate::error::Result;

/// Maximum number of bytes handed out per chunk.
pub const TRANSFER_SIZE: usize = 4096;

/// One step of a trace source.
#[derive(Debug, PartialEq, Eq)]
pub enum Chunk<'a> {
    /// Bytes read from the source, never empty.
    Data(&'a [u8]),
    /// Nothing available right now; the caller should pause and ask again.
    Empty,
    /// The source is exhausted and will produce nothing further.
    End,
}

/// A blocking source of raw trace bytes.
///
/// Implementations own their read buffer, so a [`Chunk::Data`] borrow is only
/// valid until the next call.
pub trait TraceSource {
    /// Read the next chunk (blocking).
    ///
    /// Errors are terminal: callers should stop pumping after the first one.
    fn next_chunk(&mut self) -> Result<Chunk<'_>>;

    /// Human-readable description for diagnostics.
    fn describe(&self) -> String;
}

impl<S: TraceSource + ?Sized> TraceSource for Box<S> {
    fn next_chunk(&mut self) -> Result<Chunk<'_>> {
        (**self).next_chunk()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Single read into `buf`, retrying on `Interrupted`.
pub(crate) fn read_some<R: Read>(inner: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    loop {
        match inner.read(buf) {
            Ok(n) => return Ok(n),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
}
