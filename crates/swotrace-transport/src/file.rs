use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{read_some, Chunk, TraceSource, TRANSFER_SIZE};

/// Pause between empty reads when polling a file for further input.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// What an empty read means for a file source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExhaustionPolicy {
    /// Keep waiting for the file to grow (`tail -f` style).
    #[default]
    Poll,
    /// Stop cleanly at end of file.
    Terminate,
}

/// Trace source reading from a file, or any other `Read` standing in for one.
pub struct FileSource<R = File> {
    inner: R,
    buf: Box<[u8]>,
    policy: ExhaustionPolicy,
    label: String,
}

impl FileSource<File> {
    /// Open a file for reading.
    pub fn open(path: impl AsRef<Path>, policy: ExhaustionPolicy) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TransportError::Open {
            path: PathBuf::from(path),
            source,
        })?;
        info!(?path, ?policy, "reading trace from file");
        Ok(Self::with_label(file, policy, path.display().to_string()))
    }
}

impl<R: Read> FileSource<R> {
    /// Wrap an arbitrary reader.
    pub fn from_reader(inner: R, policy: ExhaustionPolicy) -> Self {
        Self::with_label(inner, policy, "reader".to_string())
    }

    fn with_label(inner: R, policy: ExhaustionPolicy, label: String) -> Self {
        Self {
            inner,
            buf: vec![0u8; TRANSFER_SIZE].into_boxed_slice(),
            policy,
            label,
        }
    }

    /// The configured exhaustion policy.
    pub fn policy(&self) -> ExhaustionPolicy {
        self.policy
    }

    /// Consume the source and return the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> TraceSource for FileSource<R> {
    fn next_chunk(&mut self) -> Result<Chunk<'_>> {
        let n = read_some(&mut self.inner, &mut self.buf)?;
        if n > 0 {
            return Ok(Chunk::Data(&self.buf[..n]));
        }

        match self.policy {
            ExhaustionPolicy::Terminate => {
                debug!(source = %self.label, "file exhausted");
                Ok(Chunk::End)
            }
            ExhaustionPolicy::Poll => Ok(Chunk::Empty),
        }
    }

    fn describe(&self) -> String {
        let mode = match self.policy {
            ExhaustionPolicy::Poll => "ongoing read",
            ExhaustionPolicy::Terminate => "terminate on exhaustion",
        };
        format!("file {} ({mode})", self.label)
    }
}
